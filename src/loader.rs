//! Reads a flat binary image into instruction words.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("{0}: no such file")]
    NotFound(PathBuf),

    #[error("{0}: is a directory")]
    IsDirectory(PathBuf),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Loads the image at `path`. Words are little endian and in program order,
/// the first word belongs at PC 0.
pub fn load_image(path: impl AsRef<Path>) -> Result<Vec<u32>, LoadError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_owned()));
    }
    if path.is_dir() {
        return Err(LoadError::IsDirectory(path.to_owned()));
    }
    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_owned(),
        source,
    })?;
    let program = words(&bytes);
    log::debug!(
        "Loaded {} instructions from {}",
        program.len(),
        path.display()
    );
    Ok(program)
}

/// Splits `bytes` into little endian words. A trailing partial word is dropped.
pub fn words(bytes: &[u8]) -> Vec<u32> {
    let chunks = bytes.chunks_exact(4);
    if !chunks.remainder().is_empty() {
        log::warn!(
            "Ignoring {} trailing bytes, image size is not a multiple of 4",
            chunks.remainder().len()
        );
    }
    chunks
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
