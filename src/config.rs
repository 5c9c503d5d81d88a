use std::path::PathBuf;

use clap::Parser;

/// Command line configuration of the interpreter.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "rv32im-emulator",
    version,
    about = "Interpreter for flat RV32IM binary images"
)]
pub struct Config {
    /// Flat binary image, executed from its first word.
    #[arg(value_name = "IMAGE")]
    pub image: PathBuf,

    /// Where the 128 byte register dump is written on termination.
    #[arg(long, env = "RV32_DUMP_FILE", default_value = Config::DEFAULT_DUMP_FILE)]
    pub dump_file: PathBuf,

    /// Stop after this many instructions.
    #[arg(long)]
    pub max_steps: Option<u64>,

    /// Do not print the register table on termination.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Config {
    pub const DEFAULT_DUMP_FILE: &'static str = "registers.res";
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["rv32im-emulator", "prog.bin"]).unwrap();
        assert_eq!(config.image, PathBuf::from("prog.bin"));
        assert_eq!(config.max_steps, None);
        assert!(!config.quiet);
    }

    #[test]
    fn all_options() {
        let config = Config::try_parse_from([
            "rv32im-emulator",
            "--dump-file",
            "out.res",
            "--max-steps",
            "1000",
            "-q",
            "prog.bin",
        ])
        .unwrap();
        assert_eq!(config.dump_file, PathBuf::from("out.res"));
        assert_eq!(config.max_steps, Some(1000));
        assert!(config.quiet);
    }

    #[test]
    fn image_is_required() {
        let err = Config::try_parse_from(["rv32im-emulator"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }
}
