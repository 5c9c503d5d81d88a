//! Ending a run: register dump, status report and the process exit status.

use std::fs;
use std::io;
use std::path::Path;

use crate::execute::StopReason;
use crate::platform::exception::Fault;
use crate::platform::RegisterFile;

/// Process exit statuses besides the one chosen by the program itself.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const DECODE_FAULT: i32 = 1;
    pub const ADDRESSING_FAULT: i32 = 2;
    pub const USAGE_ERROR: i32 = 3;
    pub const INPUT_ERROR: i32 = 4;
    pub const UNSUPPORTED_ECALL: i32 = 5;
    pub const STEP_LIMIT: i32 = 6;
    pub const DUMP_FAILED: i32 = 7;
}

impl Fault {
    pub fn exit_code(&self) -> i32 {
        match self {
            Fault::IllegalInstruction(_) => exit_code::DECODE_FAULT,
            Fault::FetchAccessFault { .. }
            | Fault::FetchMisaligned { .. }
            | Fault::StackAccessFault { .. } => exit_code::ADDRESSING_FAULT,
            Fault::UnsupportedEcall(_) => exit_code::UNSUPPORTED_ECALL,
        }
    }
}

impl StopReason {
    pub fn exit_code(&self) -> i32 {
        match self {
            StopReason::Halted(halt) => halt.exit_code(),
            StopReason::EndOfProgram => exit_code::SUCCESS,
            StopReason::StepLimitReached => exit_code::STEP_LIMIT,
            StopReason::Fault(fault) => fault.exit_code(),
        }
    }

    pub fn message(&self) -> String {
        match self {
            StopReason::Halted(halt) => format!("Program halted ({halt:?})"),
            StopReason::EndOfProgram => "Reached end of program".to_owned(),
            StopReason::StepLimitReached => "Step limit reached".to_owned(),
            StopReason::Fault(fault) => format!("Program aborted: {fault}"),
        }
    }
}

pub fn dump_registers(regs: &RegisterFile, path: &Path) -> io::Result<()> {
    fs::write(path, regs.to_le_bytes())
}

/// Writes the register dump, reports `reason` and returns the exit status.
///
/// The dump is written first so it reflects the state of the last step
/// even if reporting fails.
pub fn terminate(reason: &StopReason, regs: &RegisterFile, dump_file: &Path, quiet: bool) -> i32 {
    let mut code = reason.exit_code();
    if let Err(err) = dump_registers(regs, dump_file) {
        log::error!(
            "Could not write register dump to {}: {err}",
            dump_file.display()
        );
        if code == exit_code::SUCCESS {
            code = exit_code::DUMP_FAILED;
        }
    }

    if code == exit_code::SUCCESS {
        println!("{}", reason.message());
        if !quiet {
            println!("{regs}");
        }
    } else {
        eprintln!("{}", reason.message());
        eprintln!("Terminated with exit code: {code}");
        if !quiet {
            eprintln!("{regs}");
        }
    }
    code
}
