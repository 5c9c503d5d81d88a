use std::process;

use clap::error::ErrorKind;
use clap::Parser;

use rv32im_emulator::config::Config;
use rv32im_emulator::execute::Hart;
use rv32im_emulator::loader;
use rv32im_emulator::termination::{self, exit_code};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    process::exit(run());
}

fn run() -> i32 {
    let config = match Config::try_parse() {
        Ok(config) => config,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => exit_code::SUCCESS,
                _ => exit_code::USAGE_ERROR,
            };
        }
    };

    let program = match loader::load_image(&config.image) {
        Ok(program) => program,
        Err(err) => {
            eprintln!("Not a valid file: {err}");
            return exit_code::INPUT_ERROR;
        }
    };

    let mut hart = Hart::new(program);
    let reason = hart.run(config.max_steps);
    log::info!("Executed {} instructions", hart.retired());

    termination::terminate(&reason, &hart.regs, &config.dump_file, config.quiet)
}
