use std::process::ExitCode;

use clap::Parser;
use extract::cli::Cli;
use log::error;

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match extract::run_cli(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
