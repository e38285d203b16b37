//! Application for the creation of Invoice Identification Codes (IIC).

use std::process::ExitCode;

use clap::Parser;
use iic_cli::{cli::Cli, run_command};
use iic_common::logging::setup_logging;

/// Creates an IIC for an invoice document or for invoice fields given on the command line.
fn main() -> ExitCode {
    let args = Cli::parse();

    if let Err(error) = setup_logging(args.verbosity) {
        eprintln!("{error}");
        return ExitCode::FAILURE;
    }

    match run_command(args, std::io::stdout()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!(error:err; "Creating the IIC failed: {error}");
            error.exit_code()
        }
    }
}
