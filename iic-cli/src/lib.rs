//! Command line interface for the creation of Invoice Identification Codes (IIC).

use std::{io::Write, process::ExitCode};

use iic::{
    ErrorExitCode,
    IicGenerator,
    InvoiceFields,
    PlaintextLogging,
    WriteParams,
    config::IicConfig,
    write_iic,
};
use log::info;

pub mod cli;

use cli::{Cli, Command};

/// An error that may occur when running `iic`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An error creating an IIC.
    #[error(transparent)]
    Iic(#[from] iic::Error),

    /// The output can not be written.
    #[error("Writing the output failed:\n{0}")]
    Output(std::io::Error),
}

impl Error {
    /// Returns the [`ExitCode`] for the error.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Iic(error) => ErrorExitCode::from(error).into(),
            Self::Output(_) => ExitCode::FAILURE,
        }
    }
}

/// Runs the command selected by `cli`.
///
/// The configuration is loaded, the configured signer is created and the command is run with
/// it. Output meant for the caller is written to `stdout`.
///
/// # Errors
///
/// Returns an error if
/// - the configuration can not be loaded,
/// - the signer can not be created,
/// - the command fails,
/// - or writing to `stdout` fails.
pub fn run_command(cli: Cli, mut stdout: impl Write) -> Result<(), Error> {
    let config = IicConfig::from_file(cli.config.as_deref()).map_err(iic::Error::from)?;
    let signer = config.signer().map_err(iic::Error::from)?;
    let plaintext_logging = if cli.log_plaintext {
        PlaintextLogging::Enabled
    } else {
        config.plaintext_logging()
    };
    let generator = IicGenerator::new(plaintext_logging);

    match cli.command {
        Command::Write(command) => {
            let iic = write_iic(
                &WriteParams {
                    input: command.input,
                    output: command.output,
                },
                &generator,
                &signer,
            )?;
            info!("IIC: {}", iic.code());
        }
        Command::Compute(command) => {
            let iic = generator.generate(&InvoiceFields::from(command), &signer)?;
            writeln!(stdout, "{iic}").map_err(Error::Output)?;
        }
    }

    Ok(())
}
