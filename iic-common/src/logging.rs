//! Logging setup for IIC executables.

use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use systemd_journal_logger::{JournalLog, connected_to_journal};

/// The syslog identifier used when logging to the systemd journal.
const SYSLOG_IDENTIFIER: &str = "iic";

/// Logging setup error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Journal initialization error.
    #[error("Journal initialization error: {0}")]
    Journal(std::io::Error),

    /// Logger initialization error.
    #[error("Logger initialization error: {0}")]
    Logger(#[from] log::SetLoggerError),
}

/// Sets up logging facilities.
///
/// If the process is connected to the systemd journal, all records are sent to it with the
/// syslog identifier `iic`.
/// Otherwise records are written to stderr, prefixed with their target so that e.g. records
/// of the `iic::plaintext` target can be told apart.
///
/// # Errors
///
/// Returns an error if
/// - the process is connected to the journal, but the journal logger can not be created,
/// - or a logger has already been set.
pub fn setup_logging(max_level: impl Into<LevelFilter>) -> Result<(), Error> {
    let max_level = max_level.into();

    if connected_to_journal() {
        let journal = JournalLog::new()
            .map_err(Error::Journal)?
            .with_syslog_identifier(SYSLOG_IDENTIFIER.to_string())
            .with_extra_fields(vec![("VERSION", env!("CARGO_PKG_VERSION"))]);
        log::set_boxed_logger(Box::new(journal))?;
        log::set_max_level(max_level);
        return Ok(());
    }

    TermLogger::init(
        max_level,
        ConfigBuilder::new()
            .set_target_level(LevelFilter::Trace)
            .set_time_level(LevelFilter::Off)
            .build(),
        // stdout is reserved for command output
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;
    Ok(())
}
