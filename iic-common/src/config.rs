//! Default locations for IIC configuration files.
//!
//! # Examples
//!
//! ```
//! use iic_common::config::{get_config_file, get_config_file_paths};
//!
//! // Get all configuration file paths, sorted by directory precedence.
//! println!("{:?}", get_config_file_paths());
//!
//! // Get the first config file found, according to directory precedence.
//! println!("{:?}", get_config_file());
//! ```

use std::path::PathBuf;

/// The default config directory below "/usr" for IIC hosts.
const DEFAULT_CONFIG_DIR: &str = "/usr/share/iic/";

/// The override config directory below "/etc" for IIC hosts.
const ETC_OVERRIDE_CONFIG_DIR: &str = "/etc/iic/";

/// The override config directory below "/run" for IIC hosts.
const RUN_OVERRIDE_CONFIG_DIR: &str = "/run/iic/";

/// The override config directory below "/usr/local" for IIC hosts.
const USR_LOCAL_OVERRIDE_CONFIG_DIR: &str = "/usr/local/share/iic/";

/// The filename of an IIC configuration file.
const CONFIG_FILE: &str = "config.toml";

/// Returns the first IIC configuration file available, or [`None`] if none found.
///
/// Considers files named `config.toml` in the following directories in descending priority:
/// - `/run/iic`
/// - `/etc/iic`
/// - `/usr/local/share/iic`
/// - `/usr/share/iic`
pub fn get_config_file() -> Option<PathBuf> {
    get_config_file_paths()
        .into_iter()
        .find(|file| file.is_file())
}

/// Returns a list of all configuration file locations, sorted by precedence.
pub fn get_config_file_paths() -> Vec<PathBuf> {
    [
        RUN_OVERRIDE_CONFIG_DIR,
        ETC_OVERRIDE_CONFIG_DIR,
        USR_LOCAL_OVERRIDE_CONFIG_DIR,
        DEFAULT_CONFIG_DIR,
    ]
    .into_iter()
    .map(|dir| PathBuf::from([dir, CONFIG_FILE].concat()))
    .collect()
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn config_paths_are_sorted_by_precedence() -> TestResult {
        let paths = get_config_file_paths();

        assert_eq!(
            paths,
            vec![
                PathBuf::from("/run/iic/config.toml"),
                PathBuf::from("/etc/iic/config.toml"),
                PathBuf::from("/usr/local/share/iic/config.toml"),
                PathBuf::from("/usr/share/iic/config.toml"),
            ]
        );

        Ok(())
    }
}
