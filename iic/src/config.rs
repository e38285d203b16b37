//! Configuration file handling for IIC creation.
//!
//! A configuration file is a TOML document selecting the signing backend and the logging of
//! plaintexts:
//!
//! ```toml
//! [logging]
//! plaintext = false
//!
//! [signer]
//! backend = "nethsm"
//! url = "https://nethsm.example.org/api/v1"
//! user = "operator1"
//! passphrase_file = "/etc/iic/operator1.passphrase"
//! key_id = "iic1"
//! timeout_seconds = 10
//! ```
//!
//! Relative paths are resolved against the directory of the configuration file.

use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
    time::Duration,
};

use iic_common::config::{get_config_file, get_config_file_paths};
use log::debug;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    generator::PlaintextLogging,
    passphrase::Passphrase,
    signer::{ConfiguredSigner, NetHsmSigner, SoftwareSigner, nethsm::KeyId},
};

/// The error that may occur when handling a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configuration is missing.
    #[error("No configuration file found in {}.", get_config_file_paths().iter().map(|path| path.display().to_string()).collect::<Vec<String>>().join(", "))]
    ConfigMissing,

    /// I/O error for a file.
    #[error("I/O error for file {path} while {context}:\n{source}")]
    Io {
        /// The path of the file.
        path: PathBuf,

        /// The context in which the error occurs.
        ///
        /// This is meant to complete the sentence "I/O error for file {path} while ".
        context: &'static str,

        /// The source error.
        source: std::io::Error,
    },

    /// TOML error while reading a file.
    #[error("TOML read error for file {path} while {context}:\n{source}")]
    TomlRead {
        /// The path of the file.
        path: PathBuf,

        /// The context in which the error occurs.
        ///
        /// This is meant to complete the sentence "TOML read error for file {path} while ".
        context: &'static str,

        /// The source error.
        source: Box<toml::de::Error>,
    },

    /// The NetHSM signer can not be created.
    #[error("NetHSM signer error:\n{0}")]
    NetHsm(#[from] crate::signer::nethsm::Error),

    /// The passphrase of a NetHSM user can not be read.
    #[error("Passphrase error:\n{0}")]
    Passphrase(#[from] crate::passphrase::Error),

    /// The software signing key can not be loaded.
    #[error("Software signer error:\n{0}")]
    Software(#[from] crate::signer::software::Error),
}

/// Logging settings.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Whether the plaintext of every IIC is logged.
    #[serde(default)]
    pub plaintext: bool,
}

/// The signing backend and its settings.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields, tag = "backend")]
pub enum SignerConfig {
    /// A Nitrokey NetHSM accessed over its REST API.
    #[serde(rename = "nethsm")]
    NetHsm {
        /// The URL of the API root of the NetHSM.
        url: Url,

        /// The name of an operator user that may use `key_id`.
        user: String,

        /// The file holding the passphrase of `user`.
        passphrase_file: PathBuf,

        /// The ID of the RSA key used for signing.
        key_id: KeyId,

        /// The timeout for requests in seconds.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_seconds: Option<u64>,
    },

    /// An RSA private key read from a PEM file.
    #[serde(rename = "software")]
    Software {
        /// The PEM file holding the private key.
        key_file: PathBuf,
    },
}

/// The configuration for creating IICs.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IicConfig {
    #[serde(default)]
    logging: LoggingConfig,
    signer: SignerConfig,
}

impl IicConfig {
    /// Creates a new [`IicConfig`].
    pub fn new(logging: LoggingConfig, signer: SignerConfig) -> Self {
        Self { logging, signer }
    }

    /// Loads an [`IicConfig`] from a TOML file.
    ///
    /// If `path` is [`None`], the first file found in the default locations is used (see
    /// [`get_config_file`]).
    /// Relative paths in the file are resolved against the directory containing it.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::Write;
    ///
    /// use iic::config::IicConfig;
    ///
    /// # fn main() -> testresult::TestResult {
    /// let config_file = tempfile::NamedTempFile::new()?;
    /// write!(
    ///     config_file.as_file(),
    ///     r#"
    /// [signer]
    /// backend = "software"
    /// key_file = "/etc/iic/signing-key.pem"
    /// "#
    /// )?;
    ///
    /// let config = IicConfig::from_file(Some(config_file.path()))?;
    /// assert!(!config.logging().plaintext);
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if
    /// - `path` is [`None`] and no file is found in the default locations,
    /// - the file can not be read,
    /// - or the file is not a valid configuration.
    pub fn from_file(path: Option<&Path>) -> Result<Self, Error> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => get_config_file().ok_or(Error::ConfigMissing)?,
        };
        debug!("Reading configuration file {}", path.display());

        let mut config: Self = toml::from_str(&read_to_string(&path).map_err(|source| {
            Error::Io {
                path: path.clone(),
                context: "reading it to string",
                source,
            }
        })?)
        .map_err(|source| Error::TomlRead {
            path: path.clone(),
            context: "reading it as an IIC config",
            source: Box::new(source),
        })?;

        if let Some(dir) = path.parent() {
            config.resolve_paths(dir);
        }

        Ok(config)
    }

    /// Returns the logging settings.
    pub fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    /// Returns the signer settings.
    pub fn signer_config(&self) -> &SignerConfig {
        &self.signer
    }

    /// Returns the [`PlaintextLogging`] setting.
    pub fn plaintext_logging(&self) -> PlaintextLogging {
        self.logging.plaintext.into()
    }

    /// Creates the configured signer.
    ///
    /// # Errors
    ///
    /// Returns an error if
    /// - the NetHSM passphrase file can not be read,
    /// - the NetHSM URL is not usable,
    /// - or the software signing key can not be loaded.
    pub fn signer(&self) -> Result<ConfiguredSigner, Error> {
        Ok(match &self.signer {
            SignerConfig::NetHsm {
                url,
                user,
                passphrase_file,
                key_id,
                timeout_seconds,
            } => NetHsmSigner::new(
                url.clone(),
                user.clone(),
                Passphrase::from_file(passphrase_file)?,
                key_id.clone(),
                timeout_seconds.map(Duration::from_secs),
            )?
            .into(),
            SignerConfig::Software { key_file } => SoftwareSigner::from_pem_file(key_file)?.into(),
        })
    }

    fn resolve_paths(&mut self, dir: &Path) {
        let path = match &mut self.signer {
            SignerConfig::NetHsm {
                passphrase_file, ..
            } => passphrase_file,
            SignerConfig::Software { key_file } => key_file,
        };
        if path.is_relative() {
            *path = dir.join(&*path);
        }
    }
}
