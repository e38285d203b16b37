//! Passphrase handling.

use std::{
    fmt::{Debug, Display},
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};

use secrecy::{ExposeSecret, SecretString};

/// An error that may occur when reading a passphrase.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A passphrase file can not be read.
    #[error("Reading the passphrase file {path} failed:\n{source}")]
    Io {
        /// The path of the passphrase file.
        path: PathBuf,

        /// The source error.
        source: std::io::Error,
    },
}

/// A secret passphrase
///
/// The passphrase is held by a [`SecretString`], which guarantees zeroing of memory on
/// destruct.
#[derive(Clone)]
pub struct Passphrase(SecretString);

impl Passphrase {
    /// Creates a new [`Passphrase`] from owned [`String`]
    ///
    /// # Examples
    /// ```
    /// use iic::Passphrase;
    ///
    /// let passphrase = Passphrase::new("passphrase".to_string());
    /// assert_eq!(passphrase.to_string(), "[REDACTED]");
    /// ```
    pub fn new(passphrase: String) -> Self {
        Self(SecretString::from(passphrase))
    }

    /// Reads a [`Passphrase`] from a file.
    ///
    /// A single trailing line break is removed, all other content is used verbatim.
    ///
    /// # Errors
    ///
    /// Returns an error if the file at `path` can not be read.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let mut passphrase = read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if passphrase.ends_with('\n') {
            passphrase.pop();
            if passphrase.ends_with('\r') {
                passphrase.pop();
            }
        }
        Ok(Self::new(passphrase))
    }

    /// Exposes the secret passphrase as borrowed [`str`]
    pub fn expose_borrowed(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Debug for Passphrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Passphrase").field(&"[REDACTED]").finish()
    }
}

impl Display for Passphrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl FromStr for Passphrase {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::fs::write;

    use rstest::rstest;
    use testdir::testdir;
    use testresult::TestResult;

    use super::*;

    #[rstest]
    #[case("secret", "secret")]
    #[case("secret\n", "secret")]
    #[case("secret\r\n", "secret")]
    #[case("secret\n\n", "secret\n")]
    #[case(" secret ", " secret ")]
    fn passphrase_from_file(#[case] contents: &str, #[case] expected: &str) -> TestResult {
        let path = testdir!().join("passphrase");
        write(&path, contents)?;

        assert_eq!(Passphrase::from_file(&path)?.expose_borrowed(), expected);

        Ok(())
    }

    #[test]
    fn missing_passphrase_file_fails() -> TestResult {
        let path = testdir!().join("missing");

        assert!(matches!(
            Passphrase::from_file(&path),
            Err(Error::Io { .. })
        ));

        Ok(())
    }

    #[test]
    fn passphrase_is_redacted() -> TestResult {
        let passphrase = Passphrase::from_str("secret")?;

        assert!(!format!("{passphrase:?}").contains("secret"));
        assert!(!passphrase.to_string().contains("secret"));

        Ok(())
    }
}
