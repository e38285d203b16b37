//! Signing with an RSA private key held in memory.

use std::{fmt::Debug, fs::read_to_string, path::Path, path::PathBuf};

use log::{debug, warn};
use rsa::{
    Pkcs1v15Sign,
    RsaPrivateKey,
    pkcs1::DecodeRsaPrivateKey,
    pkcs8::DecodePrivateKey,
    traits::PublicKeyParts,
};
use sha2::Sha256;

use crate::{
    generator::Digest256,
    signer::{Error as SignerError, Signer, SigningSession},
};

/// An error that may occur when loading a software signing key.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The key file can not be read.
    #[error("Reading the signing key {path} failed:\n{source}")]
    Io {
        /// The path of the key file.
        path: PathBuf,

        /// The source error.
        source: std::io::Error,
    },

    /// The key is neither a PKCS#8 nor a PKCS#1 PEM encoded RSA private key.
    #[error("The signing key {path} is not a PEM encoded RSA private key:\n{source}")]
    KeyFormat {
        /// The path of the key file.
        path: PathBuf,

        /// The source error of the PKCS#8 decoder.
        source: rsa::pkcs8::Error,
    },
}

/// A signer backed by an RSA private key in memory.
///
/// # Warning
///
/// The private key material is exposed in the memory of the running process.
/// Use a hardware signing device such as [`NetHsmSigner`][`crate::signer::NetHsmSigner`] for
/// production invoices.
pub struct SoftwareSigner {
    key: RsaPrivateKey,
}

impl SoftwareSigner {
    /// Creates a new [`SoftwareSigner`] from an RSA private key.
    pub fn new(key: RsaPrivateKey) -> Self {
        Self { key }
    }

    /// Creates a new [`SoftwareSigner`] from a PEM encoded RSA private key.
    ///
    /// Both PKCS#8 (`BEGIN PRIVATE KEY`) and PKCS#1 (`BEGIN RSA PRIVATE KEY`) encodings are
    /// supported.
    ///
    /// # Errors
    ///
    /// Returns an error if `pem` can not be decoded as RSA private key.
    pub fn from_pem(pem: &str) -> Result<Self, rsa::pkcs8::Error> {
        let key = match RsaPrivateKey::from_pkcs8_pem(pem) {
            Ok(key) => key,
            Err(error) => RsaPrivateKey::from_pkcs1_pem(pem).map_err(|_| error)?,
        };
        Ok(Self::new(key))
    }

    /// Creates a new [`SoftwareSigner`] from a PEM encoded RSA private key file.
    ///
    /// # Errors
    ///
    /// Returns an error if
    /// - the file at `path` can not be read,
    /// - or its contents can not be decoded as RSA private key.
    pub fn from_pem_file(path: &Path) -> Result<Self, Error> {
        warn!(
            "Loading signing key {} into memory. Use a signing device for production invoices.",
            path.display()
        );
        let pem = read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_pem(&pem).map_err(|source| Error::KeyFormat {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Returns the size of the RSA modulus in bytes.
    ///
    /// This is the length of every signature created by this signer.
    pub fn signature_len(&self) -> usize {
        self.key.size()
    }
}

impl Debug for SoftwareSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareSigner")
            .field("key", &format!("RSA-{}", self.key.size() * 8))
            .finish()
    }
}

impl Signer for SoftwareSigner {
    type Session<'a> = SoftwareSession<'a>;

    fn open(&self) -> Result<Self::Session<'_>, SignerError> {
        debug!("Opening software signing session");
        Ok(SoftwareSession {
            key: Some(&self.key),
        })
    }
}

/// A session of a [`SoftwareSigner`].
pub struct SoftwareSession<'a> {
    key: Option<&'a RsaPrivateKey>,
}

impl Debug for SoftwareSession<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareSession")
            .field("open", &self.key.is_some())
            .finish()
    }
}

impl SigningSession for SoftwareSession<'_> {
    fn sign_pkcs1v15(&mut self, digest: &Digest256) -> Result<Vec<u8>, SignerError> {
        let key = self.key.ok_or_else(|| SignerError::Signing {
            context: "using a software signing session",
            source: "the session is closed".into(),
        })?;

        key.sign(Pkcs1v15Sign::new::<Sha256>(), digest.as_bytes())
            .map_err(|source| SignerError::Signing {
                context: "creating a PKCS#1 v1.5 signature in software",
                source: Box::new(source),
            })
    }

    fn close(&mut self) -> Result<(), SignerError> {
        self.key = None;
        Ok(())
    }
}
