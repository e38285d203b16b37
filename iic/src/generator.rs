//! Creation of Invoice Identification Codes (IIC).
//!
//! An IIC is derived from the [`InvoiceFields`] of an invoice:
//!
//! 1. the fields are joined to a [`PlainText`],
//! 2. the SHA-256 [`Digest256`] of the plaintext is signed with RSA PKCS#1 v1.5 by a
//!    [`Signer`],
//! 3. the IIC is the hex encoded MD5 digest of the signature.
//!
//! The hex encoded signature is kept alongside the IIC as the IIC signature.

use std::fmt::Display;

use log::{debug, info};
use md5::Md5;
use sha2::{Digest, Sha256};

use crate::{
    Error,
    InvoiceFields,
    signer::{Error as SignerError, Signer, SigningSession as _},
};

/// The log target for the plaintext of an IIC.
///
/// Plaintexts contain invoice data and are only logged if [`PlaintextLogging::Enabled`] is set.
pub const PLAINTEXT_LOG_TARGET: &str = "iic::plaintext";

/// The length of a hex encoded IIC.
pub const IIC_LEN: usize = 32;

/// The canonical plaintext of [`InvoiceFields`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlainText(String);

impl PlainText {
    /// Creates a new [`PlainText`].
    pub(crate) fn new(plain_text: String) -> Self {
        Self(plain_text)
    }

    /// Returns the plaintext as [`str`].
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the SHA-256 [`Digest256`] of the UTF-8 bytes of the plaintext.
    pub fn digest(&self) -> Digest256 {
        Digest256::new(Sha256::digest(self.0.as_bytes()).into())
    }
}

impl Display for PlainText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A SHA-256 digest.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Digest256([u8; 32]);

impl Digest256 {
    /// Creates a new [`Digest256`] from raw bytes.
    pub fn new(digest: [u8; 32]) -> Self {
        Self(digest)
    }

    /// Returns the raw bytes of the digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Display for Digest256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// An Invoice Identification Code and its signature.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Iic {
    code: String,
    signature: String,
}

impl Iic {
    /// Creates an [`Iic`] from the raw bytes of a PKCS#1 v1.5 `signature`.
    ///
    /// The code is the lowercase hex encoded MD5 digest of `signature`, the signature is
    /// `signature` as lowercase hex.
    ///
    /// # Examples
    ///
    /// ```
    /// use iic::Iic;
    ///
    /// let iic = Iic::from_signature(&[0xde, 0xad, 0xbe, 0xef]);
    /// assert_eq!(iic.code(), "2f249230a8e7c2bf6005ccd2679259ec");
    /// assert_eq!(iic.signature(), "deadbeef");
    /// ```
    pub fn from_signature(signature: &[u8]) -> Self {
        Self {
            code: hex::encode(Md5::digest(signature)),
            signature: hex::encode(signature),
        }
    }

    /// Returns the IIC as lowercase hex string of [`IIC_LEN`] characters.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns the IIC signature as lowercase hex string.
    pub fn signature(&self) -> &str {
        &self.signature
    }
}

impl Display for Iic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IIC={}\nIICSignature={}", self.code, self.signature)
    }
}

/// Whether the plaintext of an IIC is logged.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PlaintextLogging {
    /// The plaintext is never logged.
    #[default]
    Disabled,

    /// The plaintext is logged at info level on [`PLAINTEXT_LOG_TARGET`].
    Enabled,
}

impl From<bool> for PlaintextLogging {
    fn from(value: bool) -> Self {
        if value { Self::Enabled } else { Self::Disabled }
    }
}

/// Creates [`Iic`]s for [`InvoiceFields`].
#[derive(Clone, Copy, Debug, Default)]
pub struct IicGenerator {
    plaintext_logging: PlaintextLogging,
}

impl IicGenerator {
    /// Creates a new [`IicGenerator`].
    pub fn new(plaintext_logging: PlaintextLogging) -> Self {
        Self { plaintext_logging }
    }

    /// Creates the [`Iic`] of `fields` using `signer`.
    ///
    /// A session is opened with `signer` for exactly one signature and is closed before
    /// this function returns, regardless of its outcome.
    /// No retries are attempted.
    ///
    /// # Errors
    ///
    /// Returns an error if
    /// - a session can not be opened with `signer` ([`SignerError::SessionInit`]),
    /// - the signer fails to create a signature ([`SignerError::Signing`]),
    /// - the signer returns an empty signature ([`SignerError::Signing`]),
    /// - or the digest can not be processed by the signer ([`SignerError::Hash`]).
    pub fn generate<S>(&self, fields: &InvoiceFields, signer: &S) -> Result<Iic, Error>
    where
        S: Signer + ?Sized,
    {
        let mut session = signer.scoped_session()?;

        let plain_text = fields.plain_text();
        if self.plaintext_logging == PlaintextLogging::Enabled {
            info!(target: PLAINTEXT_LOG_TARGET, "Plain IIC: {plain_text}");
        }

        let digest = plain_text.digest();
        let signature = session.sign_pkcs1v15(&digest)?;
        if signature.is_empty() {
            return Err(SignerError::Signing {
                context: "validating the signature returned by the signing device",
                source: "the signature is empty".into(),
            }
            .into());
        }

        let iic = Iic::from_signature(&signature);
        drop(session);

        debug!(
            "Created IIC {} for invoice {}",
            iic.code(),
            fields.inv_ord_num()
        );
        Ok(iic)
    }
}
