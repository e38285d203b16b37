//! Common, top-level error type for all components of iic.

use std::process::ExitCode;

/// An error that may occur when creating an IIC.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An error with the configuration.
    #[error("Configuration error:\n{0}")]
    Config(#[from] crate::config::Error),

    /// An error with an invoice document.
    #[error("Invoice document error:\n{0}")]
    Document(#[from] crate::document::Error),

    /// An error with the fields of an invoice.
    #[error("Invoice field error:\n{0}")]
    Fields(#[from] crate::fields::Error),

    /// An error with a signing device.
    #[error("Signing device error:\n{0}")]
    Signer(#[from] crate::signer::Error),
}

/// Mapping for relevant [`Error`] variants to an [`ExitCode`].
#[derive(Clone, Copy, Debug, Eq, num_enum::IntoPrimitive, Ord, PartialEq, PartialOrd)]
#[repr(u8)]
pub enum ErrorExitCode {
    /// Mapping for [`Error::Config`].
    Config = 10,

    /// Mapping for [`crate::document::Error::Io`] wrapped in [`Error::Document`].
    DocumentIo = 20,

    /// Mapping for all other variants of [`crate::document::Error`] wrapped in
    /// [`Error::Document`].
    DocumentFormat = 21,

    /// Mapping for [`crate::document::Error::ElementMissing`] wrapped in [`Error::Document`].
    DocumentElementMissing = 22,

    /// Mapping for [`crate::fields::Error::FieldNotFound`] wrapped in [`Error::Fields`].
    FieldsFieldNotFound = 30,

    /// Mapping for [`crate::fields::Error::AttributeNotFound`] wrapped in [`Error::Fields`].
    FieldsAttributeNotFound = 31,

    /// Mapping for [`crate::signer::Error::SessionInit`] wrapped in [`Error::Signer`].
    SignerSessionInit = 40,

    /// Mapping for [`crate::signer::Error::Signing`] wrapped in [`Error::Signer`].
    SignerSigning = 41,

    /// Mapping for [`crate::signer::Error::Hash`] wrapped in [`Error::Signer`].
    SignerHash = 42,

    /// Mapping for [`crate::signer::Error::Close`] wrapped in [`Error::Signer`].
    SignerClose = 43,
}

impl From<&Error> for ErrorExitCode {
    fn from(value: &Error) -> Self {
        match value {
            Error::Config(_) => Self::Config,
            Error::Document(error) => match error {
                crate::document::Error::Io { .. } => Self::DocumentIo,
                crate::document::Error::ElementMissing { .. } => Self::DocumentElementMissing,
                crate::document::Error::XmlRead { .. }
                | crate::document::Error::XmlWrite { .. }
                | crate::document::Error::Utf8 { .. }
                | crate::document::Error::Malformed { .. }
                | crate::document::Error::MissingRoot => Self::DocumentFormat,
            },
            Error::Fields(error) => match error {
                crate::fields::Error::FieldNotFound { .. } => Self::FieldsFieldNotFound,
                crate::fields::Error::AttributeNotFound { .. } => Self::FieldsAttributeNotFound,
            },
            Error::Signer(error) => match error {
                crate::signer::Error::SessionInit { .. } => Self::SignerSessionInit,
                crate::signer::Error::Signing { .. } => Self::SignerSigning,
                crate::signer::Error::Hash { .. } => Self::SignerHash,
                crate::signer::Error::Close { .. } => Self::SignerClose,
            },
        }
    }
}

impl From<ErrorExitCode> for ExitCode {
    fn from(value: ErrorExitCode) -> Self {
        Self::from(std::convert::Into::<u8>::into(value))
    }
}
