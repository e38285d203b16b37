//! Contains [`Error`] enum for the signer interface.

/// The boxed source error of a signing device.
pub type DeviceError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An error that may occur when interacting with a signing device.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A signing session can not be opened.
    #[error("Opening a signing session failed while {context}:\n{source}")]
    SessionInit {
        /// The context in which the error occurred.
        ///
        /// This is meant to complete the sentence "Opening a signing session failed while ".
        context: &'static str,

        /// The source error.
        source: DeviceError,
    },

    /// The signing device rejected or failed a signing operation.
    #[error("Signing failed while {context}:\n{source}")]
    Signing {
        /// The context in which the error occurred.
        ///
        /// This is meant to complete the sentence "Signing failed while ".
        context: &'static str,

        /// The source error.
        source: DeviceError,
    },

    /// A digest can not be processed.
    #[error("Processing the digest failed while {context}:\n{source}")]
    Hash {
        /// The context in which the error occurred.
        ///
        /// This is meant to complete the sentence "Processing the digest failed while ".
        context: &'static str,

        /// The source error.
        source: DeviceError,
    },

    /// A signing session can not be closed cleanly.
    #[error("Closing a signing session failed while {context}:\n{source}")]
    Close {
        /// The context in which the error occurred.
        ///
        /// This is meant to complete the sentence "Closing a signing session failed while ".
        context: &'static str,

        /// The source error.
        source: DeviceError,
    },
}
