//! Signing devices producing RSA PKCS#1 v1.5 signatures over IIC digests.
//!
//! A [`Signer`] holds the connection parameters of a signing device and opens a
//! [`SigningSession`] for every IIC that is created.
//! Sessions are exclusively owned for the duration of one signing operation and are always
//! closed through a [`SessionGuard`].

use std::ops::{Deref, DerefMut};

use log::{debug, warn};

use crate::generator::Digest256;

pub mod error;
pub mod nethsm;
pub mod software;

pub use error::Error;
pub use nethsm::{NetHsmSession, NetHsmSigner};
pub use software::{SoftwareSession, SoftwareSigner};

/// An open session with a signing device.
pub trait SigningSession {
    /// Creates a PKCS#1 v1.5 signature over a SHA-256 `digest`.
    ///
    /// The signature is created with an RSA private key resident on the signing device and is
    /// returned as raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an [`Error::Signing`] if the device rejects the operation (e.g. because it is
    /// locked or the key may not be used for signing).
    fn sign_pkcs1v15(&mut self, digest: &Digest256) -> Result<Vec<u8>, Error>;

    /// Closes the session.
    ///
    /// Implementations must tolerate being called on an already closed session.
    ///
    /// # Errors
    ///
    /// Returns an [`Error::Close`] if the device reports a failure while closing.
    fn close(&mut self) -> Result<(), Error>;
}

/// A signing device, that signing sessions can be opened with.
pub trait Signer {
    /// The session type created by [`Signer::open`].
    type Session<'a>: SigningSession
    where
        Self: 'a;

    /// Opens a new session with the signing device.
    ///
    /// Prefer [`Signer::scoped_session`], which guarantees that the session is closed.
    ///
    /// # Errors
    ///
    /// Returns an [`Error::SessionInit`] if the device is unreachable, the credentials are
    /// rejected or the configured key can not be used.
    fn open(&self) -> Result<Self::Session<'_>, Error>;

    /// Opens a new session that is closed when the returned [`SessionGuard`] is dropped.
    ///
    /// # Errors
    ///
    /// Returns an [`Error::SessionInit`] if [`Signer::open`] fails.
    fn scoped_session(&self) -> Result<SessionGuard<Self::Session<'_>>, Error> {
        self.open().map(SessionGuard::new)
    }
}

/// Closes a [`SigningSession`] on every exit path.
///
/// The guard dereferences to the wrapped session.
/// Dropping it closes the session; a failure to close is logged, as it must not replace the
/// outcome of the operation the session was used for.
#[derive(Debug)]
pub struct SessionGuard<S: SigningSession> {
    session: S,
}

impl<S: SigningSession> SessionGuard<S> {
    /// Creates a new [`SessionGuard`] for an open `session`.
    pub fn new(session: S) -> Self {
        debug!("Signing session opened");
        Self { session }
    }
}

impl<S: SigningSession> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}

impl<S: SigningSession> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.session
    }
}

impl<S: SigningSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        match self.session.close() {
            Ok(()) => debug!("Signing session closed"),
            Err(error) => warn!("Signing session could not be closed cleanly: {error}"),
        }
    }
}

/// A signer backend selected at runtime.
#[derive(Debug)]
pub enum ConfiguredSigner {
    /// A Nitrokey NetHSM.
    NetHsm(NetHsmSigner),

    /// An RSA private key held in memory.
    Software(SoftwareSigner),
}

/// A session of a [`ConfiguredSigner`].
#[derive(Debug)]
pub enum ConfiguredSession<'a> {
    /// A session with a Nitrokey NetHSM.
    NetHsm(NetHsmSession<'a>),

    /// A session with an RSA private key held in memory.
    Software(SoftwareSession<'a>),
}

impl SigningSession for ConfiguredSession<'_> {
    fn sign_pkcs1v15(&mut self, digest: &Digest256) -> Result<Vec<u8>, Error> {
        match self {
            Self::NetHsm(session) => session.sign_pkcs1v15(digest),
            Self::Software(session) => session.sign_pkcs1v15(digest),
        }
    }

    fn close(&mut self) -> Result<(), Error> {
        match self {
            Self::NetHsm(session) => session.close(),
            Self::Software(session) => session.close(),
        }
    }
}

impl Signer for ConfiguredSigner {
    type Session<'a> = ConfiguredSession<'a>;

    fn open(&self) -> Result<Self::Session<'_>, Error> {
        Ok(match self {
            Self::NetHsm(signer) => ConfiguredSession::NetHsm(signer.open()?),
            Self::Software(signer) => ConfiguredSession::Software(signer.open()?),
        })
    }
}

impl From<NetHsmSigner> for ConfiguredSigner {
    fn from(value: NetHsmSigner) -> Self {
        Self::NetHsm(value)
    }
}

impl From<SoftwareSigner> for ConfiguredSigner {
    fn from(value: SoftwareSigner) -> Self {
        Self::Software(value)
    }
}
