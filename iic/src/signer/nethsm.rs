//! Signing with RSA keys on a [Nitrokey NetHSM].
//!
//! The NetHSM is accessed through its REST API.
//! Opening a session verifies that the device is reachable, that the credentials are accepted
//! and that the configured key is an RSA key.
//!
//! [Nitrokey NetHSM]: https://docs.nitrokey.com/nethsm/

use std::{fmt::Display, str::FromStr, time::Duration};

use base64ct::{Base64, Encoding as _};
use log::{debug, error, warn};
use picky_asn1_x509::{AlgorithmIdentifier, DigestInfo, ShaVariant};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    Passphrase,
    generator::Digest256,
    signer::{Error as SignerError, Signer, SigningSession, error::DeviceError},
};

/// The default timeout for requests to a NetHSM.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// An error that may occur when configuring a NetHSM signer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A key ID is not valid.
    #[error("Invalid key ID {key_id:?}: only characters in [a-z0-9] are allowed")]
    InvalidKeyId {
        /// The invalid key ID.
        key_id: String,
    },

    /// A URL can not be used for a NetHSM.
    #[error("The URL {url} can not be used for a NetHSM because {context}")]
    InvalidUrl {
        /// The URL that can not be used.
        url: Url,

        /// The reason for the URL being unusable.
        ///
        /// This is meant to complete the sentence "The URL {url} can not be used for a NetHSM
        /// because ".
        context: &'static str,
    },
}

/// A unique key identifier for a private key on a NetHSM.
///
/// A [`KeyId`] must be in the character set `[a-z0-9]` and must not be empty.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(into = "String", try_from = "String")]
pub struct KeyId(String);

impl KeyId {
    /// Constructs a new [`KeyId`] from a [`String`].
    ///
    /// # Errors
    ///
    /// Returns an error if `key_id` is empty or contains characters outside of `[a-z0-9]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use iic::signer::nethsm::KeyId;
    ///
    /// assert!(KeyId::new("iic1".into()).is_ok());
    ///
    /// assert!(KeyId::new("iic#1".into()).is_err());
    /// assert!(KeyId::new("".into()).is_err());
    /// ```
    pub fn new(key_id: String) -> Result<Self, Error> {
        if key_id.is_empty()
            || !key_id
                .chars()
                .all(|char| char.is_ascii_digit() || char.is_ascii_lowercase())
        {
            return Err(Error::InvalidKeyId { key_id });
        }

        Ok(Self(key_id))
    }
}

impl AsRef<str> for KeyId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for KeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<KeyId> for String {
    fn from(value: KeyId) -> Self {
        value.0
    }
}

impl FromStr for KeyId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.into())
    }
}

impl TryFrom<String> for KeyId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// The public information on a key, as returned by the NetHSM.
#[derive(Debug, Deserialize)]
struct KeyInfo {
    #[serde(rename = "type")]
    key_type: String,
}

/// A request for a signature.
#[derive(Debug, Serialize)]
struct SignRequest<'a> {
    mode: &'static str,
    message: &'a str,
}

/// A signature created by the NetHSM.
#[derive(Debug, Deserialize)]
struct SignResponse {
    signature: String,
}

/// A signer using an RSA key on a NetHSM.
#[derive(Debug)]
pub struct NetHsmSigner {
    url: Url,
    user: String,
    passphrase: Passphrase,
    key_id: KeyId,
    timeout: Duration,
}

impl NetHsmSigner {
    /// Creates a new [`NetHsmSigner`].
    ///
    /// The `url` points at the API root of the NetHSM (e.g. `https://nethsm.example.org/api/v1`).
    /// The `user` must be an operator of the NetHSM that may use the key `key_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if `url` has no host, or carries credentials, a query or a fragment.
    pub fn new(
        url: Url,
        user: String,
        passphrase: Passphrase,
        key_id: KeyId,
        timeout: Option<Duration>,
    ) -> Result<Self, Error> {
        let context = if !url.has_host() {
            Some("a URL must have a host component")
        } else if !url.username().is_empty() || url.password().is_some() {
            Some("a URL must not contain credentials")
        } else if url.query().is_some() || url.fragment().is_some() {
            Some("a URL must not have a query or fragment component")
        } else {
            None
        };
        if let Some(context) = context {
            return Err(Error::InvalidUrl { url, context });
        }
        if url.scheme() != "https" {
            warn!("The NetHSM at {url} is not accessed using TLS");
        }

        Ok(Self {
            url,
            user,
            passphrase,
            key_id,
            timeout: timeout.unwrap_or(DEFAULT_TIMEOUT),
        })
    }

    /// Returns the [`KeyId`] used for signing.
    pub fn key_id(&self) -> &KeyId {
        &self.key_id
    }

    /// Returns the URL of a key endpoint below the configured API root.
    fn key_url(&self, suffix: &str) -> String {
        format!(
            "{}/keys/{}{suffix}",
            self.url.as_str().trim_end_matches('/'),
            self.key_id
        )
    }

    /// Returns the value of the HTTP basic authorization header.
    fn authorization(&self) -> String {
        let credentials = format!("{}:{}", self.user, self.passphrase.expose_borrowed());
        format!("Basic {}", Base64::encode_string(credentials.as_bytes()))
    }
}

impl Signer for NetHsmSigner {
    type Session<'a> = NetHsmSession<'a>;

    fn open(&self) -> Result<Self::Session<'_>, SignerError> {
        debug!(
            "Opening NetHSM signing session for key {} at {}",
            self.key_id, self.url
        );
        let agent = ureq::AgentBuilder::new()
            .timeout(self.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build();

        let key_info: KeyInfo = agent
            .get(&self.key_url(""))
            .set("Authorization", &self.authorization())
            .call()
            .map_err(|error| SignerError::SessionInit {
                context: "retrieving the signing key from the NetHSM",
                source: request_error(error),
            })?
            .into_json()
            .map_err(|source| SignerError::SessionInit {
                context: "reading the signing key information of the NetHSM",
                source: Box::new(source),
            })?;

        if key_info.key_type != "RSA" {
            return Err(SignerError::SessionInit {
                context: "validating the signing key",
                source: format!(
                    "the key {} is of type {} but an RSA key is required",
                    self.key_id, key_info.key_type
                )
                .into(),
            });
        }

        Ok(NetHsmSession {
            signer: self,
            agent: Some(agent),
        })
    }
}

/// A session of a [`NetHsmSigner`].
#[derive(Debug)]
pub struct NetHsmSession<'a> {
    signer: &'a NetHsmSigner,
    agent: Option<ureq::Agent>,
}

impl SigningSession for NetHsmSession<'_> {
    fn sign_pkcs1v15(&mut self, digest: &Digest256) -> Result<Vec<u8>, SignerError> {
        let agent = self.agent.as_ref().ok_or_else(|| SignerError::Signing {
            context: "using a NetHSM signing session",
            source: "the session is closed".into(),
        })?;

        let message = Base64::encode_string(&digest_info(digest)?);
        let response: SignResponse = agent
            .post(&self.signer.key_url("/sign"))
            .set("Authorization", &self.signer.authorization())
            .send_json(SignRequest {
                mode: "PKCS1",
                message: &message,
            })
            .map_err(|error| {
                error!("Signing with key {} failed", self.signer.key_id);
                SignerError::Signing {
                    context: "requesting a PKCS#1 v1.5 signature from the NetHSM",
                    source: request_error(error),
                }
            })?
            .into_json()
            .map_err(|source| SignerError::Signing {
                context: "reading the signature returned by the NetHSM",
                source: Box::new(source),
            })?;

        Base64::decode_vec(&response.signature).map_err(|source| SignerError::Signing {
            context: "decoding the signature returned by the NetHSM",
            source: Box::new(source),
        })
    }

    fn close(&mut self) -> Result<(), SignerError> {
        if self.agent.take().is_some() {
            debug!(
                "Closed NetHSM signing session for key {}",
                self.signer.key_id
            );
        }
        Ok(())
    }
}

/// Converts a [`ureq::Error`] into a [`DeviceError`].
///
/// Responses with an error status are turned into a message containing the status code and the
/// message of the NetHSM.
fn request_error(error: ureq::Error) -> DeviceError {
    match error {
        ureq::Error::Status(status, response) => {
            let message = response.into_string().unwrap_or_default();
            format!("the NetHSM responded with status {status}: {message}").into()
        }
        error => Box::new(error),
    }
}

/// Wraps a SHA-256 `digest` in a DER encoded ASN.1 `DigestInfo` structure.
///
/// The NetHSM applies the PKCS#1 v1.5 padding to the data it is given, which for the
/// RSASSA-PKCS1-v1_5 signature scheme must be the `DigestInfo` of the digest.
/// See: <https://www.rfc-editor.org/rfc/rfc8017#section-9.2>
///
/// # Errors
///
/// Returns an [`SignerError::Hash`] if the `DigestInfo` can not be encoded.
fn digest_info(digest: &Digest256) -> Result<Vec<u8>, SignerError> {
    picky_asn1_der::to_vec(&DigestInfo {
        oid: AlgorithmIdentifier::new_sha(ShaVariant::SHA2_256),
        digest: digest.as_bytes().to_vec().into(),
    })
    .map_err(|source| SignerError::Hash {
        context: "encoding the digest as PKCS#1 DigestInfo",
        source: Box::new(source),
    })
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use rstest::{fixture, rstest};
    use serde_json::json;
    use testresult::TestResult;

    use super::*;

    /// The DER encoded `DigestInfo` prefix of SHA-256 digests.
    const SHA256_DIGEST_INFO_PREFIX: [u8; 19] = [
        48, 49, 48, 13, 6, 9, 96, 134, 72, 1, 101, 3, 4, 2, 1, 5, 0, 4, 32,
    ];

    /// Basic authorization of "operator1:passphrase".
    const AUTHORIZATION: &str = "Basic b3BlcmF0b3IxOnBhc3NwaHJhc2U=";

    #[fixture]
    fn server() -> MockServer {
        MockServer::start()
    }

    fn signer(server: &MockServer) -> TestResult<NetHsmSigner> {
        Ok(NetHsmSigner::new(
            server.url("/api/v1").parse()?,
            "operator1".to_string(),
            Passphrase::new("passphrase".to_string()),
            "iic1".parse()?,
            None,
        )?)
    }

    #[test]
    fn digest_info_is_wrapped_sha256() -> TestResult {
        let data = digest_info(&Digest256::new([7; 32]))?;

        assert_eq!(data[..19], SHA256_DIGEST_INFO_PREFIX);
        assert_eq!(data[19..], [7; 32]);

        Ok(())
    }

    #[rstest]
    #[case("iic1", true)]
    #[case("0", true)]
    #[case("", false)]
    #[case("IIC", false)]
    #[case("iic~1", false)]
    #[case("iic-1", false)]
    fn create_key_id(#[case] input: &str, #[case] valid: bool) -> TestResult {
        assert_eq!(KeyId::from_str(input).is_ok(), valid);

        Ok(())
    }

    #[rstest]
    #[case("https://user@nethsm.example.org/api/v1")]
    #[case("https://nethsm.example.org/api/v1?key=1")]
    #[case("unix:/run/nethsm.sock")]
    fn unusable_urls_are_rejected(#[case] url: &str) -> TestResult {
        let result = NetHsmSigner::new(
            url.parse()?,
            "operator1".to_string(),
            Passphrase::new("passphrase".to_string()),
            "iic1".parse()?,
            None,
        );

        assert!(matches!(result, Err(Error::InvalidUrl { .. })));

        Ok(())
    }

    #[rstest]
    fn sign_sends_digest_info(server: MockServer) -> TestResult {
        let digest = Digest256::new([7; 32]);
        let mut expected_data = SHA256_DIGEST_INFO_PREFIX.to_vec();
        expected_data.extend_from_slice(&[7; 32]);
        let expected_message = Base64::encode_string(&expected_data);

        let key = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/keys/iic1")
                .header("Authorization", AUTHORIZATION);
            then.status(200)
                .json_body(json!({"type": "RSA", "mechanisms": ["RSA_Signature_PKCS1"]}));
        });
        let sign = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/keys/iic1/sign")
                .header("Authorization", AUTHORIZATION)
                .json_body(json!({"mode": "PKCS1", "message": expected_message}));
            then.status(200)
                .json_body(json!({"signature": Base64::encode_string(&[1, 2, 3, 4])}));
        });

        let signer = signer(&server)?;
        let signature = signer.scoped_session()?.sign_pkcs1v15(&digest)?;

        assert_eq!(signature, vec![1, 2, 3, 4]);
        key.assert();
        sign.assert();

        Ok(())
    }

    #[rstest]
    fn rejected_credentials_fail_session_init(server: MockServer) -> TestResult {
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/keys/iic1");
            then.status(401).body("Unauthorized");
        });

        let signer = signer(&server)?;

        match signer.open() {
            Err(SignerError::SessionInit { source, .. }) => {
                assert!(source.to_string().contains("401"));
            }
            result => panic!("Expected a session init error, but got {result:?}"),
        }

        Ok(())
    }

    #[rstest]
    fn non_rsa_key_fails_session_init(server: MockServer) -> TestResult {
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/keys/iic1");
            then.status(200)
                .json_body(json!({"type": "Curve25519", "mechanisms": ["EdDSA_Signature"]}));
        });

        let signer = signer(&server)?;

        assert!(matches!(
            signer.open(),
            Err(SignerError::SessionInit { .. })
        ));

        Ok(())
    }

    #[rstest]
    fn rejected_signature_fails_signing(server: MockServer) -> TestResult {
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/keys/iic1");
            then.status(200).json_body(json!({"type": "RSA"}));
        });
        server.mock(|when, then| {
            when.method(POST).path("/api/v1/keys/iic1/sign");
            then.status(412).body("NetHSM is locked");
        });

        let signer = signer(&server)?;
        let mut session = signer.scoped_session()?;

        match session.sign_pkcs1v15(&Digest256::new([0; 32])) {
            Err(SignerError::Signing { source, .. }) => {
                assert!(source.to_string().contains("NetHSM is locked"));
            }
            result => panic!("Expected a signing error, but got {result:?}"),
        }

        Ok(())
    }
}
