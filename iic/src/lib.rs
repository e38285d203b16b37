//! Creation of Invoice Identification Codes (IIC) for fiscal invoices.
//!
//! An IIC identifies an invoice towards the tax authority.
//! It is derived from seven fields of the invoice, that are signed with an RSA key on a signing
//! device:
//!
//! ```text
//! IIC          = hex(MD5(Signature))
//! IICSignature = hex(Signature)
//! Signature    = RSA-PKCS#1-v1.5(SHA-256(TIN|IssueDateTime|InvOrdNum|BusinUnitCode|TCRCode|SoftCode|TotPrice))
//! ```
//!
//! # Examples
//!
//! Adding the IIC to an invoice document using the configured signing device:
//!
//! ```no_run
//! use std::path::PathBuf;
//!
//! use iic::{IicGenerator, WriteParams, config::IicConfig, write_iic};
//!
//! # fn main() -> testresult::TestResult {
//! let config = IicConfig::from_file(None)?;
//! let signer = config.signer()?;
//! let generator = IicGenerator::new(config.plaintext_logging());
//!
//! let iic = write_iic(
//!     &WriteParams {
//!         input: PathBuf::from("invoice.xml"),
//!         output: PathBuf::from("invoice-with-iic.xml"),
//!     },
//!     &generator,
//!     &signer,
//! )?;
//! println!("{iic}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod fields;
pub mod generator;
pub mod passphrase;
pub mod signer;
pub mod write;

pub use document::InvoiceDocument;
pub use error::{Error, ErrorExitCode};
pub use fields::InvoiceFields;
pub use generator::{Iic, IicGenerator, PlaintextLogging};
pub use passphrase::Passphrase;
pub use signer::{ConfiguredSigner, NetHsmSigner, Signer, SigningSession, SoftwareSigner};
pub use write::{WriteParams, write_iic};
