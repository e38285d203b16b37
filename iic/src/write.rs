//! Adding an IIC to an invoice document file.

use std::path::PathBuf;

use log::info;

use crate::{
    Error,
    document::InvoiceDocument,
    fields::InvoiceFields,
    generator::{Iic, IicGenerator},
    signer::Signer,
};

/// The files read and written by [`write_iic`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WriteParams {
    /// The invoice document to read.
    pub input: PathBuf,

    /// The file to write the invoice document with IIC to.
    ///
    /// May be the same as `input`.
    pub output: PathBuf,
}

/// Creates the [`Iic`] of an invoice document and writes the document with the IIC.
///
/// The document at `params.input` is read, its [`InvoiceFields`] are extracted and an [`Iic`]
/// is created for them by `generator` using `signer`.
/// The `IIC` and `IICSignature` attributes of the invoice element are set (replacing existing
/// values) and the document is written to `params.output`.
///
/// Nothing is written if any of the steps fails.
///
/// # Errors
///
/// Returns an error if
/// - the input document can not be read or parsed,
/// - a field is missing in the document,
/// - the IIC can not be created with `signer`,
/// - or the output document can not be written.
pub fn write_iic<S>(
    params: &WriteParams,
    generator: &IicGenerator,
    signer: &S,
) -> Result<Iic, Error>
where
    S: Signer + ?Sized,
{
    let mut document = InvoiceDocument::from_file(&params.input)?;
    let fields = InvoiceFields::extract(&document)?;
    let iic = generator.generate(&fields, signer)?;

    document.embed_iic(&iic)?;
    document.write_to_file(&params.output)?;
    info!(
        "Wrote IIC {} of invoice {} to {}",
        iic.code(),
        fields.inv_ord_num(),
        params.output.display()
    );

    Ok(iic)
}
