//! Command line interface for `iic`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::Verbosity;
use iic::InvoiceFields;

/// Command line arguments for the creation of IICs.
#[derive(Debug, Parser)]
#[command(
    about = "Create Invoice Identification Codes (IIC) for fiscal invoices.",
    long_about = "Create Invoice Identification Codes (IIC) for fiscal invoices.

The fields TIN, IssueDateTime, InvOrdNum, BusinUnitCode, TCRCode, SoftCode and TotPrice of an
invoice are joined with \"|\" and signed (RSA PKCS#1 v1.5 over SHA-256) by the configured
signing device. The IIC is the hex encoded MD5 digest of the signature.

The configuration file is read from --config, or the first of
/run/iic/config.toml, /etc/iic/config.toml, /usr/local/share/iic/config.toml and
/usr/share/iic/config.toml that exists.",
    version
)]
pub struct Cli {
    /// Global processing log verbosity.
    #[command(flatten)]
    pub verbosity: Verbosity,

    /// The configuration file to use.
    #[arg(env = "IIC_CONFIG", global = true, long)]
    pub config: Option<PathBuf>,

    /// Log the plaintext of every IIC on the log target "iic::plaintext".
    #[arg(global = true, long)]
    pub log_plaintext: bool,

    /// The command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// The commands of `iic`.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add the IIC and IIC signature to an invoice document.
    ///
    /// The IIC and IICSignature attributes of the Invoice element are set, replacing existing
    /// values. The output file is only written if the IIC is created successfully.
    Write(WriteCommand),

    /// Print the IIC and IIC signature of invoice fields.
    Compute(ComputeCommand),
}

/// Arguments for adding an IIC to an invoice document.
#[derive(Args, Debug)]
pub struct WriteCommand {
    /// The invoice document to read.
    pub input: PathBuf,

    /// The file to write the invoice document with IIC to.
    pub output: PathBuf,
}

/// The invoice fields to create an IIC for.
#[derive(Args, Debug)]
pub struct ComputeCommand {
    /// The tax identification number of the seller.
    #[arg(long)]
    pub tin: String,

    /// The date and time of issue (e.g. "2023-01-01T10:00:00").
    #[arg(long)]
    pub issue_date_time: String,

    /// The ordinal number of the invoice.
    #[arg(long)]
    pub inv_ord_num: String,

    /// The business unit code.
    #[arg(long)]
    pub busin_unit_code: String,

    /// The code of the electronic cash register.
    #[arg(long)]
    pub tcr_code: String,

    /// The code of the invoicing software.
    #[arg(long)]
    pub soft_code: String,

    /// The total price of the invoice (e.g. "100.00").
    #[arg(long)]
    pub tot_price: String,
}

impl From<ComputeCommand> for InvoiceFields {
    fn from(value: ComputeCommand) -> Self {
        InvoiceFields::new(
            value.tin,
            value.issue_date_time,
            value.inv_ord_num,
            value.busin_unit_code,
            value.tcr_code,
            value.soft_code,
            value.tot_price,
        )
    }
}
