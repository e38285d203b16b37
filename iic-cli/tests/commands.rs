//! Tests for the commands of `iic`.

use std::{
    ffi::OsStr,
    fs::{read_to_string, write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::Parser;
use iic_cli::{
    Error,
    cli::{Cli, Command},
    run_command,
};
use rstest::rstest;
use testdir::testdir;
use testresult::TestResult;

const SIGNING_KEY: &str = include_str!("../../iic/tests/fixtures/signing-key.pem");
const GOLDEN_SIGNATURE: &str = include_str!("../../iic/tests/fixtures/golden-signature.hex");
const INVOICE: &str = include_str!("../../iic/tests/fixtures/invoice.xml");

/// The IIC of the golden fields when signed with the fixture signing key.
const GOLDEN_IIC: &str = "bfcc5e98afb2a70ef4017fc4015fcf94";

const GOLDEN_FIELDS: [&str; 14] = [
    "--tin",
    "123456789",
    "--issue-date-time",
    "2023-01-01T10:00:00",
    "--inv-ord-num",
    "1",
    "--busin-unit-code",
    "BU1",
    "--tcr-code",
    "TCR1",
    "--soft-code",
    "SC1",
    "--tot-price",
    "100.00",
];

/// Writes a configuration for the fixture signing key to `dir` and returns its path.
fn software_config(dir: &Path) -> TestResult<PathBuf> {
    write(dir.join("signing-key.pem"), SIGNING_KEY)?;
    let config = dir.join("config.toml");
    write(
        &config,
        "[signer]\nbackend = \"software\"\nkey_file = \"signing-key.pem\"\n",
    )?;
    Ok(config)
}

#[test]
fn compute_prints_iic_and_signature() -> TestResult {
    let config = software_config(&testdir!())?;
    let mut args = vec!["iic", "compute"];
    args.extend(GOLDEN_FIELDS);
    args.extend(["--config", config.to_str().ok_or("non UTF-8 path")?]);

    let mut stdout = Vec::new();
    run_command(Cli::try_parse_from(args)?, &mut stdout)?;

    assert_eq!(
        String::from_utf8(stdout)?,
        format!("IIC={GOLDEN_IIC}\nIICSignature={GOLDEN_SIGNATURE}\n")
    );

    Ok(())
}

#[test]
fn write_embeds_iic_in_output() -> TestResult {
    let dir = testdir!();
    let config = software_config(&dir)?;
    let input = dir.join("invoice.xml");
    let output = dir.join("invoice-with-iic.xml");
    write(&input, INVOICE)?;

    let cli = Cli::try_parse_from([
        OsStr::new("iic"),
        OsStr::new("write"),
        input.as_os_str(),
        output.as_os_str(),
        OsStr::new("--config"),
        config.as_os_str(),
    ])?;
    let mut stdout = Vec::new();
    run_command(cli, &mut stdout)?;

    let written = read_to_string(&output)?;
    assert!(written.contains(&format!("IIC=\"{GOLDEN_IIC}\"")));
    assert!(written.contains(&format!("IICSignature=\"{GOLDEN_SIGNATURE}\"")));
    assert!(stdout.is_empty());
    assert_eq!(read_to_string(&input)?, INVOICE);

    Ok(())
}

#[test]
fn missing_field_fails_without_output() -> TestResult {
    let dir = testdir!();
    let config = software_config(&dir)?;
    let input = dir.join("invoice.xml");
    let output = dir.join("invoice-with-iic.xml");
    write(&input, INVOICE.replace("<Seller ", "<Buyer "))?;

    let cli = Cli::try_parse_from([
        OsStr::new("iic"),
        OsStr::new("--config"),
        config.as_os_str(),
        OsStr::new("write"),
        input.as_os_str(),
        output.as_os_str(),
    ])?;

    let error = match run_command(cli, Vec::new()) {
        Err(error) => error,
        Ok(()) => return Err("writing an invoice without seller succeeded".into()),
    };
    assert!(matches!(
        error,
        Error::Iic(iic::Error::Fields(iic::fields::Error::FieldNotFound {
            element: "Seller",
            attribute: "IDNum",
        }))
    ));
    assert_eq!(error.exit_code(), ExitCode::from(30));
    assert!(!output.exists());

    Ok(())
}

#[test]
fn missing_config_file_fails() -> TestResult {
    let config = testdir!().join("missing.toml");
    let mut args = vec![
        "iic",
        "compute",
        "--config",
        config.to_str().ok_or("non UTF-8 path")?,
    ];
    args.extend(GOLDEN_FIELDS);

    assert!(matches!(
        run_command(Cli::try_parse_from(args)?, Vec::new()),
        Err(Error::Iic(iic::Error::Config(_)))
    ));

    Ok(())
}

#[rstest]
#[case::missing_field(&["iic", "compute", "--tin", "123456789"])]
#[case::missing_output(&["iic", "write", "invoice.xml"])]
#[case::unknown_command(&["iic", "verify", "invoice.xml"])]
fn invalid_arguments_are_rejected(#[case] args: &[&str]) -> TestResult {
    assert!(Cli::try_parse_from(args).is_err());

    Ok(())
}

#[rstest]
#[case(&["iic", "write", "in.xml", "out.xml"], false)]
#[case(&["iic", "--log-plaintext", "write", "in.xml", "out.xml"], true)]
#[case(&["iic", "write", "in.xml", "out.xml", "--log-plaintext"], true)]
fn log_plaintext_is_global(#[case] args: &[&str], #[case] expected: bool) -> TestResult {
    let cli = Cli::try_parse_from(args)?;

    assert_eq!(cli.log_plaintext, expected);
    assert!(matches!(cli.command, Command::Write(_)));

    Ok(())
}
