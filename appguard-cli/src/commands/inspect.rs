//! Inspect command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use appguard_core::{find_app_attest_extension, APP_ATTEST_FORMAT};
use colored::Colorize;
use serde_json::json;
use tracing::info;

use crate::utils::{format_name, load_attestation};

/// Execute the inspect command.
pub fn execute(file: &Path, as_json: bool, quiet: bool) -> Result<()> {
    let attestation = load_attestation(file)?;

    let certificates = attestation
        .certificates()
        .context("Failed to decode certificate chain")?;

    let identifier = match attestation.x5c.first() {
        Some(leaf) => find_app_attest_extension(leaf)
            .context("Failed to decode attestation extension")?
            .map(|ext| ext.identifier_hex()),
        None => None,
    };

    info!(
        fmt = %attestation.fmt,
        certificates = certificates.len(),
        has_extension = identifier.is_some(),
        "Inspected attestation object"
    );

    if quiet {
        return Ok(());
    }

    let chain: Vec<_> = certificates
        .iter()
        .map(|cert| {
            (
                format_name(cert.subject_name()),
                format_name(cert.issuer_name()),
            )
        })
        .collect();

    if as_json {
        let report = json!({
            "fmt": attestation.fmt,
            "auth_data_len": attestation.auth_data.len(),
            "receipt_len": attestation.receipt.as_ref().map(Vec::len),
            "certificates": chain
                .iter()
                .map(|(subject, issuer)| json!({ "subject": subject, "issuer": issuer }))
                .collect::<Vec<_>>(),
            "extension_identifier": identifier,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let fmt = if attestation.fmt == APP_ATTEST_FORMAT {
        attestation.fmt.green()
    } else {
        attestation.fmt.yellow()
    };

    println!();
    println!("   {} {}", "Format:".dimmed(), fmt);
    println!(
        "   {} {} bytes",
        "authData:".dimmed(),
        attestation.auth_data.len()
    );
    match &attestation.receipt {
        Some(receipt) => println!("   {} {} bytes", "Receipt:".dimmed(), receipt.len()),
        None => println!("   {} {}", "Receipt:".dimmed(), "none".dimmed()),
    }

    println!("   {}", "Certificates:".dimmed());
    if chain.is_empty() {
        println!("     {}", "none".red());
    }
    for (i, (subject, issuer)) in chain.iter().enumerate() {
        println!("     [{i}] {subject}");
        println!("         {} {issuer}", "issuer:".dimmed());
    }

    match identifier {
        Some(hex) => println!("   {} {}", "Identifier:".dimmed(), hex),
        None => println!("   {} {}", "Identifier:".dimmed(), "missing".red()),
    }

    Ok(())
}
