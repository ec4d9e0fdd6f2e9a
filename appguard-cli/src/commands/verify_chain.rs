//! Verify-chain command implementation.

use std::path::Path;

use anyhow::{bail, Context, Result};
use appguard_core::{verify_chain, RootTrustStore};
use colored::Colorize;
use tracing::{error, info};

use crate::utils::{format_name, load_attestation};

/// Execute the verify-chain command.
pub fn execute(file: &Path, root_path: &Path, quiet: bool) -> Result<()> {
    let trust = RootTrustStore::new(root_path);
    let root = trust
        .get_root_certificate()
        .with_context(|| format!("Failed to read root certificate: {}", root_path.display()))?;

    let attestation = load_attestation(file)?;
    let certificates = attestation
        .certificates()
        .context("Failed to decode certificate chain")?;

    if verify_chain(&certificates, root) {
        info!(certificates = certificates.len(), "Chain verified");

        if !quiet {
            println!();
            println!("   {} {}", "Chain:".dimmed(), "TRUSTED".green().bold());
            if let Some(leaf) = certificates.first() {
                println!("   {} {}", "Leaf:".dimmed(), format_name(leaf.subject_name()));
            }
            println!("   {} {}", "Root:".dimmed(), format_name(root.subject_name()));
        }
        Ok(())
    } else {
        error!(certificates = certificates.len(), "Chain rejected");

        if !quiet {
            println!();
            println!("   {} {}", "Chain:".dimmed(), "REJECTED".red().bold());
        }
        bail!("Chain verification failed")
    }
}
