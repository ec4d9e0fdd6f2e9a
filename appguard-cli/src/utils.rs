//! Common utility functions shared across CLI commands.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use appguard_core::AttestationObject;
use chrono::{TimeZone, Utc};
use openssl::x509::X509NameRef;
use tracing::debug;

/// Read a text input from `path`, or stdin when `path` is "-".
pub fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .context("Failed to read stdin")?;
        return Ok(input);
    }

    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input: {}", path.display()))
}

/// Load and decode a base64 attestation object.
pub fn load_attestation(path: &Path) -> Result<AttestationObject> {
    let input = read_input(path)?;
    let attestation =
        AttestationObject::from_base64(&input).context("Failed to decode attestation object")?;
    debug!(
        fmt = %attestation.fmt,
        certificates = attestation.x5c.len(),
        "Decoded attestation object"
    );
    Ok(attestation)
}

/// Render an X.509 name as `CN=..., O=...`.
pub fn format_name(name: &X509NameRef) -> String {
    name.entries()
        .map(|entry| {
            let key = entry.object().nid().short_name().unwrap_or("?");
            let value = entry
                .data()
                .as_utf8()
                .map(|s| s.to_string())
                .unwrap_or_else(|_| "<binary>".to_string());
            format!("{key}={value}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Format a Unix timestamp (seconds) as a human-readable UTC string.
pub fn format_timestamp(secs: i64) -> String {
    match Utc.timestamp_opt(secs, 0) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        _ => format!("{secs}s"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openssl::x509::X509Name;

    #[test]
    fn test_format_name() {
        let mut builder = X509Name::builder().unwrap();
        builder.append_entry_by_text("CN", "device-leaf").unwrap();
        builder.append_entry_by_text("O", "Example").unwrap();
        let name = builder.build();
        assert_eq!(format_name(&name), "CN=device-leaf, O=Example");
    }

    #[test]
    fn test_format_timestamp() {
        // 2024-01-15 12:30:45 UTC
        let formatted = format_timestamp(1705321845);
        assert!(formatted.contains("2024-01-15"));
        assert!(formatted.contains("UTC"));
    }

    #[test]
    fn test_read_input_missing_file() {
        let err = read_input(Path::new("/nonexistent/attestation.b64")).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read input"));
    }
}
