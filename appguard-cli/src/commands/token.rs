//! Token command implementation.

use anyhow::{bail, Result};
use appguard_core::SessionClaims;
use colored::Colorize;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use tracing::{error, info};

use crate::utils::format_timestamp;

/// Execute the token command.
pub fn execute(token: &str, secret: &str, quiet: bool) -> Result<()> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;
    validation.leeway = 0;

    let claims = match decode::<SessionClaims>(
        token.trim(),
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => data.claims,
        Err(e) => {
            let reason = match e.kind() {
                ErrorKind::ExpiredSignature => "token expired".to_string(),
                ErrorKind::InvalidSignature => "signature mismatch".to_string(),
                _ => e.to_string(),
            };
            error!(reason = %reason, "Token rejected");

            if !quiet {
                println!();
                println!("   {} {}", "Token:".dimmed(), "INVALID".red().bold());
                println!("   {} {}", "Reason:".dimmed(), reason.red());
            }
            bail!("Token verification failed: {reason}")
        }
    };

    info!(user_id = %claims.user_id, device_uuid = %claims.device_uuid, "Token valid");

    if !quiet {
        println!();
        println!("   {} {}", "Token:".dimmed(), "VALID".green().bold());
        println!("   {} {}", "User:".dimmed(), claims.user_id);
        println!("   {} {}", "Device:".dimmed(), claims.device_uuid);
        println!("   {} {}", "Issued:".dimmed(), format_timestamp(claims.iat));
        println!("   {} {}", "Expires:".dimmed(), format_timestamp(claims.exp));
        println!("   {} {}", "JTI:".dimmed(), claims.jti);
    }

    Ok(())
}
