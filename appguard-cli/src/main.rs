//! AppGuard CLI - operator tooling for device attestation.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_codes;
mod utils;

use exit_codes::ExitCode;

#[derive(Parser)]
#[command(name = "appguard")]
#[command(author, version, about = "Device attestation operator tooling", long_about = None)]
#[command(after_help = "Exit codes:\n  0   Success\n  1   General error\n  65  Verification failed (chain rejected, token invalid or expired)\n  66  Input file not found or unreadable")]
struct Cli {
    /// Suppress decorated output (exit code only)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a base64 attestation object and print its contents
    Inspect {
        /// Attestation object file, or "-" for stdin
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print machine-readable JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Verify an attestation object's certificate chain against a root
    VerifyChain {
        /// Attestation object file, or "-" for stdin
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Pinned root certificate (PEM)
        #[arg(long, value_name = "PEM")]
        root: PathBuf,
    },

    /// Decode and validate a session token
    Token {
        /// Session token (JWT)
        #[arg(value_name = "TOKEN")]
        token: String,

        /// HS256 session secret
        #[arg(long)]
        secret: String,
    },
}

fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Inspect { file, json } => commands::inspect::execute(&file, json, cli.quiet),
        Commands::VerifyChain { file, root } => {
            commands::verify_chain::execute(&file, &root, cli.quiet)
        }
        Commands::Token { token, secret } => commands::token::execute(&token, &secret, cli.quiet),
    };

    let exit = match result {
        Ok(()) => ExitCode::success(),
        Err(err) => ExitCode::from_anyhow(&err),
    };

    if let Some(message) = &exit.message {
        eprintln!("{} {}", "Error:".red().bold(), message);
    }

    std::process::ExitCode::from(exit.code as u8)
}
