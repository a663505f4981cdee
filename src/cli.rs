// src/cli.rs
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::core::config::GuardConfig;
use crate::security::environment::assess_environment;
use crate::security::file_cipher::{decrypt_file_checked, encrypt_file_checked};
use crate::security::integrity::{
    digest_file, self_integrity_check, verify_file_integrity, EXPECTED_SELF_DIGEST,
};
use crate::security::process_scan::{find_suspicious_processes, SystemIntrospector};
use crate::security::redaction::redact_hex_bytes;
use crate::security::sanitizer::{sanitize_filename, sanitize_path, validate_url_with};
use crate::security::secret_gate::{SecretGate, SECRET_LEN};
use crate::utils::parse_digest_hex;

/// hostguard CLI (library-facing definitions)
#[derive(Debug, Parser)]
#[command(name = "hostguard", about = "Local anti-tampering and secret protection")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// TOML policy file (blocklist, allowed domains)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the SHA-256 of a file
    Digest { file: PathBuf },
    /// Check a file against an expected hex digest
    Verify { file: PathBuf, expected: String },
    /// Check the running binary against its embedded digest
    SelfCheck,
    /// Look for reverse-engineering tools in the process table
    Scan,
    /// Report every detection signal and whether the secret gate opens
    Status,
    /// Encrypt a file into a self-contained record
    Encrypt { input: PathBuf, output: PathBuf },
    /// Decrypt a record produced by `encrypt`
    Decrypt { input: PathBuf, output: PathBuf },
    /// Print a filesystem-safe version of a filename
    SanitizeName { name: String },
    /// Print a path with traversal sequences removed
    SanitizePath { path: String },
    /// Check a URL against the allowed domains
    ValidateUrl { url: String },
}

/// Effective policy: the `--config` file if given, defaults otherwise,
/// environment overrides on top in both cases.
pub fn load_config(path: Option<&Path>) -> Result<GuardConfig> {
    let config = match path {
        Some(p) => GuardConfig::load(p)?,
        None => GuardConfig::default().with_env_overrides()?,
    };
    Ok(config)
}

/// Execute one command. `Ok(false)` is a negative result (mismatch, detection,
/// rejected input), not an error.
pub fn run(cli: &Cli) -> Result<bool> {
    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;

    match &cli.command {
        Commands::Digest { file } => {
            let digest = digest_file(file)?;
            println!("{}  {}", digest, file.display());
            Ok(true)
        }
        Commands::Verify { file, expected } => {
            parse_digest_hex(expected).context("Expected digest is not valid hex")?;
            let ok = verify_file_integrity(file, expected);
            println!("{}", if ok { "OK" } else { "MISMATCH" });
            Ok(ok)
        }
        Commands::SelfCheck => {
            let ok = self_integrity_check();
            println!("self-integrity: {}", if ok { "OK" } else { "FAILED" });
            Ok(ok)
        }
        Commands::Scan => {
            let blocklist = config.process_blocklist.as_slice();
            let hits = find_suspicious_processes(&SystemIntrospector, blocklist);
            for hit in &hits {
                println!("{}\t{}", hit.pid, hit.name);
            }
            info!("{} suspicious process(es) found", hits.len());
            Ok(hits.is_empty())
        }
        Commands::Status => {
            let report = assess_environment(
                &SystemIntrospector,
                EXPECTED_SELF_DIGEST,
                config.process_blocklist.as_slice(),
            );
            println!("self-integrity:       {}", report.self_integrity_ok);
            println!("debugger attached:    {}", report.debugger_attached);
            println!("suspicious processes: {}", report.suspicious_processes.len());

            let gate = SecretGate::system();
            let mut secret = Zeroizing::new([0u8; SECRET_LEN]);
            if gate.get_secret(&mut secret[..]) {
                println!("secret gate:          open {}", redact_hex_bytes(&secret[..]));
            } else {
                println!("secret gate:          closed");
            }
            Ok(report.is_safe())
        }
        Commands::Encrypt { input, output } => {
            encrypt_file_checked(input, output)
                .with_context(|| format!("Failed to encrypt {}", input.display()))?;
            info!("Encrypted {} -> {}", input.display(), output.display());
            Ok(true)
        }
        Commands::Decrypt { input, output } => {
            decrypt_file_checked(input, output)
                .map_err(|err| {
                    if err.is_critical() {
                        warn!("{} rejected by the cipher, possibly altered", input.display());
                    }
                    err
                })
                .with_context(|| format!("Failed to decrypt {}", input.display()))?;
            info!("Decrypted {} -> {}", input.display(), output.display());
            Ok(true)
        }
        Commands::SanitizeName { name } => {
            println!("{}", sanitize_filename(name));
            Ok(true)
        }
        Commands::SanitizePath { path } => {
            println!("{}", sanitize_path(path));
            Ok(true)
        }
        Commands::ValidateUrl { url } => {
            let ok = validate_url_with(url, config.allowed_domains.as_slice());
            if !ok {
                warn!("URL rejected");
            }
            println!("{}", if ok { "valid" } else { "invalid" });
            Ok(ok)
        }
    }
}
