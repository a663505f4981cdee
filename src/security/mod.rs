// src/security/mod.rs
//! Anti-tampering and secret protection
//!
//! Debugger and tooling detection, integrity verification, the secret gate,
//! per-file encryption and input sanitization.

pub mod anti_debug;
pub mod environment;
pub mod file_cipher;
pub mod integrity;
pub mod process_scan;
pub mod sanitizer;
pub mod sealed_data;
pub mod secret_gate;

// Re-export commonly used security functions for convenience
pub use anti_debug::is_debugger_present;
pub use environment::{assess_environment, is_safe_environment, EnvironmentReport};
pub use file_cipher::{decrypt_file, encrypt_file};
pub use integrity::{digest_of, self_integrity_check, verify_file_integrity, Digest};
pub use process_scan::{
    detect_suspicious_processes, ProcessIdentity, ProcessIntrospector, SystemIntrospector,
};
pub use sanitizer::{sanitize_filename, sanitize_path, validate_url};
pub use sealed_data::DataSealer;
pub use secret_gate::{get_secret, SecretGate};

// Redaction helpers to avoid accidental secret prints
pub mod redaction;
pub use redaction::redact_hex_bytes;
