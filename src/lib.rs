// src/lib.rs
//! Local anti-tampering and secret protection for a desktop host application.

pub mod cli;
pub mod core;
pub mod security;
pub mod utils;

pub use crate::core::{GuardConfig, GuardError};
pub use crate::security::{
    decrypt_file, detect_suspicious_processes, encrypt_file, get_secret, sanitize_filename,
    sanitize_path, self_integrity_check, validate_url, verify_file_integrity,
};
