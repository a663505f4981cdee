// src/utils.rs
use thiserror::Error;

use crate::security::integrity::{DIGEST_HEX_LEN, DIGEST_LEN};

#[derive(Debug, Error)]
pub enum UtilsError {
    #[error("Invalid hex string: {0}")]
    InvalidHexString(String),
}

/// Convert a hex-encoded string to bytes.
pub fn hex_to_bytes(hex_string: &str) -> Result<Vec<u8>, UtilsError> {
    if hex_string.trim().is_empty() {
        return Err(UtilsError::InvalidHexString("Hex string cannot be empty".to_string()));
    }

    hex::decode(hex_string.trim()).map_err(|e| UtilsError::InvalidHexString(e.to_string()))
}

/// Parse the leading 64 hex characters of `s` into a SHA-256 value.
///
/// Trailing characters are ignored, the same way digest comparison ignores them.
pub fn parse_digest_hex(s: &str) -> Result<[u8; DIGEST_LEN], UtilsError> {
    let prefix = s.trim().get(..DIGEST_HEX_LEN).ok_or_else(|| {
        UtilsError::InvalidHexString(format!("expected at least {} characters", DIGEST_HEX_LEN))
    })?;
    let bytes = hex_to_bytes(prefix)?;
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Convert bytes to a hex string.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}
