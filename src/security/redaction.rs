// src/security/redaction.rs
// Keeps secret and key bytes out of logs and CLI output.
use std::env;

/// Set to `1` to print byte material in clear (local debugging only).
pub const PRINT_SECRETS_ENV: &str = "HOSTGUARD_PRINT_SECRETS";

fn printing_allowed() -> bool {
    env::var(PRINT_SECRETS_ENV).ok().as_deref() == Some("1")
}

/// Redact hex-serializable bytes unless HOSTGUARD_PRINT_SECRETS=1 is set.
pub fn redact_hex_bytes(bytes: &[u8]) -> String {
    if printing_allowed() {
        return hex::encode(bytes);
    }
    format!("<redacted hex len={}>", bytes.len())
}
