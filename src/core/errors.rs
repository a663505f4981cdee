use thiserror::Error;

/// Error type for guard operations.
///
/// Public boundary functions collapse these into boolean results; the
/// variants exist so internal code can use `?` and so the CLI can report
/// what went wrong at a coarse level.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Null/empty/too-short inputs.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// File not found, unreadable or unwritable.
    #[error("IO error: {0}")]
    Io(String),
    /// Random generation, cipher or padding failures. Never carries detail.
    #[error("Crypto error: {0}")]
    Crypto(&'static str),
    /// Process enumeration or self image resolution failures.
    #[error("Environment error: {0}")]
    Environment(String),
    /// Configuration file or override errors.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl GuardError {
    /// Errors the host should treat as a possible attack rather than bad luck.
    pub fn is_critical(&self) -> bool {
        matches!(self, GuardError::Crypto(_))
    }
}

impl From<std::io::Error> for GuardError {
    fn from(err: std::io::Error) -> Self {
        GuardError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for GuardError {
    fn from(err: toml::de::Error) -> Self {
        GuardError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_io_error() {
        let err = GuardError::Io("disk gone".to_string());
        assert_eq!(format!("{}", err), "IO error: disk gone");
    }

    #[test]
    fn test_display_crypto_error() {
        let err = GuardError::Crypto("decryption failed");
        assert_eq!(format!("{}", err), "Crypto error: decryption failed");
        assert!(err.is_critical());
    }

    #[test]
    fn test_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: GuardError = io.into();
        match err {
            GuardError::Io(msg) => assert_eq!(msg, "missing"),
            _ => panic!("Expected Io variant"),
        }
    }

    #[test]
    fn test_environment_is_not_critical() {
        let err = GuardError::Environment("enumeration failed".to_string());
        assert!(!err.is_critical());
    }
}
