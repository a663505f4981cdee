use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::errors::GuardError;
use crate::security::process_scan::DEFAULT_PROCESS_BLOCKLIST;
use crate::security::sanitizer::DEFAULT_ALLOWED_DOMAINS;

/// Environment override for the process blocklist (comma separated).
pub const BLOCKLIST_ENV: &str = "HOSTGUARD_BLOCKLIST";
/// Environment override for the URL domain allow-list (comma separated).
pub const ALLOWED_DOMAINS_ENV: &str = "HOSTGUARD_ALLOWED_DOMAINS";

/// Detection and validation policy.
///
/// The embedded secret and the expected self digest are build-time
/// constants and deliberately not part of this struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Executable names that indicate a reverse-engineering tool
    #[serde(default = "GuardConfig::default_process_blocklist")]
    pub process_blocklist: Vec<String>,

    /// Hosts accepted by URL validation (a `www.` prefix is always accepted)
    #[serde(default = "GuardConfig::default_allowed_domains")]
    pub allowed_domains: Vec<String>,
}

impl GuardConfig {
    fn default_process_blocklist() -> Vec<String> {
        DEFAULT_PROCESS_BLOCKLIST.iter().map(|s| s.to_string()).collect()
    }

    fn default_allowed_domains() -> Vec<String> {
        DEFAULT_ALLOWED_DOMAINS.iter().map(|s| s.to_string()).collect()
    }

    /// Parse a TOML document. Missing keys fall back to the defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, GuardError> {
        let config: GuardConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, GuardError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| GuardError::Config(format!("read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&raw)?.with_env_overrides()
    }

    /// Replace lists with the `HOSTGUARD_*` environment values when set.
    pub fn with_env_overrides(mut self) -> Result<Self, GuardError> {
        if let Some(list) = env_list(BLOCKLIST_ENV) {
            self.process_blocklist = list;
        }
        if let Some(list) = env_list(ALLOWED_DOMAINS_ENV) {
            self.allowed_domains = list;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), GuardError> {
        if self.process_blocklist.iter().any(|n| n.trim().is_empty()) {
            return Err(GuardError::Config("process_blocklist contains an empty name".to_string()));
        }
        if self.allowed_domains.is_empty() {
            return Err(GuardError::Config("allowed_domains cannot be empty".to_string()));
        }
        if self.allowed_domains.iter().any(|d| d.trim().is_empty() || d.contains('/')) {
            return Err(GuardError::Config(
                "allowed_domains must contain bare host names".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            process_blocklist: Self::default_process_blocklist(),
            allowed_domains: Self::default_allowed_domains(),
        }
    }
}

fn env_list(name: &str) -> Option<Vec<String>> {
    let raw = std::env::var(name).ok()?;
    let items: Vec<String> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_lists() {
        let config = GuardConfig::default();
        assert!(config.process_blocklist.iter().any(|n| n == "x64dbg.exe"));
        assert!(config.allowed_domains.iter().any(|d| d == "youtube.com"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = GuardConfig::from_toml_str("process_blocklist = [\"gdb\"]\n").unwrap();
        assert_eq!(config.process_blocklist, vec!["gdb".to_string()]);
        assert_eq!(config.allowed_domains, GuardConfig::default().allowed_domains);
    }

    #[test]
    fn test_empty_allow_list_rejected() {
        let result = GuardConfig::from_toml_str("allowed_domains = []\n");
        assert!(matches!(result, Err(GuardError::Config(_))));
    }

    #[test]
    fn test_domain_with_path_rejected() {
        let result = GuardConfig::from_toml_str("allowed_domains = [\"youtube.com/watch\"]\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_malformed_toml() {
        assert!(GuardConfig::from_toml_str("process_blocklist = ").is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var(BLOCKLIST_ENV, "gdb, lldb ,");
        let config = GuardConfig::default().with_env_overrides().unwrap();
        std::env::remove_var(BLOCKLIST_ENV);
        assert_eq!(config.process_blocklist, vec!["gdb".to_string(), "lldb".to_string()]);
    }

    #[test]
    #[serial]
    fn test_blank_env_override_ignored() {
        std::env::set_var(ALLOWED_DOMAINS_ENV, " , ");
        let config = GuardConfig::default().with_env_overrides().unwrap();
        std::env::remove_var(ALLOWED_DOMAINS_ENV);
        assert_eq!(config, GuardConfig::default());
    }
}
