//! Configuration for the wallet intent agent

pub mod oracle;

use serde::{Deserialize, Serialize};
use std::path::Path;

// Re-export model provider config
pub use oracle::OracleConfig;

/// Audit log path environment variable name
pub const AUDIT_LOG_ENV: &str = "INTENT_AUDIT_LOG";

/// Main configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Model provider settings
    #[serde(default)]
    pub oracle: OracleConfig,
    /// Path to audit log file (JSONL); no audit trail when unset
    #[serde(default)]
    pub audit_log_path: Option<String>,
}

impl Config {
    /// Load from an optional JSON file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    crate::Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                serde_json::from_str(&content).map_err(|e| {
                    crate::Error::Config(format!("Failed to parse {}: {}", path.display(), e))
                })?
            }
            None => Config::default(),
        };
        config.apply_env()?;
        // Reject an unusable provider root before any request is made
        config.oracle.completions_url()?;
        Ok(config)
    }

    /// Override settings from environment variables
    pub fn apply_env(&mut self) -> crate::Result<()> {
        self.oracle.apply_env()?;
        if let Ok(path) = std::env::var(AUDIT_LOG_ENV) {
            if !path.trim().is_empty() {
                self.audit_log_path = Some(path.trim().to_string());
            }
        }
        Ok(())
    }
}
