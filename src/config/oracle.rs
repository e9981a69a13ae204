//! Model provider configuration
//!
//! Resolution order for each setting:
//! 1. Environment variables (`OPENAI_BASE_URL`, `INTENT_MODEL`) - highest priority
//! 2. Config file values
//! 3. Built-in defaults (OpenAI endpoint, `gpt-4o`)
//!
//! The API key itself is never stored in the config; only the name of the
//! environment variable holding it is.
//!
//! # Examples
//!
//! ```bash
//! export OPENAI_API_KEY="sk-..."
//! # Optional: any chat-completions compatible provider
//! export OPENAI_BASE_URL="https://openrouter.ai/api/v1"
//! export INTENT_MODEL="gpt-4o-mini"
//! ```

use crate::oracle::OracleError;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

/// Environment variable names
pub mod env_vars {
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
    pub const INTENT_MODEL: &str = "INTENT_MODEL";
}

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Settings for the model provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Provider API root; `chat/completions` is appended. Unset means
    /// [`DEFAULT_BASE_URL`].
    pub base_url: Option<Url>,
    /// Model used when a request does not name one
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// HTTP timeout for one generation request
    pub request_timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            model: DEFAULT_MODEL.to_string(),
            api_key_env: env_vars::OPENAI_API_KEY.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl OracleConfig {
    /// Override settings from environment variables
    pub fn apply_env(&mut self) -> crate::Result<()> {
        if let Some(url) = non_empty_env(env_vars::OPENAI_BASE_URL) {
            tracing::debug!("Using OPENAI_BASE_URL for model provider");
            self.base_url = Some(parse_base_url(&url)?);
        }
        if let Some(model) = non_empty_env(env_vars::INTENT_MODEL) {
            tracing::debug!(model = %model, "Using INTENT_MODEL as default model");
            self.model = model;
        }
        Ok(())
    }

    /// Read the API key from `api_key_env`
    pub fn api_key(&self) -> Result<SecretString, OracleError> {
        non_empty_env(&self.api_key_env)
            .map(SecretString::from)
            .ok_or_else(|| OracleError::MissingApiKey(self.api_key_env.clone()))
    }

    pub fn has_api_key(&self) -> bool {
        non_empty_env(&self.api_key_env).is_some()
    }

    /// Full chat-completions endpoint derived from `base_url`
    pub fn completions_url(&self) -> crate::Result<Url> {
        let mut base = match &self.base_url {
            Some(url) => parse_base_url(url.as_str())?,
            None => parse_base_url(DEFAULT_BASE_URL)?,
        };
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join("chat/completions")
            .map_err(|e| crate::Error::Config(format!("Invalid completions URL: {}", e)))
    }
}

/// Parse a provider API root
pub fn parse_base_url(raw: &str) -> crate::Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| crate::Error::Config(format!("Invalid base_url {:?}: {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(crate::Error::Config(format!(
            "base_url {:?} cannot be used as an API root",
            raw
        )));
    }
    Ok(url)
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_default_completions_url() {
        let config = OracleConfig::default();
        assert_eq!(
            config.completions_url().unwrap().as_str(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_trailing_slash_base_url() {
        let config = OracleConfig {
            base_url: Some(parse_base_url("https://openrouter.ai/api/v1/").unwrap()),
            ..OracleConfig::default()
        };
        assert_eq!(
            config.completions_url().unwrap().as_str(),
            "https://openrouter.ai/api/v1/chat/completions"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            parse_base_url("not a url"),
            Err(crate::Error::Config(_))
        ));
        assert!(matches!(
            parse_base_url("mailto:ops@example.com"),
            Err(crate::Error::Config(_))
        ));
        assert_eq!(
            parse_base_url(" http://localhost:11434/v1 ").unwrap().as_str(),
            "http://localhost:11434/v1"
        );
    }

    #[test]
    fn test_unusable_base_url_rejected_by_completions_url() {
        let config = OracleConfig {
            base_url: Some(Url::parse("data:text/plain,hello").unwrap()),
            ..OracleConfig::default()
        };
        assert!(matches!(
            config.completions_url(),
            Err(crate::Error::Config(_))
        ));
    }

    #[test]
    fn test_api_key_from_custom_env() {
        let config = OracleConfig {
            api_key_env: "WALLET_INTENT_TEST_KEY_PRESENT".to_string(),
            ..OracleConfig::default()
        };
        std::env::set_var("WALLET_INTENT_TEST_KEY_PRESENT", "sk-test");
        assert!(config.has_api_key());
        assert_eq!(config.api_key().unwrap().expose_secret(), "sk-test");
        std::env::remove_var("WALLET_INTENT_TEST_KEY_PRESENT");
    }

    #[test]
    fn test_missing_api_key() {
        let config = OracleConfig {
            api_key_env: "WALLET_INTENT_TEST_KEY_ABSENT".to_string(),
            ..OracleConfig::default()
        };
        match config.api_key() {
            Err(OracleError::MissingApiKey(name)) => {
                assert_eq!(name, "WALLET_INTENT_TEST_KEY_ABSENT")
            }
            other => panic!("expected missing key error, got {:?}", other.is_ok()),
        }
    }
}
