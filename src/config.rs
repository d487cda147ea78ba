//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};

/// Runtime configuration for lead analysis.
#[derive(Debug, Clone)]
pub struct IntelConfig {
    /// Remote backend settings. `None` means local-only.
    pub llm: Option<LlmConfig>,
    /// Upper bound on each remote request.
    pub request_timeout: Duration,
    /// Messages processed at once in batch mode.
    pub batch_concurrency: usize,
}

impl Default for IntelConfig {
    fn default() -> Self {
        Self {
            llm: None,
            request_timeout: Duration::from_secs(30),
            batch_concurrency: 4,
        }
    }
}

impl IntelConfig {
    /// Whether remote analysis will be attempted.
    pub fn use_remote(&self) -> bool {
        self.llm.is_some()
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Remote analysis enabled without an API key is downgraded to
    /// local-only with a warning rather than failing startup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let use_remote = match lookup("LEAD_INTEL_USE_REMOTE") {
            Some(v) => parse_bool("LEAD_INTEL_USE_REMOTE", &v)?,
            None => true,
        };

        let request_timeout = match lookup("LEAD_INTEL_REQUEST_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_positive("LEAD_INTEL_REQUEST_TIMEOUT_SECS", &v)?),
            None => defaults.request_timeout,
        };

        let batch_concurrency = match lookup("LEAD_INTEL_BATCH_CONCURRENCY") {
            Some(v) => parse_positive("LEAD_INTEL_BATCH_CONCURRENCY", &v)? as usize,
            None => defaults.batch_concurrency,
        };

        let backend = match lookup("LEAD_INTEL_BACKEND") {
            Some(v) => v.parse::<LlmBackend>()?,
            None => LlmBackend::Gemini,
        };

        let llm = if use_remote {
            match lookup(backend.api_key_var()).filter(|k| !k.trim().is_empty()) {
                Some(key) => Some(LlmConfig {
                    backend,
                    api_key: SecretString::from(key),
                    model: lookup("LEAD_INTEL_MODEL")
                        .unwrap_or_else(|| backend.default_model().to_string()),
                    timeout: request_timeout,
                }),
                None => {
                    tracing::warn!(
                        "{} not set, remote analysis disabled",
                        backend.api_key_var()
                    );
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            llm,
            request_timeout,
            batch_concurrency,
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got '{other}'"),
        }),
    }
}

fn parse_positive(key: &str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a positive integer, got '{value}'"),
        }),
    }
}
