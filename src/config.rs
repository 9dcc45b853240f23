use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;

pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama2";

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub ollama_host: String,
    pub default_model: String,
    /// Limits blocking runtime calls and the connect phase of streams.
    /// Unset means a call waits as long as the runtime takes.
    pub runtime_timeout: Option<Duration>,
    /// Browser origins allowed to call the API. Empty means any origin.
    pub cors_origins: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            runtime_timeout: None,
            cors_origins: Vec::new(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("PORT must be a port number, got '{}'", raw))?,
            None => defaults.port,
        };

        let runtime_timeout = match lookup("RUNTIME_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.parse::<u64>().with_context(|| {
                    format!("RUNTIME_TIMEOUT_SECS must be a whole number, got '{}'", raw)
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        let settings = Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port,
            ollama_host: lookup("OLLAMA_HOST")
                .map(|h| h.trim_end_matches('/').to_string())
                .unwrap_or(defaults.ollama_host),
            default_model: lookup("DEFAULT_MODEL")
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(defaults.default_model),
            runtime_timeout,
            cors_origins: lookup("CORS_ALLOWED_ORIGINS")
                .map(|raw| parse_origins(&raw))
                .unwrap_or(defaults.cors_origins),
        };

        info!(
            "Settings: bind {}:{}, runtime {}, default model {}",
            settings.host, settings.port, settings.ollama_host, settings.default_model
        );
        Ok(settings)
    }
}

/// Comma-separated list; `*` anywhere in it means any origin.
fn parse_origins(raw: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect();

    if origins.iter().any(|o| o == "*") {
        Vec::new()
    } else {
        origins
    }
}
