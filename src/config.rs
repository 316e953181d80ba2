// src/config.rs
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Value shipped in `.env.example`; treated the same as a missing key.
pub const PLACEHOLDER_API_KEY: &str = "your_google_api_key_here";

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODELS: [&str; 3] = ["gemini-1.5-flash", "gemini-1.5-pro", "gemini-pro"];
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// API credential as read from the environment.
///
/// Never rejected at startup; the dispatcher checks it on every request.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential(Option<String>);

impl Credential {
    pub fn new(raw: Option<String>) -> Self {
        Self(raw)
    }

    /// The key, if it is present, non-blank and not the placeholder.
    pub fn usable(&self) -> Option<&str> {
        match self.0.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() && key != PLACEHOLDER_API_KEY => Some(key),
            _ => None,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.usable().is_some()
    }
}

// Keep the key out of logs.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shown = if self.is_configured() { "<redacted>" } else { "<unset>" };
        f.debug_tuple("Credential").field(&shown).finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Credential,
    pub port: u16,
    pub api_base: String,
    pub models: Vec<String>,
    pub upstream_timeout: Duration,
    pub static_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: Credential::default(),
            port: DEFAULT_PORT,
            api_base: DEFAULT_API_BASE.to_string(),
            models: default_models(),
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            static_dir: PathBuf::from("public"),
        }
    }
}

pub fn default_models() -> Vec<String> {
    DEFAULT_MODELS.iter().map(|m| m.to_string()).collect()
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a config from any variable source. Unset and empty values
    /// both fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = Config {
            api_key: Credential::new(lookup("GOOGLE_API_KEY")),
            ..Config::default()
        };

        if let Some(port) = get("PORT") {
            config.port = port.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "PORT",
                value: port.clone(),
            })?;
        }

        if let Some(base) = get("GEMINI_API_BASE") {
            config.api_base = base.trim().trim_end_matches('/').to_string();
        }

        if let Some(models) = get("GEMINI_MODELS") {
            let parsed: Vec<String> = models
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect();
            if !parsed.is_empty() {
                config.models = parsed;
            }
        }

        if let Some(secs) = get("UPSTREAM_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .ok()
                .filter(|&s| s > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    var: "UPSTREAM_TIMEOUT_SECS",
                    value: secs.clone(),
                })?;
            config.upstream_timeout = Duration::from_secs(secs);
        }

        if let Some(dir) = get("STATIC_DIR") {
            config.static_dir = PathBuf::from(dir);
        }

        Ok(config)
    }
}
