use std::str::FromStr;
use std::time::Duration;

use vmodel_gemini::api::{DEFAULT_API_URL, DEFAULT_MODEL};
use vmodel_gemini::GeminiConfig;

/// Server configuration loaded from environment variables.
///
/// Everything except the Gemini API key has a default suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Seconds a session error stays visible (default: `5`).
    pub error_dismiss_secs: u64,
    /// Largest accepted request body, uploads included (default: 20 MiB).
    pub max_upload_bytes: usize,
    /// Image backend connection settings.
    pub gemini: GeminiConfig,
}

/// A missing or malformed configuration value.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} must be a valid {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                                            |
    /// |------------------------|----------------------------------------------------|
    /// | `HOST`                 | `0.0.0.0`                                          |
    /// | `PORT`                 | `3000`                                             |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`                            |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                                               |
    /// | `ERROR_DISMISS_SECS`   | `5`                                                |
    /// | `MAX_UPLOAD_BYTES`     | `20971520`                                         |
    /// | `GEMINI_API_KEY`       | required                                           |
    /// | `GEMINI_API_URL`       | `https://generativelanguage.googleapis.com/v1beta` |
    /// | `GEMINI_MODEL`         | `gemini-2.5-flash-image-preview`                   |
    /// | `GEMINI_TIMEOUT_SECS`  | `120`                                              |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.into());

        let host = var("HOST", "0.0.0.0");
        let port = parse(&lookup, "PORT", 3000u16, "u16")?;

        let cors_origins: Vec<String> = var("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = parse(&lookup, "REQUEST_TIMEOUT_SECS", 30u64, "u64")?;
        let error_dismiss_secs = parse(&lookup, "ERROR_DISMISS_SECS", 5u64, "u64")?;
        let max_upload_bytes = parse(&lookup, "MAX_UPLOAD_BYTES", 20 * 1024 * 1024usize, "usize")?;

        let api_key = lookup("GEMINI_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::Missing("GEMINI_API_KEY"))?;
        let gemini_timeout_secs = parse(&lookup, "GEMINI_TIMEOUT_SECS", 120u64, "u64")?;

        let gemini = GeminiConfig {
            api_url: var("GEMINI_API_URL", DEFAULT_API_URL),
            api_key,
            model: var("GEMINI_MODEL", DEFAULT_MODEL),
            timeout: Duration::from_secs(gemini_timeout_secs),
        };

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            error_dismiss_secs,
            max_upload_bytes,
            gemini,
        })
    }

    pub fn error_dismiss_after(&self) -> Duration {
        Duration::from_secs(self.error_dismiss_secs)
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            expected,
            value,
        }),
    }
}
