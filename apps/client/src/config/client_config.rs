use std::env;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_SESSION_FILE: &str = ".planner/session.json";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Client configuration, read from `PLANNER_*` environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend root; request paths are appended to it.
    pub base_url: Url,
    /// Where the session document is persisted.
    pub session_file: PathBuf,
    /// Whole-request timeout enforced by the transport.
    pub timeout: Duration,
    pub log_format: LogFormat,
}

impl Default for ClientConfig {
    fn default() -> Self {
        // The constant is a vetted literal
        #[allow(clippy::unwrap_used)]
        let base_url = Url::parse(DEFAULT_BASE_URL).unwrap();
        Self {
            base_url,
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            log_format: LogFormat::Text,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or blank.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = var("PLANNER_API_BASE_URL") {
            config.base_url = parse_base_url(&raw)?;
        }
        if let Some(raw) = var("PLANNER_SESSION_FILE") {
            config.session_file = PathBuf::from(raw);
        }
        if let Some(raw) = var("PLANNER_HTTP_TIMEOUT_SECS") {
            let secs = raw
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| {
                    ConfigError::invalid(
                        "PLANNER_HTTP_TIMEOUT_SECS",
                        format!("expected a positive integer, got {raw:?}"),
                    )
                })?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = var("PLANNER_LOG_FORMAT") {
            config.log_format = parse_log_format(&raw)?;
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.base_url = parse_base_url(raw)?;
        Ok(self)
    }

    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = path.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::invalid("PLANNER_API_BASE_URL", format!("{raw:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::invalid(
            "PLANNER_API_BASE_URL",
            format!("unsupported scheme {other:?}"),
        )),
    }
}

fn parse_log_format(raw: &str) -> Result<LogFormat, ConfigError> {
    match raw.to_lowercase().as_str() {
        "text" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        other => Err(ConfigError::invalid(
            "PLANNER_LOG_FORMAT",
            format!("expected text or json, got {other:?}"),
        )),
    }
}
