//! Tracing/logging initialization.
//!
//! Output is JSON by default so that log shippers can index span fields
//! (`user_id`, `account_id`, ...) directly. `RUST_LOG` overrides the filter.

use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset. sqlx logs every statement at `info`.
pub const DEFAULT_FILTER: &str = "info,sqlx=warn";

/// Variable selecting the output format (`json` or `pretty`).
pub const FORMAT_ENV: &str = "LEDGER_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    /// Human-readable output for local development.
    Pretty,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown log format `{0}` (expected `json` or `pretty`)")]
pub struct UnknownLogFormat(String);

impl FromStr for LogFormat {
    type Err = UnknownLogFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(UnknownLogFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    pub default_filter: String,
    pub format: LogFormat,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::Json,
        }
    }
}

impl TracingConfig {
    /// Read the format from `LEDGER_LOG_FORMAT`. An unreadable value falls
    /// back to JSON and is handed back so it can be logged once tracing is up.
    pub fn from_env() -> (Self, Option<UnknownLogFormat>) {
        Self::from_format_var(std::env::var(FORMAT_ENV).ok().as_deref())
    }

    fn from_format_var(raw: Option<&str>) -> (Self, Option<UnknownLogFormat>) {
        let mut config = Self::default();
        let mut rejected = None;
        if let Some(raw) = raw {
            match raw.parse() {
                Ok(format) => config.format = format,
                Err(err) => rejected = Some(err),
            }
        }
        (config, rejected)
    }
}

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(config: TracingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime);

    let _ = match config.format {
        LogFormat::Json => builder.json().with_target(false).try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_parse_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!(" pretty ".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn bad_format_falls_back_to_json() {
        let (config, rejected) = TracingConfig::from_format_var(Some("yaml"));
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(rejected, Some(UnknownLogFormat("yaml".into())));

        let (config, rejected) = TracingConfig::from_format_var(None);
        assert_eq!(config, TracingConfig::default());
        assert_eq!(rejected, None);
    }

    #[test]
    fn init_twice_is_harmless() {
        init(TracingConfig::default());
        init(TracingConfig::default());
    }
}
