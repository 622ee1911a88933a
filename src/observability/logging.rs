//! Structured logging configuration.

use crate::Error;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directive.
pub const LOG_FILTER_ENV: &str = "KGRAPH_LOG";

/// Environment variable selecting the log format.
pub const LOG_FORMAT_ENV: &str = "KGRAPH_LOG_FORMAT";

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(Error::InvalidInput(format!("unknown log format: {other}"))),
        }
    }
}

/// Logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Event filter.
    pub filter: EnvFilter,
    /// Output format.
    pub format: LogFormat,
    /// Append to this file instead of writing to stderr.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Builds a config whose filter comes from `KGRAPH_LOG`, then `RUST_LOG`,
    /// then `info` (or `debug` when `verbose`).
    ///
    /// `KGRAPH_LOG_FORMAT` overrides `format` when it holds a valid value.
    #[must_use]
    pub fn from_env(verbose: bool, format: LogFormat, file: Option<PathBuf>) -> Self {
        let directive = std::env::var(LOG_FILTER_ENV)
            .or_else(|_| std::env::var("RUST_LOG"))
            .ok();
        let format = std::env::var(LOG_FORMAT_ENV)
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(format);

        Self {
            filter: build_filter(directive.as_deref(), verbose),
            format,
            file,
        }
    }
}

/// Parses `directive`, falling back to the verbosity default if it is absent
/// or invalid.
#[must_use]
pub fn build_filter(directive: Option<&str>, verbose: bool) -> EnvFilter {
    let default = if verbose { "debug" } else { "info" };
    directive
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(default))
}
