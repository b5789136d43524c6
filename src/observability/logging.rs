//! Structured logging configuration.

use std::path::PathBuf;

/// Default filter directive when none is configured.
pub const DEFAULT_FILTER: &str = "info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `vecbridge=debug`.
    pub filter: String,
    /// Output format.
    pub format: LogFormat,
    /// Optional file to append logs to instead of stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::default(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Builds logging configuration from environment variables.
    ///
    /// | Variable | Effect |
    /// |----------|--------|
    /// | `VECBRIDGE_LOG` | Filter directive (falls back to `RUST_LOG`) |
    /// | `VECBRIDGE_LOG_FORMAT` | `pretty` or `json` |
    /// | `VECBRIDGE_LOG_FILE` | Append to this file |
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(filter) = non_empty(lookup("VECBRIDGE_LOG"))
            .or_else(|| non_empty(lookup("RUST_LOG")))
        {
            config.filter = filter;
        }
        if let Some(format) = lookup("VECBRIDGE_LOG_FORMAT") {
            match LogFormat::parse(&format) {
                Some(parsed) => config.format = parsed,
                None => tracing::warn!(value = %format, "unknown log format, using pretty"),
            }
        }
        if let Some(file) = non_empty(lookup("VECBRIDGE_LOG_FILE")) {
            config.file = Some(PathBuf::from(file));
        }

        config
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LoggingConfig::from_lookup(lookup(&[]));
        assert_eq!(config, LoggingConfig::default());
        assert_eq!(config.filter, "info");
    }

    #[test]
    fn test_vecbridge_log_takes_precedence() {
        let config = LoggingConfig::from_lookup(lookup(&[
            ("RUST_LOG", "warn"),
            ("VECBRIDGE_LOG", "vecbridge=trace"),
        ]));
        assert_eq!(config.filter, "vecbridge=trace");

        let config = LoggingConfig::from_lookup(lookup(&[("RUST_LOG", "warn")]));
        assert_eq!(config.filter, "warn");
    }

    #[test]
    fn test_format_and_file() {
        let config = LoggingConfig::from_lookup(lookup(&[
            ("VECBRIDGE_LOG_FORMAT", "JSON"),
            ("VECBRIDGE_LOG_FILE", "/tmp/vecbridge.log"),
        ]));
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.file, Some(PathBuf::from("/tmp/vecbridge.log")));

        let config = LoggingConfig::from_lookup(lookup(&[("VECBRIDGE_LOG_FORMAT", "xml")]));
        assert_eq!(config.format, LogFormat::Pretty);
    }
}
