//! # Logging Infrastructure
//!
//! Tracing setup plus redaction helpers for customer data.
//!
//! Lead records carry names, addresses, phone numbers and email addresses.
//! None of those may appear verbatim in log output, so modules that log
//! record content go through [`redact_contact`] / [`redact_if_sensitive`]
//! instead of interpolating fields directly.

use crate::error::{Error, Result};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format with colors
    Pretty,
    /// Structured JSON format for machine parsing
    Json,
    /// Compact format for production
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Json;
    }
}

/// Minimum log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Output format
    pub format: LogFormat,
    /// Minimum log level for workspace crates
    pub level: LogLevel,
    /// Custom filter string (e.g., "core_sync=trace,sqlx=warn")
    pub filter: Option<String>,
    /// Display target module in logs
    pub display_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            display_target: true,
        }
    }
}

impl LoggingConfig {
    /// Set log format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set minimum log level
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Set custom filter string
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Enable or disable target display
    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }
}

/// Initialize the logging system.
///
/// Call once during application startup; subsequent calls return an error.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;

    let result = match config.format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty().with_target(config.display_target))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(config.display_target))
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_target(config.display_target))
            .try_init(),
    };

    result.map_err(|e| Error::Logging(e.to_string()))
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let base_level = config.level.as_str();

    let filter_string = if let Some(custom) = &config.filter {
        custom.clone()
    } else {
        // Workspace crates at the requested level, noisy dependencies at warn.
        format!(
            "core_runtime={lvl},core_records={lvl},core_auth={lvl},core_sync={lvl},\
             core_service={lvl},provider_rest={lvl},\
             h2=warn,hyper=warn,reqwest=warn,sqlx=warn",
            lvl = base_level
        )
    };

    filter_string
        .parse::<EnvFilter>()
        .map_err(|e| Error::Logging(format!("invalid filter '{}': {}", filter_string, e)))
}

/// Redact sensitive field values before logging.
///
/// ```ignore
/// use tracing::info;
/// use core_runtime::logging::redact_if_sensitive;
///
/// info!(email = %redact_if_sensitive("email", email), "Imported record");
/// ```
pub fn redact_if_sensitive(field_name: &str, value: &str) -> String {
    const SENSITIVE_FIELDS: &[&str] = &[
        "token",
        "password",
        "secret",
        "api_key",
        "authorization",
        "bearer",
        "phone",
        "email",
        "address",
    ];

    let field_lower = field_name.to_lowercase();
    if SENSITIVE_FIELDS.iter().any(|&f| field_lower.contains(f)) {
        "[REDACTED]".to_string()
    } else if value.contains('@') && value.contains('.') {
        // Likely an email even in a non-sensitive field
        match value.find('@') {
            Some(at_pos) => format!("{}***@[REDACTED]", &value[..1.min(at_pos)]),
            None => value.to_string(),
        }
    } else {
        value.to_string()
    }
}

/// Shorten a customer name/address to an initial for log output.
///
/// `"Jane Doe"` logs as `"J***"`; blank input logs as `"(blank)"`.
pub fn redact_contact(value: &str) -> String {
    let trimmed = value.trim();
    match trimmed.chars().next() {
        Some(first) => format!("{}***", first),
        None => "(blank)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder_sets_fields() {
        let config = LoggingConfig::default()
            .with_format(LogFormat::Json)
            .with_level(LogLevel::Debug)
            .with_filter("core_sync=trace")
            .with_target(false);

        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.filter.as_deref(), Some("core_sync=trace"));
        assert!(!config.display_target);
    }

    #[test]
    fn sensitive_fields_are_redacted() {
        assert_eq!(redact_if_sensitive("phone", "555-0100"), "[REDACTED]");
        assert_eq!(redact_if_sensitive("api_key", "abc"), "[REDACTED]");
        assert_eq!(redact_if_sensitive("status", "interested"), "interested");
    }

    #[test]
    fn email_like_values_are_redacted_even_in_plain_fields() {
        let redacted = redact_if_sensitive("notes", "jane@example.com");
        assert!(redacted.starts_with("j***@"));
        assert!(!redacted.contains("example.com"));
    }

    #[test]
    fn contact_redaction_keeps_only_initial() {
        assert_eq!(redact_contact("Jane Doe"), "J***");
        assert_eq!(redact_contact("  "), "(blank)");
    }
}
