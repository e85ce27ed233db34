//! Configuration types for RelayQ.
//!
//! A dispatcher needs very little configuration: a name used in logs and
//! thread names, how often a graceful join polls the queue, and how the
//! process-wide logger should be set up.

use crate::error::{DispatchError, DispatchResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration for a [`QueuedDispatcher`](crate::QueuedDispatcher).
///
/// # Examples
///
/// ```rust
/// use relayq::config::DispatcherConfig;
///
/// let config = DispatcherConfig::default()
///     .with_name("audit-log")
///     .with_drain_poll_interval(5);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Name used for the worker thread and in log fields
    pub name: String,

    /// Poll interval used by graceful joins that don't pass their own (in milliseconds)
    pub drain_poll_interval_ms: u64,

    /// Stack size for the dispatcher thread (None = platform default)
    pub thread_stack_size: Option<usize>,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            name: "relayq".to_string(),
            drain_poll_interval_ms: 1,
            thread_stack_size: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl DispatcherConfig {
    /// Create a new configuration optimized for development.
    pub fn development() -> Self {
        Self {
            logging: LoggingConfig {
                level: LogLevel::Debug,
                include_targets: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Create a configuration for testing.
    pub fn testing() -> Self {
        Self {
            name: "relayq-test".to_string(),
            drain_poll_interval_ms: 1,
            thread_stack_size: None,
            logging: LoggingConfig {
                level: LogLevel::Debug,
                colored: false,
                include_timestamps: false,
                include_targets: true,
                ..Default::default()
            },
        }
    }

    /// Load a configuration from a JSON document. Missing fields take their
    /// default values.
    pub fn from_json(json: &str) -> DispatchResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config
            .validate()
            .map_err(|errors| DispatchError::config(errors.join("; ")))?;
        Ok(config)
    }

    /// Set the dispatcher name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the drain poll interval.
    pub fn with_drain_poll_interval(mut self, interval_ms: u64) -> Self {
        self.drain_poll_interval_ms = interval_ms;
        self
    }

    /// Set the dispatcher thread stack size.
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = Some(bytes);
        self
    }

    /// Set the logging configuration.
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    /// The drain poll interval as a [`Duration`].
    pub fn drain_poll_interval(&self) -> Duration {
        self.drain_poll_interval_ms.millis()
    }

    /// Validate the configuration and return any errors.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("Dispatcher name must not be empty".to_string());
        }

        if self.name.contains('\0') {
            errors.push("Dispatcher name must not contain NUL bytes".to_string());
        }

        if self.drain_poll_interval_ms == 0 {
            errors.push("Drain poll interval must be greater than 0".to_string());
        }

        if let Some(size) = self.thread_stack_size {
            if size < 16 * 1024 {
                errors.push("Thread stack size should be at least 16 KiB".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter
    pub level: LogLevel,

    /// Enable structured JSON logging
    pub json_format: bool,

    /// Enable colored output (ignored if json_format is true)
    pub colored: bool,

    /// Include timestamps in logs
    pub include_timestamps: bool,

    /// Include target module in logs
    pub include_targets: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            json_format: false,
            colored: true,
            include_timestamps: true,
            include_targets: false,
        }
    }
}

impl LoggingConfig {
    /// Install a global `tracing` subscriber built from this configuration.
    ///
    /// Fails if a global subscriber was already set.
    pub fn init(&self) -> DispatchResult<()> {
        let level: tracing::Level = self.level.into();
        let builder = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(self.include_targets);

        let result = match (self.json_format, self.include_timestamps) {
            (true, true) => builder.json().try_init(),
            (true, false) => builder.json().without_time().try_init(),
            (false, true) => builder.with_ansi(self.colored).try_init(),
            (false, false) => builder.with_ansi(self.colored).without_time().try_init(),
        };

        result.map_err(|e| DispatchError::config(format!("Failed to install logger: {e}")))
    }
}

/// Log level enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// Trace level
    Trace,
    /// Debug level
    Debug,
    /// Info level
    Info,
    /// Warn level
    Warn,
    /// Error level
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Helper trait for converting durations in configuration.
pub trait DurationExt {
    /// Convert milliseconds to Duration
    fn millis(self) -> Duration;
}

impl DurationExt for u64 {
    fn millis(self) -> Duration {
        Duration::from_millis(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DispatcherConfig::default();
        assert_eq!(config.name, "relayq");
        assert_eq!(config.drain_poll_interval(), Duration::from_millis(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        let dev = DispatcherConfig::development();
        assert_eq!(dev.logging.level, LogLevel::Debug);
        assert!(dev.validate().is_ok());

        let testing = DispatcherConfig::testing();
        assert_eq!(testing.name, "relayq-test");
        assert!(!testing.logging.colored);
        assert!(testing.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = DispatcherConfig::default();

        config.drain_poll_interval_ms = 0;
        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("poll interval")));

        config.drain_poll_interval_ms = 1;
        config.name = "  ".to_string();
        assert!(config.validate().is_err());

        config.name = "ok".to_string();
        config.thread_stack_size = Some(1024);
        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("stack size")));
    }

    #[test]
    fn test_builders() {
        let config = DispatcherConfig::default()
            .with_name("ingest")
            .with_drain_poll_interval(10)
            .with_stack_size(256 * 1024);

        assert_eq!(config.name, "ingest");
        assert_eq!(config.drain_poll_interval_ms, 10);
        assert_eq!(config.thread_stack_size, Some(256 * 1024));
    }

    #[test]
    fn test_from_json() {
        let config =
            DispatcherConfig::from_json(r#"{"name":"jobs","drain_poll_interval_ms":20}"#).unwrap();
        assert_eq!(config.name, "jobs");
        assert_eq!(config.drain_poll_interval_ms, 20);
        assert_eq!(config.logging.level, LogLevel::Info);

        let invalid = DispatcherConfig::from_json(r#"{"drain_poll_interval_ms":0}"#);
        assert!(matches!(invalid, Err(DispatchError::ConfigError { .. })));

        let malformed = DispatcherConfig::from_json("{not json");
        assert!(matches!(
            malformed,
            Err(DispatchError::SerializationError(_))
        ));
    }

    #[test]
    fn test_duration_ext() {
        assert_eq!(1500u64.millis(), Duration::from_millis(1500));
    }
}
