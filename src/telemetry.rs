//! Structured logging setup.
//!
//! Thin wrapper over `tracing-subscriber` providing environment-filtered,
//! format-selectable initialization. Initialization is idempotent so
//! library consumers and tests can call it freely.

use crate::config::Settings;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Output format for log events.
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Pretty-printed with colors, for interactive use.
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON for log aggregation.
    Json,
}

/// Telemetry initialization options.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Default log level when `RUST_LOG` is unset.
    pub level: Level,
    /// Output format.
    pub format: OutputFormat,
    /// Include span open/close events.
    pub with_span_events: bool,
    /// Enable ANSI colors.
    pub with_ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: OutputFormat::Compact,
            with_span_events: false,
            with_ansi: true,
        }
    }
}

impl TelemetryConfig {
    /// Config at the given level with default formatting.
    pub fn new(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Select the output format.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Enable or disable span open/close events.
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.with_span_events = enabled;
        self
    }

    /// Enable or disable ANSI colors.
    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.with_ansi = enabled;
        self
    }
}

/// Initialize telemetry from loaded settings.
pub fn init_from_settings(settings: &Settings) -> Result<(), String> {
    let level = parse_log_level(&settings.application.log_level)?;
    init(TelemetryConfig::new(level))
}

/// Initialize the global tracing subscriber.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init(config: TelemetryConfig) -> Result<(), String> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string().to_lowercase()));

    let span_events = if config.with_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let result = match config.format {
        OutputFormat::Pretty => tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .pretty()
                    .with_span_events(span_events)
                    .with_ansi(config.with_ansi)
                    .with_filter(env_filter),
            )
            .try_init(),
        OutputFormat::Compact => tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .compact()
                    .with_span_events(span_events)
                    .with_ansi(config.with_ansi)
                    .with_filter(env_filter),
            )
            .try_init(),
        OutputFormat::Json => tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .json()
                    .with_span_events(span_events)
                    .with_filter(env_filter),
            )
            .try_init(),
    };

    match result {
        Ok(()) => Ok(()),
        // Another subscriber already installed: expected in tests and when
        // the embedding application initialized logging itself.
        Err(e) if e.to_string().contains("already been set") => Ok(()),
        Err(e) => Err(format!("failed to initialize telemetry: {e}")),
    }
}

fn parse_log_level(level: &str) -> Result<Level, String> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(format!(
            "invalid log level '{other}'; expected trace, debug, info, warn, or error"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_log_levels_case_insensitively() {
        assert!(matches!(parse_log_level("trace"), Ok(Level::TRACE)));
        assert!(matches!(parse_log_level("INFO"), Ok(Level::INFO)));
        assert!(matches!(parse_log_level("Warn"), Ok(Level::WARN)));
        assert!(parse_log_level("loud").is_err());
    }

    #[test]
    fn config_builder() {
        let config = TelemetryConfig::new(Level::DEBUG)
            .with_format(OutputFormat::Json)
            .with_span_events(true)
            .with_ansi(false);
        assert!(matches!(config.level, Level::DEBUG));
        assert!(matches!(config.format, OutputFormat::Json));
        assert!(config.with_span_events);
        assert!(!config.with_ansi);
    }

    #[test]
    fn init_is_idempotent() {
        init(TelemetryConfig::default()).unwrap();
        init(TelemetryConfig::default()).unwrap();
    }
}
