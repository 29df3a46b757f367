//! Configuration loading via Figment.
//!
//! Settings are loaded from a TOML file merged with environment variables
//! prefixed `WIRESCAN_` (e.g. `WIRESCAN_APPLICATION_LOG_LEVEL=debug`).
//! Everything has a default, so an absent file yields a usable
//! configuration.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/wirescan.toml";

/// Configuration loading or validation failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File or environment extraction failed.
    #[error(transparent)]
    Figment(#[from] Box<figment::Error>),

    /// Values parsed but are semantically invalid.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Application-level settings.
    #[serde(default)]
    pub application: ApplicationSettings,
    /// Scan coordinator settings.
    #[serde(default)]
    pub scan: ScanSettings,
}

/// Application-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSettings {
    /// Application name used in logs.
    #[serde(default = "default_app_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
        }
    }
}

/// Scan coordinator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Upper bound on one device command dispatch (humantime format in
    /// TOML, e.g. `"5s"`).
    #[serde(with = "humantime_serde", default = "default_command_timeout")]
    pub command_timeout: Duration,
    /// Samples per harp when the caller does not specify a count.
    #[serde(default = "default_harp_sample_count")]
    pub harp_sample_count: u32,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            command_timeout: default_command_timeout(),
            harp_sample_count: default_harp_sample_count(),
        }
    }
}

fn default_app_name() -> String {
    "wirescan-daq".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_harp_sample_count() -> u32 {
    16
}

impl Settings {
    /// Load from [`DEFAULT_CONFIG_PATH`] merged with `WIRESCAN_`
    /// environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from a specific file merged with `WIRESCAN_` environment
    /// variables.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings: Settings = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("WIRESCAN_").split("_"))
            .extract()
            .map_err(Box::new)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings after loading.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "log_level '{}' must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }
        if self.scan.command_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "scan.command_timeout must be nonzero".to_string(),
            ));
        }
        if self.scan.harp_sample_count == 0 {
            return Err(ConfigError::Invalid(
                "scan.harp_sample_count must be nonzero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.scan.command_timeout, Duration::from_secs(5));
        assert_eq!(settings.scan.harp_sample_count, 16);
        assert_eq!(settings.application.log_level, "info");
    }

    #[test]
    fn loads_from_toml_file() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(
            file,
            r#"
[application]
log_level = "debug"

[scan]
command_timeout = "250ms"
harp_sample_count = 4
"#
        )?;

        let settings = Settings::load_from(file.path())?;
        assert_eq!(settings.application.log_level, "debug");
        assert_eq!(settings.scan.command_timeout, Duration::from_millis(250));
        assert_eq!(settings.scan.harp_sample_count, 4);
        // Unspecified fields fall back to defaults.
        assert_eq!(settings.application.name, "wirescan-daq");
        Ok(())
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = Settings::load_from("does/not/exist.toml").unwrap();
        assert_eq!(settings.scan.harp_sample_count, 16);
    }

    #[test]
    fn rejects_invalid_log_level() {
        let settings = Settings {
            application: ApplicationSettings {
                log_level: "loud".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_zero_sample_count() {
        let settings = Settings {
            scan: ScanSettings {
                harp_sample_count: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }
}
