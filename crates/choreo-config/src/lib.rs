//! Choreo configuration system
//!
//! This crate provides centralized configuration for the animation engine,
//! loading engine defaults from `choreo.toml` with environment variable
//! overrides on top.

use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the current directory.
pub const CONFIG_FILE: &str = "choreo.toml";

/// Errors raised while loading configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`ChoreoConfig`].
    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Main configuration structure for the engine
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ChoreoConfig {
    /// Timing fallbacks used when no transition level supplies a value
    pub timing: TimingConfig,
    /// Gesture handling settings
    pub gestures: GestureConfig,
    /// Viewport trigger settings
    pub viewport: ViewportConfig,
    /// Diagnostics output settings
    pub logging: LoggingConfig,
}

/// Engine-wide timing defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    /// Duration in seconds when nothing else specifies one
    pub default_duration_secs: f64,
    /// Named easing used when nothing else specifies one
    pub default_easing: String,
    /// Tolerance used when deciding whether keyframe `times` are absolute seconds
    pub times_epsilon: f64,
}

/// Gesture handling configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GestureConfig {
    /// Same-type gestures arriving within this window are dropped
    pub debounce_ms: f64,
}

/// Viewport trigger configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewportConfig {
    /// Wait between a no-transition reset and the replayed animation
    pub settle_delay_ms: f64,
    /// Root margin used when a node gives no `offset`
    pub default_margin: String,
    /// Visible fraction required to count as "in view"
    pub default_amount: f64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive (e.g. `choreo_motion=debug`)
    pub filter: Option<String>,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            default_duration_secs: 0.3,
            default_easing: "ease-in-out".to_string(),
            times_epsilon: 0.001,
        }
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self { debounce_ms: 100.0 }
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 50.0,
            default_margin: "0px".to_string(),
            default_amount: 0.1,
        }
    }
}

impl ChoreoConfig {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the choreo.toml configuration file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration from a TOML file, treating a missing file as defaults.
    pub fn load_optional<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        match Self::load_from_file(path) {
            Err(ConfigError::Read { source, .. }) if source.kind() == ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Load configuration from the default location (choreo.toml in the current directory)
    /// or return default configuration if the file doesn't exist or fails to parse.
    ///
    /// Unreadable or malformed files are reported with a warning.
    pub fn load_or_default() -> Self {
        Self::load_optional(CONFIG_FILE).unwrap_or_else(|error| {
            tracing::warn!(%error, "failed to load config, using defaults");
            Self::default()
        })
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file values.
    /// Unparseable numeric values are ignored.
    pub fn merge_with_env(&mut self) {
        if let Some(secs) = env_f64("CHOREO_DEFAULT_DURATION") {
            self.timing.default_duration_secs = secs;
        }
        if let Ok(easing) = std::env::var("CHOREO_DEFAULT_EASING") {
            self.timing.default_easing = easing;
        }

        if let Some(ms) = env_f64("CHOREO_GESTURE_DEBOUNCE_MS") {
            self.gestures.debounce_ms = ms;
        }

        if let Some(ms) = env_f64("CHOREO_VIEWPORT_SETTLE_MS") {
            self.viewport.settle_delay_ms = ms;
        }
        if let Ok(margin) = std::env::var("CHOREO_VIEWPORT_MARGIN") {
            self.viewport.default_margin = margin;
        }
        if let Some(amount) = env_f64("CHOREO_VIEWPORT_AMOUNT") {
            self.viewport.default_amount = amount.clamp(0.0, 1.0);
        }

        if let Ok(filter) = std::env::var("CHOREO_LOG") {
            self.logging.filter = Some(filter);
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// 1. Load from choreo.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }

    /// Like [`ChoreoConfig::load`], but hands a broken config file back to the caller.
    pub fn try_load() -> Result<Self, ConfigError> {
        let mut config = Self::load_optional(CONFIG_FILE)?;
        config.merge_with_env();
        Ok(config)
    }
}

fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key)
        .ok()
        .and_then(|val| val.trim().parse::<f64>().ok())
        .filter(|val| val.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ChoreoConfig::default();
        assert_eq!(config.timing.default_duration_secs, 0.3);
        assert_eq!(config.timing.default_easing, "ease-in-out");
        assert_eq!(config.gestures.debounce_ms, 100.0);
        assert_eq!(config.viewport.settle_delay_ms, 50.0);
        assert!(config.logging.filter.is_none());
    }

    #[test]
    fn test_toml_serialization() {
        let config = ChoreoConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: ChoreoConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let parsed: ChoreoConfig = toml::from_str(
            r#"
            [gestures]
            debounce_ms = 250.0
            "#,
        )
        .unwrap();
        assert_eq!(parsed.gestures.debounce_ms, 250.0);
        assert_eq!(parsed.viewport.default_amount, 0.1);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = ChoreoConfig::load_from_file("definitely/not/here/choreo.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn test_load_optional_missing_file_is_default() {
        let config = ChoreoConfig::load_optional("definitely/not/here/choreo.toml").unwrap();
        assert_eq!(config, ChoreoConfig::default());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let path = std::env::temp_dir().join(format!("choreo-malformed-{}.toml", std::process::id()));
        std::fs::write(&path, "[timing]\ndefault_duration_secs = \"slow\"\n").unwrap();

        let err = ChoreoConfig::load_optional(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("failed to parse config file"));
    }

    #[test]
    fn test_load_or_default() {
        // Should not panic even if choreo.toml doesn't exist
        let config = ChoreoConfig::load_or_default();
        assert!(config.timing.default_duration_secs > 0.0);
    }

    #[test]
    fn test_merge_with_env() {
        unsafe {
            std::env::set_var("CHOREO_GESTURE_DEBOUNCE_MS", "40");
            std::env::set_var("CHOREO_VIEWPORT_AMOUNT", "not-a-number");
            std::env::set_var("CHOREO_LOG", "choreo_motion=trace");
        }

        let mut config = ChoreoConfig::default();
        config.merge_with_env();

        assert_eq!(config.gestures.debounce_ms, 40.0);
        assert_eq!(config.viewport.default_amount, 0.1);
        assert_eq!(config.logging.filter.as_deref(), Some("choreo_motion=trace"));

        unsafe {
            std::env::remove_var("CHOREO_GESTURE_DEBOUNCE_MS");
            std::env::remove_var("CHOREO_VIEWPORT_AMOUNT");
            std::env::remove_var("CHOREO_LOG");
        }
    }
}
