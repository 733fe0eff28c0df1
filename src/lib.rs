//! Choreo: declarative element animation.
//!
//! Re-exports the configuration and motion crates and wires up diagnostics.

pub use choreo_config as config;
pub use choreo_motion as motion;

pub use choreo_config::{ChoreoConfig, ConfigError};
pub use choreo_motion::{HeadlessBackend, MotionBackend, MotionEngine, MotionEvent, NodeConfig};

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Install a `tracing` subscriber using the configured filter.
///
/// `RUST_LOG` wins over the configured filter. Does nothing if a global
/// subscriber is already set.
pub fn init_tracing(config: &ChoreoConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives = config.logging.filter.as_deref().unwrap_or(DEFAULT_FILTER);
        EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    });

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Load configuration (file plus environment), install tracing and build an
/// engine around `backend`.
///
/// A broken config file falls back to defaults with a warning.
pub fn engine_with_backend<B: MotionBackend>(backend: B) -> MotionEngine<B> {
    let (config, load_error) = config_or_defaults(ChoreoConfig::try_load());
    init_tracing(&config);
    if let Some(error) = load_error {
        tracing::warn!(%error, "failed to load config, using defaults");
    }
    MotionEngine::new(backend, config)
}

fn config_or_defaults(
    loaded: Result<ChoreoConfig, ConfigError>,
) -> (ChoreoConfig, Option<ConfigError>) {
    match loaded {
        Ok(config) => (config, None),
        Err(error) => {
            let mut config = ChoreoConfig::default();
            config.merge_with_env();
            (config, Some(error))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice_is_harmless() {
        let config = ChoreoConfig {
            logging: choreo_config::LoggingConfig {
                filter: Some("choreo_motion=debug".into()),
            },
            ..Default::default()
        };
        init_tracing(&config);
        init_tracing(&config);
    }

    #[test]
    fn test_broken_config_falls_back_and_reports() {
        let path = std::env::temp_dir().join(format!("choreo-facade-{}.toml", std::process::id()));
        std::fs::write(&path, "[gestures\n").unwrap();
        let loaded = ChoreoConfig::load_from_file(&path);
        std::fs::remove_file(&path).unwrap();

        let (config, error) = config_or_defaults(loaded);
        assert!(matches!(error, Some(ConfigError::Parse { .. })));
        assert_eq!(config.timing, ChoreoConfig::default().timing);
    }

    #[test]
    fn test_engine_with_headless_backend() {
        let backend = HeadlessBackend::new();
        let engine = engine_with_backend(backend);
        assert_eq!(engine.pending_timers(), 0);
    }
}
