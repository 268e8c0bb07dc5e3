//! Tracing subscriber setup for the binaries

use tracing_subscriber::EnvFilter;

use crate::config::{LogConfig, LogFormat};

/// Build the filter: `RUST_LOG` if set, else the configured level
pub fn env_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(config: &LogConfig) {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(config));
    let result = match config.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    if result.is_ok() {
        tracing::debug!("Logging initialised ({:?}, {})", config.format, config.level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_falls_back() {
        let config = LogConfig {
            level: "not a [valid filter".to_string(),
            format: LogFormat::Pretty,
        };
        // Must not panic whatever RUST_LOG holds
        let _ = env_filter(&config);
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init(&LogConfig::default());
        init(&LogConfig {
            format: LogFormat::Json,
            ..LogConfig::default()
        });
    }
}
