//! ═══════════════════════════════════════════════════════════════════════════════
//! LOGGING — tracing subscriber setup for the binary
//! ═══════════════════════════════════════════════════════════════════════════════
//! The library only emits `tracing` events. Installing a subscriber is the
//! caller's decision; the CLI does it through `init`.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::io;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::{LogConfig, LogFormat};
use crate::error::{CcmError, CcmResult};

/// Parse a level name (case-insensitive)
pub fn parse_level(level: &str) -> CcmResult<Level> {
    match level.to_ascii_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(CcmError::Config(format!("invalid log level '{}'", other))),
    }
}

/// Install a global subscriber writing to stderr, so stdout stays free for
/// results. `RUST_LOG` overrides the configured level.
pub fn init(config: &LogConfig) -> CcmResult<()> {
    let default_level = parse_level(&config.level)?;
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .with_filter(filter)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_writer(io::stderr)
            .with_target(true)
            .with_filter(filter)
            .boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(io::stderr)
            .with_target(false)
            .with_filter(filter)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| CcmError::Config(format!("failed to install subscriber: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_level("WARN").unwrap(), Level::WARN);
        assert!(parse_level("verbose").is_err());
    }
}
