//! Structured logging bootstrap.
//!
//! Trimmed to what the spec's scheduler actually emits diagnostics through:
//! a `tracing`/`tracing-subscriber` layer, no distributed tracing or metrics
//! export. See [`crate::dag::scheduler::LogSink`] for the per-scheduler
//! logging hook this module backs by default.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::TelemetryConfig;

/// Initialize the global `tracing` subscriber. Call once, near process start.
///
/// `RUST_LOG` (or `config.log_level` as a fallback) controls verbosity.
/// `config.json` switches between a pretty, human-oriented formatter and
/// newline-delimited JSON suited to log aggregation.
pub fn init(config: &TelemetryConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if config.json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()?;
    } else {
        registry.with(tracing_subscriber::fmt::layer().pretty()).try_init()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_json_off_info_level() {
        let cfg = TelemetryConfig::default();
        assert!(!cfg.json);
        assert_eq!(cfg.log_level, "info");
    }
}
