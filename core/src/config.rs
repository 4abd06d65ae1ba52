//! Configuration loading.
//!
//! The spec is explicit that the `Scheduler` itself takes no environment
//! variables — its configuration is the in-process [`crate::dag::scheduler::SchedulerConfig`]
//! struct. This module is for the *surrounding process* (library consumer,
//! CLI, or test harness) that wants to source `max_concurrent`, `quit_on_failure`
//! and logging verbosity from the environment or a TOML file rather than
//! hand-writing them, mirroring the teacher's `Config::load()` pattern.

use serde::Deserialize;

/// Settings used to build a [`crate::dag::scheduler::SchedulerConfig`].
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSettings {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_quit_on_failure")]
    pub quit_on_failure: bool,

    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: i64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            name: default_name(),
            quit_on_failure: default_quit_on_failure(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

/// Settings for [`crate::telemetry::init`].
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
        }
    }
}

/// Top-level settings aggregate, loaded by [`Settings::load`]/[`Settings::from_file`].
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_name() -> String {
    "scheduler".to_string()
}
fn default_quit_on_failure() -> bool {
    true
}
fn default_max_concurrent() -> i64 {
    0
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    /// Load from environment variables only (prefix `GRAPHCTL`, `__` separator,
    /// e.g. `GRAPHCTL__SCHEDULER__MAX_CONCURRENT=4`).
    pub fn load() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix("GRAPHCTL").separator("__"))
            .build()?;
        Ok(cfg.try_deserialize().unwrap_or_default())
    }

    /// Load from a TOML file, overridable by the same environment variables as [`Settings::load`].
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("GRAPHCTL").separator("__"))
            .build()?;
        Ok(cfg.try_deserialize()?)
    }
}
