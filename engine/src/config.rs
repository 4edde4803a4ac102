//! Engine configuration and JSON config file loading
//!
//! The config file shape is
//! `{ "patterns": { "<name>": { … } }, "surveillance": { … } }`.
//! Unknown keys are ignored everywhere; a missing section leaves the
//! defaults in place.

use crate::detector::PatternConfig;
use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Sizing and timing knobs fixed at engine construction
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Worker thread count
    pub num_threads: usize,
    /// Ingress queue capacity
    pub queue_size: usize,
    /// Trade slot pool capacity
    pub pool_size: usize,
    /// Alert queue capacity
    pub alert_queue_size: usize,
    /// Bounded wait before an alert is dropped on backpressure
    pub alert_enqueue_timeout: Duration,
    /// Default context retention horizon
    pub lookback_window: Duration,
    /// Cap on retained trades across all context windows
    pub context_max_trades: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let pool_size = 1_000_000;
        Self {
            num_threads: std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(4),
            queue_size: 1_000_000,
            pool_size,
            alert_queue_size: 65_536,
            alert_enqueue_timeout: Duration::from_millis(10),
            lookback_window: Duration::from_secs(300),
            context_max_trades: pool_size,
        }
    }
}

/// `surveillance` section of the config file; every key optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SurveillanceSection {
    num_threads: Option<usize>,
    queue_size: Option<usize>,
    pool_size: Option<usize>,
    alert_queue_size: Option<usize>,
    alert_timeout_ms: Option<u64>,
    lookback_window_secs: Option<u64>,
    context_max_trades: Option<usize>,
}

impl EngineConfig {
    /// Defaults overlaid with the `surveillance` section of a JSON config
    /// file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;

        let mut config = Self::default();
        if let Some(section) = value.get("surveillance") {
            let section: SurveillanceSection = serde_json::from_value(section.clone())
                .context("parsing surveillance section")?;
            if let Some(v) = section.num_threads {
                config.num_threads = v.max(1);
            }
            if let Some(v) = section.queue_size {
                config.queue_size = v;
            }
            if let Some(v) = section.pool_size {
                config.pool_size = v;
                config.context_max_trades = v;
            }
            if let Some(v) = section.alert_queue_size {
                config.alert_queue_size = v;
            }
            if let Some(v) = section.alert_timeout_ms {
                config.alert_enqueue_timeout = Duration::from_millis(v);
            }
            if let Some(v) = section.lookback_window_secs {
                config.lookback_window = Duration::from_secs(v);
            }
            if let Some(v) = section.context_max_trades {
                config.context_max_trades = v;
            }
        }
        Ok(config)
    }
}

/// Extract the `patterns.<name>` parameter bags from a JSON config file
pub(crate) fn load_pattern_configs(
    path: impl AsRef<Path>,
) -> Result<FxHashMap<String, PatternConfig>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("parsing config file {}", path.display()))?;

    let mut configs = FxHashMap::default();
    match value.get("patterns").and_then(serde_json::Value::as_object) {
        Some(patterns) => {
            for (name, params) in patterns {
                configs.insert(name.clone(), PatternConfig::new(params.clone()));
            }
        }
        None => debug!(path = %path.display(), "config has no patterns section"),
    }
    Ok(configs)
}
