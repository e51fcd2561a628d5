use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Number of passes `Engine::force_skip_all` makes before giving up on
/// chains of lists that keep spawning new blocking lists.
pub const DEFAULT_FORCE_SKIP_PASSES: usize = 20;

/// Upper bound on node steps a single cursor may take within one tick.
pub const DEFAULT_MAX_STEPS_PER_TICK: usize = 1000;

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub force_skip_passes: usize,
    pub max_steps_per_tick: usize,
    /// Only used by drivers that tick in real time (the CLI).
    pub tick_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            force_skip_passes: DEFAULT_FORCE_SKIP_PASSES,
            max_steps_per_tick: DEFAULT_MAX_STEPS_PER_TICK,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        }
    }
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read engine config from {}", path.display()))?;

        let config: EngineConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to deserialize engine config from {}", path.display()))?;

        Ok(config)
    }
}
