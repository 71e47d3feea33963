use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;

/// Environment-driven defaults for `MatchingEngine::configure`, following the same
/// `config` crate + typed-prefix + hardcoded-fallback convention every binary in this
/// codebase uses for its `AppConfig`. Scaled down to what a library needs: no port,
/// no database URL, no secrets — those belong to the transport layer a host binary
/// wraps this engine in.
#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default)]
    pub interests: Vec<String>,
}

fn default_cooldown_secs() -> u64 {
    0
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            interests: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Reads `MATCHING_ENGINE__*` environment variables, falling back to the
    /// hardcoded defaults above on any deserialization failure.
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("MATCHING_ENGINE").separator("__"))
            .build()?;
        Ok(config.try_deserialize().unwrap_or_default())
    }

    pub(crate) fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub(crate) fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub(crate) fn interests_universe(&self) -> HashSet<String> {
        self.interests.iter().cloned().collect()
    }
}
