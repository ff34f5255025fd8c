//! Game configuration, loaded from TOML.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// World generation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Side length of the square board.
    pub board_size: i32,
    pub gold_count: usize,
    pub spider_count: usize,
    /// Number of mountain chunk placement attempts.
    pub mountain_chunks: usize,
    /// Upper bound on tiles grown by a single chunk.
    pub max_chunk_size: usize,
    /// Width of the outer ring kept free of gold, spiders and mountains.
    pub border_margin: i32,
    /// Cap for every rejection-sampling loop.
    pub max_placement_attempts: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            board_size: 20,
            gold_count: 30,
            spider_count: 15,
            mountain_chunks: 6,
            max_chunk_size: 10,
            border_margin: 1,
            max_placement_attempts: 10_000,
        }
    }
}

impl WorldConfig {
    /// Number of tiles available to gold, spiders and mountains.
    pub fn interior_tiles(&self) -> usize {
        let side = (self.board_size - 2 * self.border_margin).max(0) as usize;
        side * side
    }
}

/// Timing rules: action cooldown, idle eviction and the sweep interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub action_cooldown_secs: u64,
    pub entity_timeout_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            action_cooldown_secs: 2,
            entity_timeout_secs: 3000,
            sweep_interval_secs: 180,
        }
    }
}

impl TimingConfig {
    pub fn action_cooldown(&self) -> Duration {
        Duration::from_secs(self.action_cooldown_secs)
    }

    pub fn entity_timeout(&self) -> Duration {
        Duration::from_secs(self.entity_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Complete game configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub world: WorldConfig,
    pub timing: TimingConfig,
    /// Fixed seed for reproducible games.
    pub seed: Option<u64>,
    /// Append-only JSON-lines audit file.
    pub audit_log: Option<PathBuf>,
    /// Credential the transport compares privileged requests against.
    pub admin_token: Option<String>,
}

impl GameConfig {
    /// Parse and validate a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Reject configurations that would make placement impossible.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let world = &self.world;
        if world.board_size <= 0 {
            return Err(ConfigError::Invalid("board_size must be positive".into()));
        }
        if world.border_margin < 0 || world.border_margin * 2 >= world.board_size {
            return Err(ConfigError::Invalid(format!(
                "border_margin {} leaves no interior on a board of size {}",
                world.border_margin, world.board_size
            )));
        }
        if world.gold_count + world.spider_count > world.interior_tiles() {
            return Err(ConfigError::Invalid(format!(
                "{} gold and {} spiders do not fit in {} interior tiles",
                world.gold_count,
                world.spider_count,
                world.interior_tiles()
            )));
        }
        if world.max_chunk_size < 3 {
            return Err(ConfigError::Invalid("max_chunk_size must be at least 3".into()));
        }
        if world.max_placement_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_placement_attempts must be positive".into(),
            ));
        }
        if self.timing.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "sweep_interval_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}
