//! Game mechanics: movement, hazards, theft, gold pickup and observation.

mod movement;
mod observation;

pub use movement::*;
pub use observation::*;

use std::time::Duration;

use crate::config::GameConfig;

/// Per-action rules shared by every mechanic that counts as an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionRules {
    /// Minimum time between two accepted actions of one entity.
    pub cooldown: Duration,
    /// Cap for teleport target sampling.
    pub max_placement_attempts: u32,
}

impl Default for ActionRules {
    fn default() -> Self {
        Self::from(&GameConfig::default())
    }
}

impl From<&GameConfig> for ActionRules {
    fn from(config: &GameConfig) -> Self {
        Self {
            cooldown: config.timing.action_cooldown(),
            max_placement_attempts: config.world.max_placement_attempts,
        }
    }
}
