//! Entity definitions: the players moving around the board.

mod registry;

pub use registry::*;

use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

use crate::world_state::Position;

/// Opaque key handed to a player at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(pub Uuid);

impl EntityKey {
    /// Create a new random entity key.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a nil key, which never names a live entity.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Parse a key from its textual form. Returns `None` for malformed text.
    pub fn parse(text: &str) -> Option<Self> {
        Uuid::parse_str(text.trim()).ok().map(Self)
    }
}

impl Default for EntityKey {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered player.
#[derive(Debug, Clone)]
pub struct Entity {
    pub key: EntityKey,
    pub name: String,
    pub emoji: String,
    pub position: Position,
    pub score: u32,
    /// Net points taken from other players. Negative once robbed more than robbing.
    pub theft: i64,
    pub last_action: Instant,
    /// Registration order, used to break leaderboard ties.
    pub sequence: u64,
}

impl Entity {
    /// Add one point.
    pub fn award(&mut self) {
        self.score += 1;
    }

    /// Remove one point, never dropping below zero.
    pub fn penalize(&mut self) {
        self.score = self.score.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(score: u32) -> Entity {
        Entity {
            key: EntityKey::new(),
            name: "Prospector".into(),
            emoji: "⛏".into(),
            position: Position::new(0, 0),
            score,
            theft: 0,
            last_action: Instant::now(),
            sequence: 0,
        }
    }

    #[test]
    fn test_penalty_floor() {
        let mut e = entity(1);
        e.penalize();
        assert_eq!(e.score, 0);
        e.penalize();
        assert_eq!(e.score, 0);
    }

    #[test]
    fn test_key_parse() {
        let key = EntityKey::new();
        assert_eq!(EntityKey::parse(&key.to_string()), Some(key));
        assert_eq!(EntityKey::parse("not-a-key"), None);
    }
}
