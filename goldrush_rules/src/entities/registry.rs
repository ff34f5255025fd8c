//! The entity registry: every live player, keyed by [`EntityKey`].

use rand::Rng;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::{Entity, EntityKey};
use crate::config::GameConfig;
use crate::error::GameError;
use crate::world_state::{sample_position, Position, TileKind, WorldState};

/// Limits applied when a player joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnRules {
    /// Idle time after which an entity is evicted.
    pub entity_timeout: Duration,
    /// Cap for spawn tile sampling.
    pub max_placement_attempts: u32,
}

impl Default for SpawnRules {
    fn default() -> Self {
        Self::from(&GameConfig::default())
    }
}

impl From<&GameConfig> for SpawnRules {
    fn from(config: &GameConfig) -> Self {
        Self {
            entity_timeout: config.timing.entity_timeout(),
            max_placement_attempts: config.world.max_placement_attempts,
        }
    }
}

/// Owns all registered entities.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entities: HashMap<EntityKey, Entity>,
    next_sequence: u64,
}

impl EntityRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a player at a random safe tile.
    ///
    /// Stale entities are evicted first. The spawn tile is empty terrain, not
    /// within one tile of a spider, and not occupied by another entity.
    pub fn register<R: Rng + ?Sized>(
        &mut self,
        world: &WorldState,
        rng: &mut R,
        name: impl Into<String>,
        emoji: impl Into<String>,
        now: Instant,
        rules: &SpawnRules,
    ) -> Result<&Entity, GameError> {
        self.evict_stale(now, rules.entity_timeout);

        let attempts = rules.max_placement_attempts;
        let position = sample_position(rng, 0..world.board_size(), attempts, "player", |p| {
            world.classify(p) == TileKind::Empty
                && !world.is_adjacent_to_spider(p)
                && self.occupant_at(p).is_none()
        })?;

        let key = EntityKey::new();
        let entity = Entity {
            key,
            name: name.into(),
            emoji: emoji.into(),
            position,
            score: 0,
            theft: 0,
            last_action: now,
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;

        tracing::info!(%key, name = %entity.name, %position, "entity registered");
        Ok(self.entities.entry(key).or_insert(entity))
    }

    /// Remove every entity idle for longer than `timeout`. Returns the evicted keys.
    pub fn evict_stale(&mut self, now: Instant, timeout: Duration) -> Vec<EntityKey> {
        let stale: Vec<_> = self
            .entities
            .values()
            .filter(|e| now.saturating_duration_since(e.last_action) > timeout)
            .map(|e| e.key)
            .collect();

        for key in &stale {
            self.entities.remove(key);
        }
        if !stale.is_empty() {
            tracing::info!(evicted = stale.len(), "evicted idle entities");
        }
        stale
    }

    /// Get entity by key.
    pub fn get(&self, key: EntityKey) -> Result<&Entity, GameError> {
        self.entities.get(&key).ok_or(GameError::NotFound(key))
    }

    /// Get mutable entity by key.
    pub fn get_mut(&mut self, key: EntityKey) -> Result<&mut Entity, GameError> {
        self.entities.get_mut(&key).ok_or(GameError::NotFound(key))
    }

    /// Record an action, enforcing the cooldown.
    ///
    /// A rejected attempt leaves the timestamp untouched.
    pub fn touch(&mut self, key: EntityKey, now: Instant, cooldown: Duration) -> Result<(), GameError> {
        let entity = self.get_mut(key)?;
        let elapsed = now.saturating_duration_since(entity.last_action);
        if elapsed < cooldown {
            return Err(GameError::RateLimited {
                retry_after: cooldown - elapsed,
            });
        }
        entity.last_action = now;
        Ok(())
    }

    /// The entity standing on `position`, if any.
    pub fn occupant_at(&self, position: Position) -> Option<EntityKey> {
        self.entities
            .values()
            .find(|e| e.position == position)
            .map(|e| e.key)
    }

    /// Snapshot of all entities, best score first, earlier registrations
    /// first among equal scores.
    pub fn list(&self) -> Vec<&Entity> {
        let mut entities: Vec<_> = self.entities.values().collect();
        entities.sort_by(|a, b| b.score.cmp(&a.score).then(a.sequence.cmp(&b.sequence)));
        entities
    }

    /// 1-based leaderboard rank of an entity.
    pub fn rank(&self, key: EntityKey) -> Result<usize, GameError> {
        self.list()
            .iter()
            .position(|e| e.key == key)
            .map(|index| index + 1)
            .ok_or(GameError::NotFound(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Remove every entity.
    pub fn clear(&mut self) {
        self.entities.clear();
    }

    /// Insert an entity directly, bypassing spawn placement.
    pub fn insert(&mut self, mut entity: Entity) -> EntityKey {
        let key = entity.key;
        entity.sequence = self.next_sequence;
        self.next_sequence += 1;
        self.entities.insert(key, entity);
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const TIMEOUT: Duration = Duration::from_secs(3000);
    const COOLDOWN: Duration = Duration::from_secs(2);

    fn placed(position: Position, score: u32, now: Instant) -> Entity {
        Entity {
            key: EntityKey::new(),
            name: "Test".into(),
            emoji: "T".into(),
            position,
            score,
            theft: 0,
            last_action: now,
            sequence: 0,
        }
    }

    #[test]
    fn test_register_avoids_spiders_and_hazards() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let world = WorldState::from_parts(
            8,
            [Position::new(0, 0), Position::new(7, 7)],
            [Position::new(1, 6)],
            [Position::new(3, 3), Position::new(5, 2)],
        );
        let mut registry = EntityRegistry::new();
        let now = Instant::now();

        for i in 0..15 {
            let entity = registry
                .register(&world, &mut rng, format!("p{}", i), "P", now, &SpawnRules::default())
                .unwrap();
            let p = entity.position;
            assert!(world.in_bounds(p));
            assert_eq!(world.classify(p), TileKind::Empty);
            assert!(!world.is_adjacent_to_spider(p));
        }

        let mut positions: Vec<_> = registry.iter().map(|e| e.position).collect();
        positions.sort();
        positions.dedup();
        assert_eq!(positions.len(), 15);
    }

    #[test]
    fn test_register_exhaustion() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let world = WorldState::from_parts(2, [], [], [Position::new(0, 0)]);
        let mut registry = EntityRegistry::new();

        let rules = SpawnRules {
            entity_timeout: TIMEOUT,
            max_placement_attempts: 100,
        };
        let result = registry.register(&world, &mut rng, "a", "A", Instant::now(), &rules);
        assert!(matches!(result, Err(GameError::PlacementExhausted { .. })));
    }

    #[test]
    fn test_register_evicts_before_spawning() {
        // A 2x2 board with a single safe tile, held by an idle entity.
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let world = WorldState::from_parts(2, [Position::new(0, 1), Position::new(1, 0)], [Position::new(1, 1)], []);
        let start = Instant::now();
        let mut registry = EntityRegistry::new();
        let idle = registry.insert(placed(Position::new(0, 0), 0, start));

        let rules = SpawnRules {
            entity_timeout: TIMEOUT,
            max_placement_attempts: 100,
        };
        let later = start + TIMEOUT + Duration::from_secs(1);
        let position = registry.register(&world, &mut rng, "late", "L", later, &rules).unwrap().position;

        assert_eq!(position, Position::new(0, 0));
        assert!(registry.get(idle).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_spawn_rules_from_config() {
        let rules = SpawnRules::default();
        assert_eq!(rules.entity_timeout, TIMEOUT);
        assert_eq!(rules.max_placement_attempts, 10_000);
    }

    #[test]
    fn test_touch_rate_limit() {
        let start = Instant::now();
        let mut registry = EntityRegistry::new();
        let key = registry.insert(placed(Position::new(1, 1), 0, start));

        let early = start + Duration::from_millis(1500);
        let err = registry.touch(key, early, COOLDOWN).unwrap_err();
        assert!(matches!(err, GameError::RateLimited { retry_after } if retry_after == Duration::from_millis(500)));
        assert_eq!(registry.get(key).unwrap().last_action, start);

        let later = start + COOLDOWN;
        registry.touch(key, later, COOLDOWN).unwrap();
        assert_eq!(registry.get(key).unwrap().last_action, later);
    }

    #[test]
    fn test_touch_unknown_key() {
        let mut registry = EntityRegistry::new();
        let err = registry.touch(EntityKey::new(), Instant::now(), COOLDOWN);
        assert!(matches!(err, Err(GameError::NotFound(_))));
    }

    #[test]
    fn test_evict_stale() {
        let start = Instant::now();
        let mut registry = EntityRegistry::new();
        let idle = registry.insert(placed(Position::new(1, 1), 0, start));
        let active = registry.insert(placed(Position::new(2, 2), 0, start + Duration::from_secs(100)));

        let evicted = registry.evict_stale(start + TIMEOUT + Duration::from_secs(1), TIMEOUT);

        assert_eq!(evicted, vec![idle]);
        assert!(registry.get(idle).is_err());
        assert!(registry.get(active).is_ok());
    }

    #[test]
    fn test_leaderboard_order_and_rank() {
        let now = Instant::now();
        let mut registry = EntityRegistry::new();
        let first = registry.insert(placed(Position::new(1, 1), 2, now));
        let second = registry.insert(placed(Position::new(2, 2), 5, now));
        let third = registry.insert(placed(Position::new(3, 3), 2, now));

        let order: Vec<_> = registry.list().iter().map(|e| e.key).collect();
        assert_eq!(order, vec![second, first, third]);
        assert_eq!(registry.rank(second).unwrap(), 1);
        assert_eq!(registry.rank(third).unwrap(), 3);
    }

    #[test]
    fn test_occupant_at() {
        let mut registry = EntityRegistry::new();
        let key = registry.insert(placed(Position::new(4, 4), 0, Instant::now()));
        assert_eq!(registry.occupant_at(Position::new(4, 4)), Some(key));
        assert_eq!(registry.occupant_at(Position::new(4, 5)), None);
    }
}
