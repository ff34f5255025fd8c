//! Movement and interaction: the step state machine.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::ActionRules;
use crate::entities::{EntityKey, EntityRegistry};
use crate::error::GameError;
use crate::world_state::{sample_position, Direction, Position, TileKind, WorldState};

/// What a step attempt resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MoveOutcome {
    /// Moved onto the target tile.
    Moved,
    /// The target was off the board.
    OffBoard,
    /// The target was a mountain.
    Mountain,
    /// Stepped on a spider and was relocated.
    Teleported { spider: Position },
    /// Took one point from the occupant of the target tile.
    Stole { victim: EntityKey },
    /// The target was occupied by a player with nothing to steal.
    Bumped { occupant: EntityKey },
}

impl MoveOutcome {
    /// Whether the entity stayed where it was.
    pub fn is_blocked(&self) -> bool {
        !matches!(self, MoveOutcome::Moved | MoveOutcome::Teleported { .. })
    }
}

/// Result of an accepted step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveReport {
    pub key: EntityKey,
    pub outcome: MoveOutcome,
    /// Resting position after the step.
    pub position: Position,
    pub score: u32,
    /// Whether gold was collected at the resting position.
    pub picked_up_gold: bool,
}

/// Attempt to step `key` one tile in `direction`.
///
/// Rules, in order:
/// 1. Off the board or onto a mountain: stay put
/// 2. Onto a spider: teleport to a random free tile and lose a point (floor 0)
/// 3. Onto another player: take one point if they have any, stay put either way
/// 4. Otherwise move
///
/// Afterwards gold at the resting tile is collected. Every accepted attempt
/// refreshes the action timestamp, including ones that do not move.
pub fn step<R: Rng + ?Sized>(
    world: &mut WorldState,
    registry: &mut EntityRegistry,
    rng: &mut R,
    key: EntityKey,
    direction: Direction,
    now: Instant,
    rules: &ActionRules,
) -> Result<MoveReport, GameError> {
    registry.touch(key, now, rules.cooldown)?;

    let current = registry.get(key)?.position;
    let target = current.step(direction);

    let outcome = if !world.in_bounds(target) {
        MoveOutcome::OffBoard
    } else {
        match world.classify(target) {
            TileKind::Mountain => MoveOutcome::Mountain,
            TileKind::Spider => {
                teleport(world, registry, rng, key, rules)?;
                MoveOutcome::Teleported { spider: target }
            }
            TileKind::Gold | TileKind::Empty => match registry.occupant_at(target) {
                Some(occupant) => steal(registry, key, occupant)?,
                None => {
                    registry.get_mut(key)?.position = target;
                    MoveOutcome::Moved
                }
            },
        }
    };

    let entity = registry.get_mut(key)?;
    let picked_up_gold = world.take_gold(entity.position);
    if picked_up_gold {
        entity.award();
        tracing::info!(%key, name = %entity.name, position = %entity.position, "picked up gold");
    }

    Ok(MoveReport {
        key,
        outcome,
        position: entity.position,
        score: entity.score,
        picked_up_gold,
    })
}

/// Relocate to a random tile free of terrain and players, losing a point.
///
/// The current tile is occupied by the mover itself, so it never qualifies.
fn teleport<R: Rng + ?Sized>(
    world: &WorldState,
    registry: &mut EntityRegistry,
    rng: &mut R,
    key: EntityKey,
    rules: &ActionRules,
) -> Result<(), GameError> {
    let destination = sample_position(
        rng,
        0..world.board_size(),
        rules.max_placement_attempts,
        "teleport target",
        |p| world.classify(p) == TileKind::Empty && registry.occupant_at(p).is_none(),
    )?;

    let entity = registry.get_mut(key)?;
    entity.position = destination;
    entity.penalize();
    tracing::info!(%key, name = %entity.name, %destination, "teleported by spider");
    Ok(())
}

/// Move one point from `victim` to `thief` if the victim has any.
fn steal(
    registry: &mut EntityRegistry,
    thief: EntityKey,
    victim: EntityKey,
) -> Result<MoveOutcome, GameError> {
    let target = registry.get_mut(victim)?;
    if target.score == 0 {
        return Ok(MoveOutcome::Bumped { occupant: victim });
    }
    target.score -= 1;
    target.theft -= 1;

    let entity = registry.get_mut(thief)?;
    entity.score += 1;
    entity.theft += 1;
    tracing::info!(%thief, %victim, "stole gold");
    Ok(MoveOutcome::Stole { victim })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Entity;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::time::Duration;

    struct Fixture {
        world: WorldState,
        registry: EntityRegistry,
        rng: ChaCha8Rng,
        now: Instant,
        rules: ActionRules,
    }

    impl Fixture {
        fn new(world: WorldState) -> Self {
            Self {
                world,
                registry: EntityRegistry::new(),
                rng: ChaCha8Rng::seed_from_u64(5),
                now: Instant::now(),
                rules: ActionRules::default(),
            }
        }

        fn spawn(&mut self, position: Position, score: u32) -> EntityKey {
            self.registry.insert(Entity {
                key: EntityKey::new(),
                name: format!("at {}", position),
                emoji: "P".into(),
                position,
                score,
                theft: 0,
                last_action: self.now,
                sequence: 0,
            })
        }

        /// Advance past the cooldown and step.
        fn step(&mut self, key: EntityKey, direction: Direction) -> Result<MoveReport, GameError> {
            self.now += self.rules.cooldown;
            step(
                &mut self.world,
                &mut self.registry,
                &mut self.rng,
                key,
                direction,
                self.now,
                &self.rules,
            )
        }
    }

    #[test]
    fn test_move_north_into_empty() {
        let mut f = Fixture::new(WorldState::new(20));
        let key = f.spawn(Position::new(5, 5), 0);

        let report = f.step(key, Direction::N).unwrap();

        assert_eq!(report.outcome, MoveOutcome::Moved);
        assert_eq!(report.position, Position::new(5, 6));
        assert_eq!(report.score, 0);
        assert!(!report.picked_up_gold);
    }

    #[test]
    fn test_wall_bumps_are_idempotent() {
        let mountain = Position::new(5, 6);
        let mut f = Fixture::new(WorldState::from_parts(20, [mountain], [], []));
        let key = f.spawn(Position::new(5, 5), 2);
        let corner = f.spawn(Position::new(0, 0), 1);

        for _ in 0..3 {
            let report = f.step(key, Direction::N).unwrap();
            assert_eq!(report.outcome, MoveOutcome::Mountain);
            assert_eq!(report.position, Position::new(5, 5));
            assert_eq!(report.score, 2);

            let report = f.step(corner, Direction::W).unwrap();
            assert_eq!(report.outcome, MoveOutcome::OffBoard);
            assert_eq!(report.position, Position::new(0, 0));
            assert_eq!(report.score, 1);
        }
    }

    #[test]
    fn test_blocked_step_refreshes_timestamp() {
        let mut f = Fixture::new(WorldState::new(20));
        let key = f.spawn(Position::new(0, 0), 0);

        f.step(key, Direction::S).unwrap();
        assert_eq!(f.registry.get(key).unwrap().last_action, f.now);

        let err = step(
            &mut f.world,
            &mut f.registry,
            &mut f.rng,
            key,
            Direction::N,
            f.now + Duration::from_secs(1),
            &f.rules,
        );
        assert!(matches!(err, Err(GameError::RateLimited { .. })));
    }

    #[test]
    fn test_rate_limited_step_changes_nothing() {
        let mut f = Fixture::new(WorldState::from_parts(20, [], [Position::new(5, 6)], []));
        let key = f.spawn(Position::new(5, 5), 0);

        let result = step(
            &mut f.world,
            &mut f.registry,
            &mut f.rng,
            key,
            Direction::N,
            f.now + Duration::from_millis(1999),
            &f.rules,
        );

        assert!(matches!(result, Err(GameError::RateLimited { .. })));
        let entity = f.registry.get(key).unwrap();
        assert_eq!(entity.position, Position::new(5, 5));
        assert_eq!(entity.last_action, f.now);
        assert_eq!(f.world.gold_remaining(), 1);
    }

    #[test]
    fn test_unknown_key() {
        let mut f = Fixture::new(WorldState::new(20));
        let result = f.step(EntityKey::new(), Direction::N);
        assert!(matches!(result, Err(GameError::NotFound(_))));
    }

    #[test]
    fn test_spider_teleports_and_penalizes() {
        let spider = Position::new(5, 6);
        let gold = [Position::new(1, 1), Position::new(2, 2)];
        let mut f = Fixture::new(WorldState::from_parts(20, [Position::new(9, 9)], gold, [spider]));
        let key = f.spawn(Position::new(5, 5), 3);
        let other = f.spawn(Position::new(10, 10), 0);

        let report = f.step(key, Direction::N).unwrap();

        assert_eq!(report.outcome, MoveOutcome::Teleported { spider });
        assert_ne!(report.position, spider);
        assert_ne!(report.position, f.registry.get(other).unwrap().position);
        assert_eq!(f.world.classify(report.position), TileKind::Empty);
        assert_eq!(report.score, 2);
        assert!(!report.picked_up_gold);
    }

    #[test]
    fn test_spider_penalty_floor() {
        let spider = Position::new(5, 6);
        let mut f = Fixture::new(WorldState::from_parts(20, [], [], [spider]));
        let key = f.spawn(Position::new(5, 5), 0);

        let report = f.step(key, Direction::N).unwrap();
        assert_eq!(report.score, 0);
    }

    #[test]
    fn test_theft_transfers_one_point() {
        let mut f = Fixture::new(WorldState::new(20));
        let thief = f.spawn(Position::new(5, 5), 1);
        let victim = f.spawn(Position::new(6, 5), 3);

        let report = f.step(thief, Direction::E).unwrap();

        assert_eq!(report.outcome, MoveOutcome::Stole { victim });
        assert_eq!(report.position, Position::new(5, 5));
        assert_eq!(report.score, 2);

        let robbed = f.registry.get(victim).unwrap();
        assert_eq!(robbed.score, 2);
        assert_eq!(robbed.theft, -1);
        assert_eq!(robbed.position, Position::new(6, 5));
        assert_eq!(f.registry.get(thief).unwrap().theft, 1);

        let total: u32 = f.registry.iter().map(|e| e.score).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn test_bump_into_broke_player() {
        let mut f = Fixture::new(WorldState::new(20));
        let mover = f.spawn(Position::new(5, 5), 3);
        let occupant = f.spawn(Position::new(5, 6), 0);

        let report = f.step(mover, Direction::N).unwrap();

        assert_eq!(report.outcome, MoveOutcome::Bumped { occupant });
        assert!(report.outcome.is_blocked());
        assert_eq!(report.position, Position::new(5, 5));
        assert_eq!(report.score, 3);
        assert_eq!(f.registry.get(occupant).unwrap().score, 0);
    }

    #[test]
    fn test_gold_pickup_exactly_once() {
        let gold = Position::new(5, 6);
        let mut f = Fixture::new(WorldState::from_parts(20, [], [gold], []));
        let first = f.spawn(Position::new(5, 5), 0);
        let second = f.spawn(Position::new(5, 8), 0);

        let report = f.step(first, Direction::N).unwrap();
        assert!(report.picked_up_gold);
        assert_eq!(report.score, 1);
        assert_eq!(f.world.gold_remaining(), 0);

        f.step(first, Direction::S).unwrap();
        f.step(second, Direction::S).unwrap();
        let report = f.step(second, Direction::S).unwrap();
        assert_eq!(report.position, gold);
        assert!(!report.picked_up_gold);
        assert_eq!(report.score, 0);
    }

    #[test]
    fn test_teleport_skips_gold_and_current_tile() {
        // Every tile except the spider, the start and one free tile holds gold.
        let spider = Position::new(1, 0);
        let start = Position::new(0, 0);
        let free = Position::new(2, 2);
        let gold: Vec<_> = (0..3)
            .flat_map(|x| (0..3).map(move |y| Position::new(x, y)))
            .filter(|p| *p != spider && *p != start && *p != free)
            .collect();
        let mut f = Fixture::new(WorldState::from_parts(3, [], gold, [spider]));
        let key = f.spawn(start, 1);

        let report = f.step(key, Direction::E).unwrap();

        assert_eq!(report.outcome, MoveOutcome::Teleported { spider });
        assert_eq!(report.position, free);
        assert!(!report.picked_up_gold);
        assert_eq!(report.score, 0);
        assert_eq!(f.world.gold_remaining(), 6);
    }

    #[test]
    fn test_teleport_with_no_other_tile_is_exhausted() {
        let spider = Position::new(1, 0);
        let start = Position::new(0, 0);
        let mut f = Fixture::new(WorldState::from_parts(2, [Position::new(0, 1), Position::new(1, 1)], [], [spider]));
        f.rules.max_placement_attempts = 50;
        let key = f.spawn(start, 1);

        let result = f.step(key, Direction::E);

        assert!(matches!(result, Err(GameError::PlacementExhausted { .. })));
        let entity = f.registry.get(key).unwrap();
        assert_eq!(entity.position, start);
        assert_eq!(entity.score, 1);
    }
}
