//! The game session: one lock around the whole game state.

use goldrush_rules::{
    mechanics, ActionRules, Direction, EntityKey, EntityRegistry, GameConfig, GameError,
    MoveOutcome, MoveReport, Position, SpawnRules, Viewport, WorldGenerator, WorldState,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::clock::{Clock, SystemClock};
use crate::events::{AuditEvent, AuditKind, AuditSink};

/// Who is calling. Credential checks happen in the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    Player,
    Admin,
}

impl Caller {
    pub fn from_authorized(authorized: bool) -> Self {
        if authorized {
            Caller::Admin
        } else {
            Caller::Player
        }
    }

    fn require_admin(self) -> Result<(), GameError> {
        match self {
            Caller::Admin => Ok(()),
            Caller::Player => Err(GameError::Unauthorized),
        }
    }
}

/// Everything a game operation may read or mutate.
#[derive(Debug)]
pub struct GameState {
    pub world: WorldState,
    pub registry: EntityRegistry,
    pub rng: ChaCha8Rng,
}

impl GameState {
    /// Full snapshot of terrain and players.
    pub fn snapshot(&self) -> WorldSnapshot {
        let sorted = |positions: Vec<Position>| {
            let mut positions = positions;
            positions.sort();
            positions
        };
        WorldSnapshot {
            board_size: self.world.board_size(),
            gold: sorted(self.world.gold_positions().collect()),
            spiders: sorted(self.world.spider_positions().collect()),
            mountains: sorted(self.world.mountain_positions().collect()),
            entities: self
                .registry
                .list()
                .into_iter()
                .map(|e| EntitySnapshot {
                    entity_key: e.key,
                    name: e.name.clone(),
                    emoji: e.emoji.clone(),
                    x: e.position.x,
                    y: e.position.y,
                    score: e.score,
                    theft: e.theft,
                })
                .collect(),
        }
    }

    /// Text dump of the whole board with players drawn by emoji.
    pub fn board_rows(&self) -> Vec<String> {
        self.world.render_board(
            self.registry
                .iter()
                .map(|e| (e.position, e.emoji.as_str())),
        )
    }

    pub fn summary(&self) -> WorldSummary {
        WorldSummary {
            gold: self.world.gold_remaining(),
            spiders: self.world.spider_count(),
            mountains: self.world.mountain_count(),
            players: self.registry.len(),
        }
    }
}

/// Result of a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub entity_key: EntityKey,
    pub name: String,
    pub emoji: String,
    pub x: i32,
    pub y: i32,
}

/// A player's own view of their standing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub score: u32,
    pub theft: i64,
    pub name: String,
    pub emoji: String,
    pub x: i32,
    pub y: i32,
    /// 1-based leaderboard position.
    pub rank: usize,
    pub gold_remaining: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub entity_key: EntityKey,
    pub name: String,
    pub emoji: String,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySnapshot {
    pub entity_key: EntityKey,
    pub name: String,
    pub emoji: String,
    pub x: i32,
    pub y: i32,
    pub score: u32,
    pub theft: i64,
}

/// Full world and player state, positions sorted, players in leaderboard order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    pub board_size: i32,
    pub gold: Vec<Position>,
    pub spiders: Vec<Position>,
    pub mountains: Vec<Position>,
    pub entities: Vec<EntitySnapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSummary {
    pub gold: usize,
    pub spiders: usize,
    pub mountains: usize,
    pub players: usize,
}

/// The coordinator shared by every request handler and the sweeper.
///
/// Every operation holds the state lock for its whole duration, so each one
/// is atomic with respect to all others.
pub struct GameSession {
    config: GameConfig,
    generator: WorldGenerator,
    rules: ActionRules,
    spawn_rules: SpawnRules,
    state: Mutex<GameState>,
    /// Cleared by `admin_stop`; pauses the sweeper.
    running: AtomicBool,
    clock: Arc<dyn Clock>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl GameSession {
    /// Validate the config and generate the first world.
    pub fn new(config: GameConfig) -> Result<Self, GameError> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let generator = WorldGenerator::new(config.world.clone());
        let world = generator.generate(&mut rng)?;

        let session = Self {
            rules: ActionRules::from(&config),
            spawn_rules: SpawnRules::from(&config),
            config,
            generator,
            state: Mutex::new(GameState {
                world,
                registry: EntityRegistry::new(),
                rng,
            }),
            running: AtomicBool::new(true),
            clock: Arc::new(SystemClock),
            audit: None,
        };
        session.log_board("world generated");
        Ok(session)
    }

    /// Use a different time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Send audit records to `sink`.
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Whether the game is running, i.e. not stopped by an administrator.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Register a new player on a safe tile.
    pub fn register(
        &self,
        name: impl Into<String>,
        emoji: impl Into<String>,
    ) -> Result<Registration, GameError> {
        let now = self.clock.now();
        let mut guard = self.lock();
        let state = &mut *guard;

        let entity = state.registry.register(
            &state.world,
            &mut state.rng,
            name,
            emoji,
            now,
            &self.spawn_rules,
        )?;
        let registration = Registration {
            entity_key: entity.key,
            name: entity.name.clone(),
            emoji: entity.emoji.clone(),
            x: entity.position.x,
            y: entity.position.y,
        };

        self.audit(&guard, &[AuditKind::Register]);
        Ok(registration)
    }

    /// The 5x5 window around a player. Counts as an action.
    pub fn observe(&self, key: EntityKey) -> Result<Viewport, GameError> {
        let now = self.clock.now();
        let mut guard = self.lock();
        let state = &mut *guard;
        mechanics::observe(&state.world, &mut state.registry, key, now, &self.rules)
    }

    /// Step a player one tile.
    pub fn move_entity(&self, key: EntityKey, direction: Direction) -> Result<MoveReport, GameError> {
        let now = self.clock.now();
        let mut guard = self.lock();
        let state = &mut *guard;

        let report = mechanics::step(
            &mut state.world,
            &mut state.registry,
            &mut state.rng,
            key,
            direction,
            now,
            &self.rules,
        )?;

        let mut kinds = Vec::with_capacity(2);
        match report.outcome {
            MoveOutcome::Moved => kinds.push(AuditKind::Move),
            MoveOutcome::Teleported { .. } => kinds.push(AuditKind::Teleport),
            MoveOutcome::Stole { .. } => kinds.push(AuditKind::Theft),
            MoveOutcome::OffBoard | MoveOutcome::Mountain | MoveOutcome::Bumped { .. } => {}
        }
        if report.picked_up_gold {
            kinds.push(AuditKind::Pickup);
        }
        self.audit(&guard, &kinds);

        Ok(report)
    }

    /// A player's standing. Does not count as an action.
    pub fn get_player(&self, key: EntityKey) -> Result<PlayerInfo, GameError> {
        let state = self.lock();
        let entity = state.registry.get(key)?;
        Ok(PlayerInfo {
            score: entity.score,
            theft: entity.theft,
            name: entity.name.clone(),
            emoji: entity.emoji.clone(),
            x: entity.position.x,
            y: entity.position.y,
            rank: state.registry.rank(key)?,
            gold_remaining: state.world.gold_remaining(),
        })
    }

    /// All players, best first.
    pub fn leaderboard(&self, caller: Caller) -> Result<Vec<LeaderboardEntry>, GameError> {
        caller.require_admin()?;
        let state = self.lock();
        Ok(state
            .registry
            .list()
            .into_iter()
            .map(|e| LeaderboardEntry {
                entity_key: e.key,
                name: e.name.clone(),
                emoji: e.emoji.clone(),
                score: e.score,
            })
            .collect())
    }

    pub fn admin_snapshot(&self, caller: Caller) -> Result<WorldSnapshot, GameError> {
        caller.require_admin()?;
        Ok(self.lock().snapshot())
    }

    /// Clear every player and all terrain, and pause the sweeper.
    pub fn admin_stop(&self, caller: Caller) -> Result<(), GameError> {
        caller.require_admin()?;
        self.running.store(false, Ordering::SeqCst);
        let mut state = self.lock();
        state.world.clear();
        state.registry.clear();
        tracing::info!("game stopped, all data cleared");
        Ok(())
    }

    /// Clear every player, generate a fresh world, and resume the sweeper.
    ///
    /// A failed generation leaves players, world and the running flag as they were.
    pub fn admin_restart(&self, caller: Caller) -> Result<(), GameError> {
        caller.require_admin()?;
        {
            let mut guard = self.lock();
            let state = &mut *guard;
            let world = self.generator.generate(&mut state.rng)?;
            state.registry.clear();
            state.world = world;
        }
        self.running.store(true, Ordering::SeqCst);
        self.log_board("game restarted");
        Ok(())
    }

    /// Evict idle players. Does nothing while the game is stopped.
    pub fn sweep(&self) -> usize {
        if !self.is_running() {
            return 0;
        }
        let now = self.clock.now();
        self.lock()
            .registry
            .evict_stale(now, self.spawn_rules.entity_timeout)
            .len()
    }

    pub fn world_summary(&self) -> WorldSummary {
        self.lock().summary()
    }

    pub fn board_rows(&self) -> Vec<String> {
        self.lock().board_rows()
    }

    fn lock(&self) -> MutexGuard<'_, GameState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn audit(&self, state: &GameState, kinds: &[AuditKind]) {
        let Some(sink) = &self.audit else {
            return;
        };
        if kinds.is_empty() {
            return;
        }
        let snapshot = state.snapshot();
        for kind in kinds {
            if let Err(err) = sink.record(&AuditEvent::now(*kind, snapshot.clone())) {
                tracing::warn!(?kind, %err, "failed to write audit record");
            }
        }
    }

    fn log_board(&self, message: &str) {
        let state = self.lock();
        let summary = state.summary();
        tracing::info!(
            gold = summary.gold,
            spiders = summary.spiders,
            mountains = summary.mountains,
            players = summary.players,
            "{}",
            message
        );
        for row in state.board_rows() {
            tracing::debug!(target: "board", "{}", row);
        }
    }
}
