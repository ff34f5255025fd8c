//! World state management - the board terrain shared by every entity.

mod generator;

pub use generator::*;

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::Range;

use crate::error::GameError;

/// A tile coordinate. Positive y is north, positive x is east.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighbouring tile one step in `direction`. May be off the board.
    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        Self::new(self.x + dx, self.y + dy)
    }

    /// Chessboard distance: diagonal neighbours are at distance 1.
    pub fn chebyshev_distance(self, other: Position) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Cardinal movement directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    N,
    S,
    E,
    W,
}

impl Direction {
    /// Unit offset for this direction.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::N => (0, 1),
            Direction::S => (0, -1),
            Direction::E => (1, 0),
            Direction::W => (-1, 0),
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "N" | "n" => Ok(Direction::N),
            "S" | "s" => Ok(Direction::S),
            "E" | "e" => Ok(Direction::E),
            "W" | "w" => Ok(Direction::W),
            other => Err(format!("unknown direction '{}'", other)),
        }
    }
}

/// Terrain classification of a single tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileKind {
    Empty,
    Mountain,
    Gold,
    Spider,
}

/// The board terrain.
///
/// Occupancy is kept as three disjoint position sets rather than a dense grid.
/// Callers go through [`WorldState::classify`] and never touch the sets
/// directly.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorldState {
    board_size: i32,
    mountains: HashSet<Position>,
    gold: HashSet<Position>,
    spiders: HashSet<Position>,
}

impl WorldState {
    /// Create an empty board with no terrain.
    pub fn new(board_size: i32) -> Self {
        Self {
            board_size,
            ..Self::default()
        }
    }

    /// Assemble a board from explicit terrain sets.
    ///
    /// Gold and spiders win over mountains if the sets overlap, so the result
    /// always keeps the three sets disjoint.
    pub fn from_parts(
        board_size: i32,
        mountains: impl IntoIterator<Item = Position>,
        gold: impl IntoIterator<Item = Position>,
        spiders: impl IntoIterator<Item = Position>,
    ) -> Self {
        let mut world = Self::new(board_size);
        world.gold.extend(gold.into_iter().filter(|p| world_in_bounds(board_size, *p)));
        world.spiders.extend(
            spiders
                .into_iter()
                .filter(|p| world_in_bounds(board_size, *p) && !world.gold.contains(p)),
        );
        let mountains: Vec<_> = mountains
            .into_iter()
            .filter(|p| world_in_bounds(board_size, *p) && world.classify(*p) == TileKind::Empty)
            .collect();
        world.mountains.extend(mountains);
        world
    }

    pub fn board_size(&self) -> i32 {
        self.board_size
    }

    /// Whether a position lies on the board.
    pub fn in_bounds(&self, position: Position) -> bool {
        world_in_bounds(self.board_size, position)
    }

    /// Classify a tile by its terrain.
    pub fn classify(&self, position: Position) -> TileKind {
        if self.mountains.contains(&position) {
            TileKind::Mountain
        } else if self.gold.contains(&position) {
            TileKind::Gold
        } else if self.spiders.contains(&position) {
            TileKind::Spider
        } else {
            TileKind::Empty
        }
    }

    /// Whether any spider is within one tile, diagonals included.
    pub fn is_adjacent_to_spider(&self, position: Position) -> bool {
        self.spiders
            .iter()
            .any(|spider| spider.chebyshev_distance(position) <= 1)
    }

    /// Remove the gold at `position`. Returns whether there was any.
    pub fn take_gold(&mut self, position: Position) -> bool {
        self.gold.remove(&position)
    }

    pub fn gold_remaining(&self) -> usize {
        self.gold.len()
    }

    pub fn spider_count(&self) -> usize {
        self.spiders.len()
    }

    pub fn mountain_count(&self) -> usize {
        self.mountains.len()
    }

    pub fn gold_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.gold.iter().copied()
    }

    pub fn spider_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.spiders.iter().copied()
    }

    pub fn mountain_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.mountains.iter().copied()
    }

    /// Remove all terrain, keeping the board size.
    pub fn clear(&mut self) {
        self.mountains.clear();
        self.gold.clear();
        self.spiders.clear();
    }

    /// Render the whole board as text rows, highest y first.
    ///
    /// Entities are drawn with their display marker on top of terrain.
    pub fn render_board<'a>(
        &self,
        entities: impl IntoIterator<Item = (Position, &'a str)>,
    ) -> Vec<String> {
        let size = self.board_size.max(0) as usize;
        let mut board = vec![vec![".".to_string(); size]; size];

        for (symbol, set) in [("M", &self.mountains), ("G", &self.gold), ("S", &self.spiders)] {
            for p in set {
                board[p.y as usize][p.x as usize] = symbol.to_string();
            }
        }
        for (p, marker) in entities {
            if self.in_bounds(p) {
                board[p.y as usize][p.x as usize] = marker.to_string();
            }
        }

        board.into_iter().rev().map(|row| row.join(" ")).collect()
    }

    pub(crate) fn insert_gold(&mut self, position: Position) {
        self.gold.insert(position);
    }

    pub(crate) fn insert_spider(&mut self, position: Position) {
        self.spiders.insert(position);
    }

    pub(crate) fn extend_mountains(&mut self, positions: impl IntoIterator<Item = Position>) {
        self.mountains.extend(positions);
    }
}

fn world_in_bounds(board_size: i32, position: Position) -> bool {
    (0..board_size).contains(&position.x) && (0..board_size).contains(&position.y)
}

/// Rejection-sample a position with both coordinates drawn from `range`.
///
/// Gives up with [`GameError::PlacementExhausted`] after `max_attempts` draws.
pub fn sample_position<R, F>(
    rng: &mut R,
    range: Range<i32>,
    max_attempts: u32,
    what: &'static str,
    mut accept: F,
) -> Result<Position, GameError>
where
    R: Rng + ?Sized,
    F: FnMut(Position) -> bool,
{
    if !range.is_empty() {
        for _ in 0..max_attempts {
            let candidate = Position::new(rng.gen_range(range.clone()), rng.gen_range(range.clone()));
            if accept(candidate) {
                return Ok(candidate);
            }
        }
    }
    Err(GameError::PlacementExhausted {
        what,
        attempts: max_attempts,
    })
}
