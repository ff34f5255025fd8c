//! Procedural world generation: gold, spiders, then mountain chunks.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::Range;

use super::{sample_position, Position, TileKind, WorldState};
use crate::config::WorldConfig;
use crate::error::GameError;

/// Shapes a mountain chunk can grow into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkShape {
    /// A straight horizontal or vertical run from the anchor.
    Line,
    /// An N x N block with the anchor in its south-west corner.
    Square,
    /// Two equal perpendicular arms meeting at the anchor.
    LShape,
    /// Random-walk growth around the anchor.
    Blob,
}

impl ChunkShape {
    pub const ALL: [ChunkShape; 4] = [
        ChunkShape::Line,
        ChunkShape::Square,
        ChunkShape::LShape,
        ChunkShape::Blob,
    ];
}

/// Builds fresh boards from a [`WorldConfig`].
#[derive(Debug, Clone)]
pub struct WorldGenerator {
    config: WorldConfig,
}

impl WorldGenerator {
    pub fn new(config: WorldConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Generate a board.
    ///
    /// # Algorithm
    ///
    /// 1. Place `gold_count` gold tiles by rejection sampling
    /// 2. Place `spider_count` spiders the same way, avoiding gold
    /// 3. Grow `mountain_chunks` chunks and keep every grown tile that is
    ///    inside the margin and not gold or a spider
    ///
    /// Gold and spider counts are exact. Reachability of every tile is not
    /// guaranteed.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<WorldState, GameError> {
        let mut world = WorldState::new(self.config.board_size);
        let range = self.interior();

        while world.gold_remaining() < self.config.gold_count {
            let tile = sample_position(
                rng,
                range.clone(),
                self.config.max_placement_attempts,
                "gold",
                |p| world.classify(p) == TileKind::Empty,
            )?;
            world.insert_gold(tile);
        }

        while world.spider_count() < self.config.spider_count {
            let tile = sample_position(
                rng,
                range.clone(),
                self.config.max_placement_attempts,
                "spider",
                |p| world.classify(p) == TileKind::Empty,
            )?;
            world.insert_spider(tile);
        }

        let mountains = self.generate_mountains(rng, &world);
        world.extend_mountains(mountains);

        tracing::debug!(
            gold = world.gold_remaining(),
            spiders = world.spider_count(),
            mountains = world.mountain_count(),
            "world generated"
        );
        Ok(world)
    }

    /// Grow every mountain chunk and return the accepted tiles.
    fn generate_mountains<R: Rng + ?Sized>(&self, rng: &mut R, world: &WorldState) -> HashSet<Position> {
        let range = self.interior();
        let mut mountains = HashSet::new();

        for _ in 0..self.config.mountain_chunks {
            let anchor = Position::new(rng.gen_range(range.clone()), rng.gen_range(range.clone()));
            let shape = *ChunkShape::ALL.choose(rng).unwrap_or(&ChunkShape::Blob);
            let chunk = grow_chunk(rng, anchor, shape, self.config.max_chunk_size);

            let accepted: Vec<_> = chunk
                .into_iter()
                .filter(|p| {
                    range.contains(&p.x)
                        && range.contains(&p.y)
                        && world.classify(*p) == TileKind::Empty
                        && !mountains.contains(p)
                })
                .collect();
            mountains.extend(accepted);
        }

        mountains
    }

    fn interior(&self) -> Range<i32> {
        self.config.border_margin..self.config.board_size - self.config.border_margin
    }
}

/// Grow the candidate tiles of one chunk. Tiles may fall off the board;
/// the caller filters them.
pub fn grow_chunk<R: Rng + ?Sized>(
    rng: &mut R,
    anchor: Position,
    shape: ChunkShape,
    max_size: usize,
) -> HashSet<Position> {
    let max_size = max_size.max(3) as i32;
    let mut chunk = HashSet::new();

    match shape {
        ChunkShape::Line => {
            let length = rng.gen_range(3..=max_size);
            let horizontal = rng.gen_bool(0.5);
            for i in 0..length {
                if horizontal {
                    chunk.insert(Position::new(anchor.x + i, anchor.y));
                } else {
                    chunk.insert(Position::new(anchor.x, anchor.y + i));
                }
            }
        }
        ChunkShape::Square => {
            let side_max = ((max_size as f64).sqrt() as i32).max(2);
            let side = rng.gen_range(2..=side_max);
            for dx in 0..side {
                for dy in 0..side {
                    chunk.insert(Position::new(anchor.x + dx, anchor.y + dy));
                }
            }
        }
        ChunkShape::LShape => {
            let arm = rng.gen_range(2..=(max_size / 2).max(2));
            for i in 0..arm {
                chunk.insert(Position::new(anchor.x + i, anchor.y));
                chunk.insert(Position::new(anchor.x, anchor.y + i));
            }
        }
        ChunkShape::Blob => {
            chunk.insert(anchor);
            let mut tiles = vec![anchor];
            let steps = rng.gen_range(3..=max_size);
            for _ in 0..steps {
                if chunk.len() >= max_size as usize {
                    break;
                }
                let base = tiles[rng.gen_range(0..tiles.len())];
                let next = Position::new(
                    base.x + rng.gen_range(-1..=1),
                    base.y + rng.gen_range(-1..=1),
                );
                if chunk.insert(next) {
                    tiles.push(next);
                }
            }
        }
    }

    chunk
}
