//! Observation: the bounded view window around an entity.

use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::ActionRules;
use crate::entities::{EntityKey, EntityRegistry};
use crate::error::GameError;
use crate::world_state::{Position, TileKind, WorldState};

/// Tiles visible in each direction from the observer.
pub const VIEW_RADIUS: i32 = 2;

/// What an observer sees on one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewCell {
    /// The observer's own tile.
    #[serde(rename = "self")]
    Own,
    Mountain,
    Gold,
    Spider,
    /// Another player.
    Player,
    Empty,
}

impl ViewCell {
    /// Single-character marker used in the text rendering.
    pub fn symbol(self) -> char {
        match self {
            ViewCell::Own => 'Y',
            ViewCell::Mountain => 'M',
            ViewCell::Gold => 'G',
            ViewCell::Spider => 'S',
            ViewCell::Player => 'P',
            ViewCell::Empty => '.',
        }
    }
}

/// One in-bounds tile of a viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewTile {
    pub x: i32,
    pub y: i32,
    #[serde(rename = "type")]
    pub kind: ViewCell,
}

/// The window around an observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// In-bounds tiles, north row first, west to east within a row.
    pub visible: Vec<ViewTile>,
    /// Text rows, north first. Off-board tiles render as `.`.
    pub visual: Vec<String>,
}

impl Viewport {
    /// The visible tile at `position`, if it is inside the window and on the board.
    pub fn tile_at(&self, position: Position) -> Option<ViewCell> {
        self.visible
            .iter()
            .find(|t| t.x == position.x && t.y == position.y)
            .map(|t| t.kind)
    }
}

/// Observe the surroundings of `key`. Counts as an action for rate limiting.
pub fn observe(
    world: &WorldState,
    registry: &mut EntityRegistry,
    key: EntityKey,
    now: Instant,
    rules: &ActionRules,
) -> Result<Viewport, GameError> {
    registry.touch(key, now, rules.cooldown)?;
    view(world, registry, key)
}

/// Build the viewport for `key` without touching its action timestamp.
pub fn view(world: &WorldState, registry: &EntityRegistry, key: EntityKey) -> Result<Viewport, GameError> {
    let center = registry.get(key)?.position;
    let mut visible = Vec::new();
    let mut visual = Vec::new();

    for dy in (-VIEW_RADIUS..=VIEW_RADIUS).rev() {
        let mut row = Vec::new();
        for dx in -VIEW_RADIUS..=VIEW_RADIUS {
            let position = Position::new(center.x + dx, center.y + dy);
            if !world.in_bounds(position) {
                row.push(ViewCell::Empty.symbol().to_string());
                continue;
            }

            let kind = classify_for(world, registry, key, center, position);
            visible.push(ViewTile {
                x: position.x,
                y: position.y,
                kind,
            });
            row.push(kind.symbol().to_string());
        }
        visual.push(row.join(" "));
    }

    Ok(Viewport { visible, visual })
}

fn classify_for(
    world: &WorldState,
    registry: &EntityRegistry,
    key: EntityKey,
    center: Position,
    position: Position,
) -> ViewCell {
    if position == center {
        return ViewCell::Own;
    }
    match world.classify(position) {
        TileKind::Mountain => ViewCell::Mountain,
        TileKind::Gold => ViewCell::Gold,
        TileKind::Spider => ViewCell::Spider,
        TileKind::Empty => match registry.occupant_at(position) {
            Some(other) if other != key => ViewCell::Player,
            _ => ViewCell::Empty,
        },
    }
}
