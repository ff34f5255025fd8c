//! # Gold Rush Rules
//!
//! The rules crate - contains the world model, entity registry, and the
//! movement and observation mechanics of the grid game.
//! This crate is the single source of truth for game state transitions and
//! performs no I/O and no locking; callers supply the random source and the
//! current instant.

pub mod config;
pub mod entities;
pub mod error;
pub mod mechanics;
pub mod world_state;

pub use config::*;
pub use entities::*;
pub use error::*;
pub use mechanics::*;
pub use world_state::*;
