//! Error types for game operations and configuration.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::entities::EntityKey;

/// Errors a game operation can report to its caller.
#[derive(Debug, Error)]
pub enum GameError {
    /// The key is unknown, or the entity was evicted for idling.
    #[error("invalid entity key: {0}")]
    NotFound(EntityKey),

    #[error("rate limit exceeded, retry in {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("privileged operation requires an authorized caller")]
    Unauthorized,

    /// A rejection-sampling loop ran out of attempts. Points at a
    /// configuration that leaves too few free tiles.
    #[error("could not place {what} after {attempts} attempts")]
    PlacementExhausted { what: &'static str, attempts: u32 },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl GameError {
    /// Status code a request/response transport should report for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            GameError::NotFound(_) => 400,
            GameError::RateLimited { .. } => 429,
            GameError::Unauthorized => 403,
            GameError::PlacementExhausted { .. } | GameError::Config(_) => 500,
        }
    }
}

/// Errors raised while loading or validating a [`crate::GameConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
