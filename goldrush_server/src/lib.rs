//! # Gold Rush Server
//!
//! The session coordinator. This crate owns the shared game state behind a
//! single lock and exposes the operations a transport layer invokes on behalf
//! of connected players and administrators.
//!
//! ## Core Components
//!
//! - **session**: `GameSession`, the lock-guarded aggregate of world, players and randomness
//! - **events**: audit records emitted to an append-only sink
//! - **sweeper**: background eviction of idle players
//! - **clock**: time source, swappable for tests
//! - **telemetry**: tracing bootstrap for binaries
//! - **transport**: JSON request dispatch and status mapping

pub mod clock;
pub mod events;
pub mod session;
pub mod sweeper;
pub mod telemetry;
pub mod transport;

pub use clock::*;
pub use events::*;
pub use session::*;
pub use sweeper::*;
