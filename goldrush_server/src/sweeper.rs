//! Background eviction of idle players.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::session::GameSession;

/// Handle to the sweeper thread. Dropping it stops the thread.
#[derive(Debug)]
pub struct Sweeper {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Start sweeping `session` every `interval`.
    ///
    /// Each tick takes the session lock like any other operation. Ticks while
    /// the game is stopped are no-ops.
    pub fn spawn(session: Arc<GameSession>, interval: Duration) -> std::io::Result<Self> {
        let (shutdown, signal) = mpsc::channel::<()>();
        let handle = std::thread::Builder::new()
            .name("goldrush-sweeper".into())
            .spawn(move || loop {
                match signal.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let evicted = session.sweep();
                        tracing::debug!(evicted, "sweep finished");
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        Ok(Self {
            shutdown: Some(shutdown),
            handle: Some(handle),
        })
    }

    /// Stop the thread and wait for it to exit.
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("sweeper thread panicked");
            }
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}
