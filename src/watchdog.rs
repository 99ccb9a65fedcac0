//! Process-supervisor liveness signaling.
//!
//! Some deployments run the replayer under a supervisor that expects a
//! periodic liveness signal (e.g. a watchdog ping once per processed batch).
//! The engine only knows the interface; the real implementation is selected
//! at process startup, never inside the engine. Absence of a supervisor is
//! the default and must not cause an error.

/// A liveness sink notified once per processed batch.
pub trait Watchdog: Send + Sync + 'static {
    /// Signal that the engine is alive and has just finished a batch.
    fn notify(&self);
}

/// Default watchdog: no supervisor registered, signaling is a no-op.
#[derive(Debug, Clone, Default)]
pub struct NoOpWatchdog;

impl Watchdog for NoOpWatchdog {
    fn notify(&self) {
        tracing::trace!("no supervisor registered, liveness signal dropped");
    }
}
