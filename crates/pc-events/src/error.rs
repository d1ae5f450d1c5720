//! Dispatcher errors
//!
//! `on`/`one`/`off`/`trigger` never fail; malformed calls are no-ops. The
//! only errors are around creating the per-thread instance.

/// Event dispatcher error
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("Event handler already initialized on this thread")]
    AlreadyInitialized,

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}
