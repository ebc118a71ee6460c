//! Error kinds surfaced by the scheduling core.
//!
//! Mirrors the taxonomy in `errors.go`: configuration errors fail
//! construction synchronously, registration errors are returned to the
//! caller, and publish/transport errors wrap their source.

use transport::TransportError;

/// Errors the scheduler can return from its public API.
#[derive(Debug, thiserror::Error)]
pub enum TasksError {
    /// `TasksBuilder::build` was called without a provider.
    #[error("initialization: unknown provider")]
    UnknownProvider,

    /// `TasksBuilder::build` was called with an empty topic.
    #[error("initialization: empty topic")]
    EmptyTopic,

    /// `TasksBuilder::build` was called without a cancellation token.
    #[error("initialization: unknown context")]
    UnknownContext,

    /// `register_handler` was called twice for the same task name.
    #[error("RegisterHandler method: task name already registered: {0}")]
    HandlerAlreadyRegistered(String),

    /// `create_scheduled` was called twice for the same task name.
    #[error("CreateScheduled method: task name already registered: {0}")]
    ScheduledAlreadyRegistered(String),

    /// `create_delayed` was called with a `fire_at` that has already passed.
    #[error("CreateDelayed method: fire_at must be after now")]
    CreateDelayedError,

    /// Task serialization failed.
    #[error("Create method: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The transport rejected a publish or the execution/delayed/retry
    /// channel was closed.
    #[error("Create method: {0}")]
    Transport(#[from] TransportError),

    /// Metrics registry setup failed.
    #[error("metrics: {0}")]
    Metrics(#[from] prometheus::Error),
}
