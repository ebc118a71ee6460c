//! Transport error kinds.
//!
//! Grounded on `vendor/.../framework/errors/pubsub.go`'s sentinel error
//! values, generalized from a flat set of `errors.New` sentinels into a
//! `thiserror` enum.

/// Errors a [`crate::Provider`] or a registered [`crate::Handler`] can
/// produce.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No handler is registered for the requested topic.
    #[error("pub-sub topic wasn't found: {0}")]
    TopicNotFound(String),

    /// A handler is already registered for this topic.
    #[error("pub-sub topic already exists: {0}")]
    TopicAlreadyExists(String),

    /// A message was sent without a topic.
    #[error("pub-sub topic in passed message is undefined")]
    TopicUndefined,

    /// The inbound payload could not be decoded by the handler.
    #[error("message decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The handler asks the provider to leave the message undelivered so it
    /// is redelivered later. Corresponds to the original source's
    /// `ErrKafkaDoNotSkipMessage` sentinel.
    #[error("do not skip this message, redeliver")]
    Redeliver,

    /// Opaque provider-side failure (network, serialization at the provider
    /// boundary, etc).
    #[error("transport send failed: {0}")]
    Send(String),
}
