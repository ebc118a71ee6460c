//! The `Provider` contract the scheduling core consumes.
//!
//! This is the Rust shape of `communication.Provider` in the vendored
//! framework: an opaque bidirectional message client keyed by topic. The
//! core never depends on a concrete broker SDK, only on this trait, so a
//! Kafka/NATS/SQS-backed implementation can be dropped in without touching
//! `tasks`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::envelope::Envelope;
use crate::error::TransportError;

/// Receives deliveries for a topic a [`Provider`] has registered a handler
/// for.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handle one inbound envelope. Returning `Err(TransportError::Redeliver)`
    /// tells the provider to leave the message undelivered; any other `Err`
    /// is treated as a decode/processing failure and the message is
    /// considered handled (acknowledged, not redelivered).
    async fn handle(&self, envelope: Envelope) -> Result<(), TransportError>;
}

/// Naming function used to derive a provider-specific queue/subscription name
/// from an application name, method and path. Most pub/sub providers ignore
/// the method and application name and use the path verbatim.
pub type HandlerNamingFn = Arc<dyn Fn(&str, &str, &str) -> String + Send + Sync>;

/// A bidirectional pub/sub transport keyed by topic.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Bind `handler` to deliveries on `path`. Some providers ignore
    /// `method` entirely (message queues have no verb).
    fn register_handler(
        &self,
        method: &str,
        path: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<(), TransportError>;

    /// Publish `envelope` on its topic. Synchronous from the caller's point
    /// of view: resolves once the provider has accepted the message.
    async fn send(&self, envelope: Envelope) -> Result<(), TransportError>;

    /// Registers a custom queue-naming function. A no-op for providers that
    /// don't need one; kept so the core's initialization sequence matches
    /// the original source's unconditional call.
    fn register_handler_naming_fn(&self, _f: HandlerNamingFn) {}

    /// Registers the default request/envelope shape the provider should use
    /// when none is supplied per-call. A no-op in this workspace, which has
    /// only one envelope shape ([`Envelope`]); kept for contract parity.
    fn register_default_request_struct(&self) {}
}
