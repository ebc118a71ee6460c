//! In-process reference [`Provider`] implementation.
//!
//! Grounded on `mocks/provider.go`'s `MockProvider`: routes `send` straight
//! into whatever handler is registered for the envelope's topic, with no
//! network hop. Good enough to drive the scheduler end-to-end in tests and
//! examples; a production deployment swaps this for a real broker-backed
//! `Provider`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::debug;

use crate::envelope::Envelope;
use crate::error::TransportError;
use crate::provider::{Handler, Provider};

/// A [`Provider`] that delivers directly to in-process handlers.
#[derive(Default)]
pub struct InMemoryProvider {
    handlers: RwLock<HashMap<String, Arc<dyn Handler>>>,
}

impl InMemoryProvider {
    /// Create an empty provider with no registered topics.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Provider for InMemoryProvider {
    fn register_handler(
        &self,
        _method: &str,
        path: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<(), TransportError> {
        let mut handlers = self.handlers.write().expect("handler registry poisoned");
        handlers.insert(path.to_string(), handler);
        debug!(topic = path, "registered handler");
        Ok(())
    }

    async fn send(&self, envelope: Envelope) -> Result<(), TransportError> {
        if envelope.path.is_empty() {
            return Err(TransportError::TopicUndefined);
        }

        let handler = {
            let handlers = self.handlers.read().expect("handler registry poisoned");
            handlers.get(&envelope.path).cloned()
        };

        let handler = handler.ok_or_else(|| TransportError::TopicNotFound(envelope.path.clone()))?;

        handler.handle(envelope).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Handler for CountingHandler {
        async fn handle(&self, _envelope: Envelope) -> Result<(), TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn delivers_to_registered_handler() {
        let provider = InMemoryProvider::new();
        let calls = Arc::new(AtomicUsize::new(0));
        provider
            .register_handler("", "topic.a", Arc::new(CountingHandler { calls: calls.clone() }))
            .unwrap();

        provider.send(Envelope::new("topic.a", b"{}".to_vec())).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_topic_errors() {
        let provider = InMemoryProvider::new();
        let err = provider
            .send(Envelope::new("nobody-home", b"{}".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::TopicNotFound(_)));
    }

    #[tokio::test]
    async fn empty_topic_errors() {
        let provider = InMemoryProvider::new();
        let err = provider.send(Envelope::new("", b"{}".to_vec())).await.unwrap_err();
        assert!(matches!(err, TransportError::TopicUndefined));
    }
}
