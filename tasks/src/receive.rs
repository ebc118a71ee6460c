//! Receive path: the [`transport::Handler`] registered against the
//! scheduler's topic, turning inbound envelopes into entries on the
//! execution channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::error;
use transport::{Envelope, Handler, TransportError};

use crate::task::Task;

/// Decodes an inbound envelope and hands the task to the execution channel.
///
/// Admission is gated by `consumers_active`: while the shutdown coordinator
/// has cleared it, inbound deliveries are left undelivered
/// (`TransportError::Redeliver`) rather than dropped, so the message isn't
/// silently lost if the provider's broker has at-least-once redelivery.
pub(crate) struct ReceiveHandler {
    execution_tx: async_channel::Sender<Task>,
    consumers_active: Arc<AtomicBool>,
}

impl ReceiveHandler {
    pub(crate) fn new(execution_tx: async_channel::Sender<Task>, consumers_active: Arc<AtomicBool>) -> Self {
        Self { execution_tx, consumers_active }
    }
}

#[async_trait]
impl Handler for ReceiveHandler {
    async fn handle(&self, envelope: Envelope) -> Result<(), TransportError> {
        if !self.consumers_active.load(Ordering::SeqCst) {
            return Err(TransportError::Redeliver);
        }

        let task: Task = match serde_json::from_slice(&envelope.payload) {
            Ok(task) => task,
            Err(err) => {
                error!(error = %err, "inbound decode failed, dropping message");
                return Err(err.into());
            }
        };

        self.execution_tx
            .send(task)
            .await
            .map_err(|_closed| TransportError::Send("execution channel closed".to_string()))
    }
}
