//! Worker pool: `num_workers` tasks pulling from the execution channel,
//! invoking the registered handler, and routing failures into the retry
//! engine.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::metrics::{Metrics, Outcome};
use crate::registry::HandlerRegistry;
use crate::retry;
use crate::task::{RetryPolicy, Task};

/// Spawns `num_workers` worker loops and returns their join handles.
pub(crate) fn spawn(
    num_workers: usize,
    execution_rx: async_channel::Receiver<Task>,
    retry_tx: async_channel::Sender<Task>,
    handlers: Arc<HandlerRegistry>,
    retry_policy: RetryPolicy,
    cancellation: CancellationToken,
    metrics: Arc<Metrics>,
) -> Vec<tokio::task::JoinHandle<()>> {
    (0..num_workers)
        .map(|id| {
            tokio::spawn(worker_loop(
                id,
                execution_rx.clone(),
                retry_tx.clone(),
                handlers.clone(),
                retry_policy,
                cancellation.clone(),
                metrics.clone(),
            ))
        })
        .collect()
}

async fn worker_loop(
    id: usize,
    execution_rx: async_channel::Receiver<Task>,
    retry_tx: async_channel::Sender<Task>,
    handlers: Arc<HandlerRegistry>,
    retry_policy: RetryPolicy,
    cancellation: CancellationToken,
    metrics: Arc<Metrics>,
) {
    loop {
        let task = tokio::select! {
            _ = cancellation.cancelled() => {
                debug!(worker = id, "worker stopping");
                return;
            }
            received = execution_rx.recv() => {
                match received {
                    Ok(task) => task,
                    Err(_closed) => {
                        debug!(worker = id, "execution channel closed, worker stopping");
                        return;
                    }
                }
            }
        };

        metrics.set_execution_queue_depth(execution_rx.len() as i64);

        let Some(handler) = handlers.get(&task.name).await else {
            error!(worker = id, task = %task.name, "no handler registered, dropping task");
            metrics.dispatched(Outcome::Failure);
            continue;
        };

        match handler(&task.params) {
            Ok(()) => {
                debug!(worker = id, task = %task.name, "task handled");
                metrics.dispatched(Outcome::Success);
            }
            Err(err) => {
                warn!(worker = id, task = %task.name, error = %err, "handler failed");
                metrics.dispatched(Outcome::Failure);

                if !task.is_scheduled() {
                    retry::enqueue(task, &retry_policy, &retry_tx, &metrics);
                }
            }
        }
    }
}
