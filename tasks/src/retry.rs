//! Retry engine: priority heap of tasks awaiting their next attempt, built on
//! [`heap_engine::run`].
//!
//! A task lands here when a worker's handler call fails and the task is not
//! itself a periodic dispatch (spec invariant: scheduled tasks are never
//! retried — they simply wait for their next tick). Dispatch republishes the
//! task under the same name and params (with `attempts` bumped), exactly
//! like the periodic/delayed engines' "create a fresh immediate task"
//! pattern.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::constants::MIN_TIMER_DURATION;
use crate::heap_engine::{self, Dispatch};
use crate::metrics::Metrics;
use crate::publish::Publisher;
use crate::task::{param_keys, RetryPolicy, Task};

/// Computes the next attempt's fire time and either schedules it onto
/// `retry_tx` or drops it if the channel is saturated or attempts are
/// exhausted. Mirrors `addToRetryQueue` in the original source.
pub(crate) fn enqueue(
    mut task: Task,
    policy: &RetryPolicy,
    retry_tx: &async_channel::Sender<Task>,
    metrics: &Metrics,
) {
    let attempts = task.attempts();

    if policy.maximum_attempts != 0 && attempts >= policy.maximum_attempts {
        warn!(task = %task.name, attempts, "retry attempts exhausted, dropping task");
        metrics.retry_exhausted();
        return;
    }

    let attempts = attempts + 1;
    let backoff = policy.backoff_for_attempt(attempts);
    metrics.observe_backoff(backoff.as_secs_f64());

    task.params.insert(param_keys::ATTEMPTS.to_string(), attempts.to_string());
    task.start_time = chrono::Utc::now() + chrono::Duration::from_std(backoff).unwrap_or_default();

    match retry_tx.try_send(task) {
        Ok(()) => {
            debug!(attempts, backoff_secs = backoff.as_secs_f64(), "task scheduled for retry");
            metrics.retry_enqueued();
        }
        Err(_full_or_closed) => {
            warn!("retry channel saturated, dropping task");
            metrics.retry_dropped();
        }
    }
}

/// Runs the retry engine until `cancellation` fires or `retry_rx` closes.
pub(crate) async fn run(
    retry_rx: async_channel::Receiver<Task>,
    cancellation: CancellationToken,
    publisher: Arc<Publisher>,
    metrics: Arc<Metrics>,
) {
    let dispatch: Dispatch = Arc::new(move |task| {
        let publisher = publisher.clone();
        Box::pin(async move {
            let name = task.name.clone();
            if let Err(err) = publisher.create(&task.name, task.params).await {
                tracing::error!(task = %name, error = %err, "retry republish failed");
            }
        })
    });

    let metrics_for_depth = metrics.clone();
    heap_engine::run(
        "retry",
        retry_rx,
        cancellation,
        MIN_TIMER_DURATION,
        dispatch,
        move |pending| metrics_for_depth.set_retry_heap_depth(pending as i64),
    )
    .await;
}
