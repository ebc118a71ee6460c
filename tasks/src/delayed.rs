//! Delayed engine: one-shot tasks scheduled for a specific future time,
//! built on [`heap_engine::run`].
//!
//! Dispatch strips the `delayed` control flag and republishes through
//! [`Publisher::create`], since a delayed task surfaces to its handler
//! exactly like any freshly created task — the delay is consumed entirely
//! inside this engine.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::constants::MIN_TIMER_DURATION;
use crate::heap_engine::{self, Dispatch};
use crate::metrics::Metrics;
use crate::publish::Publisher;
use crate::task::{param_keys, Task};

/// Runs the delayed engine until `cancellation` fires or `delayed_rx` closes.
pub(crate) async fn run(
    delayed_rx: async_channel::Receiver<Task>,
    cancellation: CancellationToken,
    publisher: Arc<Publisher>,
    metrics: Arc<Metrics>,
) {
    let dispatch: Dispatch = Arc::new(move |mut task| {
        let publisher = publisher.clone();
        Box::pin(async move {
            task.params.remove(param_keys::DELAYED);
            if let Err(err) = publisher.create(&task.name, task.params).await {
                error!(task = %task.name, error = %err, "delayed dispatch failed");
            }
        })
    });

    let metrics_for_depth = metrics.clone();
    heap_engine::run(
        "delayed",
        delayed_rx,
        cancellation,
        MIN_TIMER_DURATION,
        dispatch,
        move |pending| metrics_for_depth.set_delayed_heap_depth(pending as i64),
    )
    .await;
}
