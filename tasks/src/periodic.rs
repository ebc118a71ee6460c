//! Periodic engine: a fixed-interval tick over [`PeriodicRegistry`],
//! republishing every template whose `time_of_next_exec` has passed.
//!
//! Unlike retry/delayed this isn't a heap-plus-timer engine: the tick
//! granularity is fixed at [`DEFAULT_SCHEDULED_TASK_DURATION`] regardless of
//! any individual template's `period`, matching the original source's single
//! `time.Ticker`.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::constants::DEFAULT_SCHEDULED_TASK_DURATION;
use crate::publish::Publisher;
use crate::registry::PeriodicRegistry;
use crate::task::param_keys;

pub(crate) async fn run(
    registry: Arc<PeriodicRegistry>,
    publisher: Arc<Publisher>,
    cancellation: CancellationToken,
) {
    let mut tick = tokio::time::interval(DEFAULT_SCHEDULED_TASK_DURATION);

    loop {
        tokio::select! {
            _ = cancellation.cancelled() => {
                info!("periodic engine stopping");
                return;
            }

            _ = tick.tick() => {
                let due = registry.due_and_advance(chrono::Utc::now()).await;

                for mut task in due {
                    task.params.insert(param_keys::SCHEDULED.to_string(), param_keys::TRUE_VALUE.to_string());

                    if let Err(err) = publisher.create(&task.name, task.params).await {
                        error!(task = %task.name, error = %err, "periodic dispatch failed");
                    }
                }
            }
        }
    }
}
