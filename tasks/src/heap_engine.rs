//! Shared priority-heap-plus-single-timer engine used by both the retry and
//! delayed engines (spec: "Both engines implement the same pattern").
//!
//! State: a min-heap over `fire_at`, a single re-armable timer, and an input
//! channel carrying newly enqueued tasks. The timer's deadline is always
//! `heap.top().fire_at` when the heap is non-empty, or disarmed when it's
//! empty — every mutation path below re-asserts that invariant.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::task::Task;

/// A heap-mutating dispatch callback. Boxed because `tokio::select!` arms
/// need a concrete future type and the two engines dispatch differently
/// (retry republishes params as-is, delayed strips the `delayed` flag
/// first).
pub(crate) type Dispatch = Arc<dyn Fn(Task) -> BoxFuture<'static, ()> + Send + Sync>;

struct HeapEntry {
    fire_at: DateTime<Utc>,
    task: Task,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the earliest fire_at on top.
        other.fire_at.cmp(&self.fire_at)
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at
    }
}

impl Eq for HeapEntry {}

/// Runs the heap engine until cancellation or input-channel closure.
/// `on_pending` is called after every mutation with the current heap depth,
/// for metrics.
pub(crate) async fn run(
    label: &'static str,
    input_rx: async_channel::Receiver<Task>,
    cancellation: CancellationToken,
    min_timer: Duration,
    dispatch: Dispatch,
    on_pending: impl Fn(usize) + Send + Sync + 'static,
) {
    let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::new();
    // Ticked manually via reset(); the interval is a placeholder deadline
    // until the first task arrives.
    let far_future = Instant::now() + Duration::from_secs(60 * 60 * 24 * 365);
    let mut timer = interval_at(far_future, Duration::from_secs(60 * 60 * 24 * 365));
    let mut armed = false;

    loop {
        tokio::select! {
            _ = cancellation.cancelled() => {
                info!(engine = label, pending = heap.len(), "engine stopping: cancellation");
                return;
            }

            _ = timer.tick(), if armed => {
                let now = Utc::now();

                while matches!(heap.peek(), Some(top) if top.fire_at <= now) {
                    let entry = heap.pop().expect("peek just confirmed an element");
                    dispatch(entry.task).await;
                }

                on_pending(heap.len());
                armed = rearm(&mut timer, &heap, min_timer);
            }

            received = input_rx.recv() => {
                match received {
                    Ok(task) => {
                        heap.push(HeapEntry { fire_at: task.start_time, task });
                        on_pending(heap.len());
                        armed = rearm(&mut timer, &heap, min_timer);
                    }
                    Err(_closed) => {
                        while let Some(entry) = heap.pop() {
                            dispatch(entry.task).await;
                        }
                        on_pending(0);
                        info!(engine = label, "engine drained and stopped");
                        return;
                    }
                }
            }
        }
    }
}

fn rearm(timer: &mut tokio::time::Interval, heap: &BinaryHeap<HeapEntry>, min_timer: Duration) -> bool {
    let Some(top) = heap.peek() else { return false };

    let now = Utc::now();
    let mut delay = (top.fire_at - now).to_std().unwrap_or(Duration::ZERO);
    if delay < min_timer {
        delay = min_timer;
    }

    timer.reset_at(Instant::now() + delay);
    true
}
