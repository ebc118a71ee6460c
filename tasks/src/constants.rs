//! Tunables that are deliberately not configuration options — the original
//! source hard-codes these, and so do we.

use std::time::Duration;

/// Default capacity of the execution channel and the retry/delayed input
/// channels.
pub(crate) const DEFAULT_QUEUE_SIZE: usize = 100;

/// Fixed tick interval for the periodic engine, regardless of any
/// individual task's `period`. A `period` shorter than this degrades to this
/// granularity — documented, not a bug.
pub(crate) const DEFAULT_SCHEDULED_TASK_DURATION: Duration = Duration::from_secs(5);

/// Floor on how soon the retry/delayed engines' timer may be rearmed, to
/// avoid a tight re-arm loop when a fire time is in the past or clocks
/// drift.
pub(crate) const MIN_TIMER_DURATION: Duration = Duration::from_millis(100);

/// How often the shutdown coordinator polls the execution channel while
/// draining.
pub(crate) const DRAIN_POLL_INTERVAL: Duration = Duration::from_secs(1);
