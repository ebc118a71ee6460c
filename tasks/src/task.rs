//! The on-the-wire task and the retry policy that governs its backoff.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};

/// Reserved keys in [`Task::params`]. User code should avoid these names.
pub mod param_keys {
    /// Decimal retry attempt counter.
    pub const ATTEMPTS: &str = "attempts";
    /// Marks a task as having originated from the periodic engine.
    pub const SCHEDULED: &str = "scheduled";
    /// Marks a task as having originated from the delayed engine.
    pub const DELAYED: &str = "delayed";
    /// The only value any of the flags above are ever set to.
    pub const TRUE_VALUE: &str = "true";
}

/// The unit of work that round-trips through the transport.
///
/// `time_of_next_exec` and `period` are only meaningful for periodic
/// templates and never leave the process, hence `#[serde(skip)]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Identifies the handler this task is dispatched to.
    pub name: String,
    /// Control + user data. By convention carries `attempts`, `scheduled`,
    /// `delayed`.
    #[serde(default)]
    pub params: HashMap<String, String>,
    /// Creation time for immediate tasks, fire-at time for retries and
    /// delayed tasks.
    pub start_time: DateTime<Utc>,
    /// Optional origin label.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub host: Option<String>,
    /// Next due time for a periodic template. Never serialized.
    #[serde(skip)]
    pub time_of_next_exec: Option<DateTime<Utc>>,
    /// Tick interval for a periodic template. Never serialized.
    #[serde(skip)]
    pub period: Option<ChronoDuration>,
}

impl Task {
    /// `true` if this task was emitted by the periodic engine.
    pub fn is_scheduled(&self) -> bool {
        self.params.get(param_keys::SCHEDULED).map(String::as_str) == Some(param_keys::TRUE_VALUE)
    }

    /// `true` if this task was emitted by the delayed engine.
    pub fn is_delayed(&self) -> bool {
        self.params.get(param_keys::DELAYED).map(String::as_str) == Some(param_keys::TRUE_VALUE)
    }

    /// The retry attempt counter carried in `params`, `0` if absent or
    /// unparseable.
    pub fn attempts(&self) -> u32 {
        self.params
            .get(param_keys::ATTEMPTS)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(0)
    }
}

/// Retry backoff policy.
///
/// Matches the defaults in the scheduler's configuration table: a first
/// retry after one second, doubling each attempt, capped at 300x the initial
/// interval, with no attempt limit unless one is configured.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub initial_interval: Duration,
    /// Multiplier applied per attempt. `1.0` yields a constant delay.
    pub backoff_coefficient: f64,
    /// Upper bound on the computed delay.
    pub maximum_interval: Duration,
    /// `0` means unlimited attempts.
    pub maximum_attempts: u32,
}

const DEFAULT_MAX_INTERVAL_MULTIPLIER: u32 = 300;

impl Default for RetryPolicy {
    fn default() -> Self {
        let initial_interval = Duration::from_secs(1);

        Self {
            initial_interval,
            backoff_coefficient: 2.0,
            maximum_interval: initial_interval * DEFAULT_MAX_INTERVAL_MULTIPLIER,
            maximum_attempts: 0,
        }
    }
}

impl RetryPolicy {
    /// Computes the backoff before the `attempts`-th retry (1-indexed):
    /// `min(initial * coefficient^(attempts-1), maximum)`.
    pub fn backoff_for_attempt(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1) as i32;
        let backoff = self.initial_interval.as_secs_f64() * self.backoff_coefficient.powi(exponent);
        let capped = backoff.min(self.maximum_interval.as_secs_f64()).max(0.0);
        Duration::from_secs_f64(capped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially_then_caps() {
        let policy = RetryPolicy {
            initial_interval: Duration::from_millis(100),
            backoff_coefficient: 2.0,
            maximum_interval: Duration::from_millis(450),
            maximum_attempts: 0,
        };

        assert_eq!(policy.backoff_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for_attempt(3), Duration::from_millis(400));
        // attempt 4 would be 800ms uncapped, clamped to the 450ms ceiling.
        assert_eq!(policy.backoff_for_attempt(4), Duration::from_millis(450));
    }

    #[test]
    fn constant_backoff_when_coefficient_is_one() {
        let policy = RetryPolicy {
            initial_interval: Duration::from_millis(50),
            backoff_coefficient: 1.0,
            maximum_interval: Duration::from_secs(10),
            maximum_attempts: 0,
        };

        assert_eq!(policy.backoff_for_attempt(1), Duration::from_millis(50));
        assert_eq!(policy.backoff_for_attempt(5), Duration::from_millis(50));
    }

    #[test]
    fn control_flags_round_trip() {
        let mut task = Task {
            name: "t".to_string(),
            params: HashMap::new(),
            start_time: Utc::now(),
            host: None,
            time_of_next_exec: None,
            period: None,
        };

        assert!(!task.is_scheduled());
        assert!(!task.is_delayed());
        assert_eq!(task.attempts(), 0);

        task.params.insert(param_keys::SCHEDULED.to_string(), param_keys::TRUE_VALUE.to_string());
        task.params.insert(param_keys::ATTEMPTS.to_string(), "3".to_string());

        assert!(task.is_scheduled());
        assert_eq!(task.attempts(), 3);
    }
}
