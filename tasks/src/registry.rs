//! Handler registry and periodic template registry.
//!
//! Write-once, read-heavy (handlers) and write-heavy (periodic templates),
//! matching the `sync.RWMutex`-guarded maps in the original source —
//! `tokio::sync::RwLock` is the async equivalent.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::TasksError;
use crate::task::Task;

/// User-supplied code mapping a task's params to success or failure.
///
/// Handlers are expected to be short-running: they execute directly on a
/// worker's async task, not in a blocking pool.
pub type TaskHandler =
    Arc<dyn Fn(&HashMap<String, String>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> + Send + Sync>;

/// Maps task name to handler. Exactly one handler per name for the process
/// lifetime.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, TaskHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, name: &str, handler: TaskHandler) -> Result<(), TasksError> {
        let mut handlers = self.handlers.write().await;

        if handlers.contains_key(name) {
            return Err(TasksError::HandlerAlreadyRegistered(name.to_string()));
        }

        handlers.insert(name.to_string(), handler);

        Ok(())
    }

    pub async fn get(&self, name: &str) -> Option<TaskHandler> {
        let handlers = self.handlers.read().await;
        handlers.get(name).cloned()
    }
}

/// Maps task name to periodic template. Mutated in place by the periodic
/// engine on every due tick; never garbage-collected during the process
/// lifetime.
#[derive(Default)]
pub struct PeriodicRegistry {
    templates: RwLock<HashMap<String, Task>>,
}

impl PeriodicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, name: &str, template: Task) -> Result<(), TasksError> {
        let mut templates = self.templates.write().await;

        if templates.contains_key(name) {
            return Err(TasksError::ScheduledAlreadyRegistered(name.to_string()));
        }

        templates.insert(name.to_string(), template);

        Ok(())
    }

    /// Scans every template, advances `time_of_next_exec` by exactly
    /// `period` for those that are due, and returns a snapshot of the due
    /// tasks to republish. Advances once per scan even if a template is
    /// arbitrarily late — see DESIGN.md for why this doesn't "catch up".
    pub async fn due_and_advance(&self, now: DateTime<Utc>) -> Vec<Task> {
        let mut templates = self.templates.write().await;
        let mut due = Vec::new();

        for task in templates.values_mut() {
            let Some(next) = task.time_of_next_exec else { continue };

            if next <= now {
                if let Some(period) = task.period {
                    task.time_of_next_exec = Some(next + period);
                }

                due.push(task.clone());
            }
        }

        due
    }
}
