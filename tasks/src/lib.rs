//! Distributed task scheduling core.
//!
//! A [`Tasks`] instance accepts named task submissions (`create`), persists
//! them as JSON on an injected [`transport::Provider`], consumes them back
//! through a receive handler registered on the same topic, and dispatches
//! them to a pool of workers. Three auxiliary engines — retry
//! (exponential-backoff), delayed (fire-at-time) and periodic
//! (interval-scheduled) — feed the same execution pipeline.
//!
//! ```ignore
//! let tasks = Tasks::builder()
//!     .with_provider(provider)
//!     .with_topic("tasks.default")
//!     .with_cancellation(cancellation)
//!     .build()?;
//!
//! tasks.register_handler("send-email", handler).await?;
//! tasks.start().await?;
//! tasks.create("send-email", params).await?;
//! ```

mod config;
mod constants;
mod delayed;
mod error;
mod heap_engine;
mod metrics;
mod periodic;
mod publish;
mod receive;
mod registry;
mod retry;
mod task;
mod worker;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use transport::Provider;

pub use config::{TasksBuilder, TasksConfig};
pub use error::TasksError;
pub use metrics::Metrics;
pub use registry::TaskHandler;
pub use task::{param_keys, RetryPolicy, Task};

use publish::Publisher;
use receive::ReceiveHandler;
use registry::{HandlerRegistry, PeriodicRegistry};

/// The scheduling core. Construct via [`TasksBuilder`] (`Tasks::builder()`).
pub struct Tasks {
    provider: Arc<dyn Provider>,
    topic: String,
    config: TasksConfig,
    cancellation: CancellationToken,

    handlers: Arc<HandlerRegistry>,
    periodic: Arc<PeriodicRegistry>,
    publisher: Arc<Publisher>,
    metrics: Arc<Metrics>,
    receive_handler: Arc<ReceiveHandler>,

    execution_tx: async_channel::Sender<Task>,
    execution_rx: async_channel::Receiver<Task>,
    retry_tx: async_channel::Sender<Task>,
    retry_rx: async_channel::Receiver<Task>,
    delayed_tx: async_channel::Sender<Task>,
    delayed_rx: async_channel::Receiver<Task>,

    consumers_active: Arc<AtomicBool>,

    worker_handles: Mutex<Vec<JoinHandle<()>>>,
    retry_handle: Mutex<Option<JoinHandle<()>>>,
    delayed_handle: Mutex<Option<JoinHandle<()>>>,
    periodic_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Tasks {
    /// Starts building a [`Tasks`] instance. Required: provider, topic,
    /// cancellation token.
    pub fn builder() -> TasksBuilder {
        TasksBuilder::new()
    }

    /// Registers `handler` under `name`. Fails if `name` is already
    /// registered. Safe to call concurrently with task execution.
    pub async fn register_handler(&self, name: &str, handler: TaskHandler) -> Result<(), TasksError> {
        self.handlers.register(name, handler).await
    }

    /// The metrics registry backing this instance's series, for the host
    /// application to scrape or merge into its own.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Builds an immediate task and publishes it on the configured topic.
    /// Does not validate that `name` has a registered handler.
    pub async fn create(&self, name: &str, params: HashMap<String, String>) -> Result<(), TasksError> {
        self.publisher.create(name, params).await
    }

    /// Registers a periodic template. `time_of_next_exec = start_at +
    /// period`. Fails with [`TasksError::ScheduledAlreadyRegistered`] if
    /// `name` is already registered. Does not publish immediately.
    pub async fn create_scheduled(
        &self,
        name: &str,
        mut params: HashMap<String, String>,
        start_at: DateTime<Utc>,
        period: ChronoDuration,
    ) -> Result<(), TasksError> {
        params.insert(param_keys::SCHEDULED.to_string(), param_keys::TRUE_VALUE.to_string());

        let template = Task {
            name: name.to_string(),
            params,
            start_time: start_at,
            host: None,
            time_of_next_exec: Some(start_at + period),
            period: Some(period),
        };

        self.periodic.register(name, template).await
    }

    /// Enqueues a one-shot task onto the delayed engine, to be published at
    /// `fire_at`. Fails with [`TasksError::CreateDelayedError`] if `fire_at`
    /// is not strictly after now.
    pub async fn create_delayed(
        &self,
        host: Option<String>,
        name: &str,
        mut params: HashMap<String, String>,
        fire_at: DateTime<Utc>,
    ) -> Result<(), TasksError> {
        if fire_at <= Utc::now() {
            return Err(TasksError::CreateDelayedError);
        }

        params.insert(param_keys::DELAYED.to_string(), param_keys::TRUE_VALUE.to_string());

        let task = Task {
            name: name.to_string(),
            params,
            start_time: fire_at,
            host,
            time_of_next_exec: None,
            period: None,
        };

        self.delayed_tx
            .send(task)
            .await
            .map_err(|_closed| TasksError::Transport(transport::TransportError::Send(
                "delayed channel closed".to_string(),
            )))
    }

    /// Registers the receive handler, spawns the worker pool and the three
    /// engines, and opens admission. Behavior on double-`start` is
    /// undefined, matching the original contract.
    pub async fn start(&self) -> Result<(), TasksError> {
        self.provider
            .register_handler("", &self.topic, self.receive_handler.clone())?;

        let worker_handles = worker::spawn(
            self.config.num_workers,
            self.execution_rx.clone(),
            self.retry_tx.clone(),
            self.handlers.clone(),
            self.config.retry_policy,
            self.cancellation.clone(),
            self.metrics.clone(),
        );
        *self.worker_handles.lock().await = worker_handles;

        let retry_handle = tokio::spawn(retry::run(
            self.retry_rx.clone(),
            self.cancellation.clone(),
            self.publisher.clone(),
            self.metrics.clone(),
        ));
        *self.retry_handle.lock().await = Some(retry_handle);

        let delayed_handle = tokio::spawn(delayed::run(
            self.delayed_rx.clone(),
            self.cancellation.clone(),
            self.publisher.clone(),
            self.metrics.clone(),
        ));
        *self.delayed_handle.lock().await = Some(delayed_handle);

        let periodic_handle = tokio::spawn(periodic::run(
            self.periodic.clone(),
            self.publisher.clone(),
            self.cancellation.clone(),
        ));
        *self.periodic_handle.lock().await = Some(periodic_handle);

        self.consumers_active.store(true, Ordering::SeqCst);
        info!(topic = %self.topic, workers = self.config.num_workers, "tasks scheduler started");

        Ok(())
    }

    /// Ordered drain: disable admission, wait for the execution channel to
    /// empty, close it and await the workers, then close the retry input
    /// channel and await the retry engine. The delayed and periodic engines
    /// are left running — they exit via the cancellation token, which this
    /// method does not trigger; the caller cancels it separately once the
    /// transport itself is being shut down.
    pub async fn stop(&self) {
        self.consumers_active.store(false, Ordering::SeqCst);
        info!("tasks scheduler stopping: admission disabled");

        loop {
            if self.cancellation.is_cancelled() {
                warn!("shutdown aborted: cancellation fired during drain wait");
                break;
            }

            let pending = self.execution_rx.len();
            if pending == 0 {
                break;
            }

            info!(pending, "waiting for execution channel to drain");
            tokio::time::sleep(constants::DRAIN_POLL_INTERVAL).await;
        }

        self.execution_tx.close();
        let mut worker_handles = self.worker_handles.lock().await;
        for handle in worker_handles.drain(..) {
            let _ = handle.await;
        }
        drop(worker_handles);

        self.retry_tx.close();
        if let Some(handle) = self.retry_handle.lock().await.take() {
            let _ = handle.await;
        }

        info!("tasks scheduler stopped");
    }
}
