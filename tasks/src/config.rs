//! Typed configuration and the builder that assembles a [`crate::Tasks`].
//!
//! The original source configures itself through a list of functional
//! options (`WithContext`, `WithProvider`, `WithNumWorkers`, ...); the
//! idiomatic Rust shape is a builder that validates once, at `build()`,
//! instead of failing lazily on first use.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use transport::Provider;

use crate::error::TasksError;
use crate::metrics::Metrics;
use crate::publish::Publisher;
use crate::receive::ReceiveHandler;
use crate::registry::{HandlerRegistry, PeriodicRegistry};
use crate::task::RetryPolicy;
use crate::Tasks;

fn default_num_workers() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Tunables assembled by [`TasksBuilder`]. Fields mirror the configuration
/// table in the external interface contract.
#[derive(Debug, Clone)]
pub struct TasksConfig {
    pub num_workers: usize,
    pub queue_size: usize,
    pub retry_policy: RetryPolicy,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            num_workers: default_num_workers(),
            queue_size: crate::constants::DEFAULT_QUEUE_SIZE,
            retry_policy: RetryPolicy::default(),
        }
    }
}

/// Builds a [`Tasks`] instance, failing fast on missing required
/// collaborators rather than panicking or erroring lazily at first use.
#[derive(Default)]
pub struct TasksBuilder {
    provider: Option<Arc<dyn Provider>>,
    topic: Option<String>,
    cancellation: Option<CancellationToken>,
    config: TasksConfig,
}

impl TasksBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    pub fn with_num_workers(mut self, num_workers: usize) -> Self {
        self.config.num_workers = num_workers;
        self
    }

    pub fn with_queue_size(mut self, queue_size: usize) -> Self {
        self.config.queue_size = queue_size;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.config.retry_policy = retry_policy;
        self
    }

    /// Validates and assembles the scheduler. Does not register any handler
    /// or start any background task — call [`Tasks::start`] for that.
    pub fn build(self) -> Result<Tasks, TasksError> {
        let provider = self.provider.ok_or(TasksError::UnknownProvider)?;
        let topic = self.topic.ok_or(TasksError::EmptyTopic)?;
        if topic.is_empty() {
            return Err(TasksError::EmptyTopic);
        }
        let cancellation = self.cancellation.ok_or(TasksError::UnknownContext)?;

        provider.register_handler_naming_fn(Arc::new(|_method, _app_name, path| path.to_string()));
        provider.register_default_request_struct();

        let (execution_tx, execution_rx) = async_channel::bounded(self.config.queue_size);
        let (retry_tx, retry_rx) = async_channel::bounded(self.config.queue_size);
        let (delayed_tx, delayed_rx) = async_channel::bounded(self.config.queue_size);

        let metrics = Metrics::new()?;
        let publisher = Arc::new(Publisher::new(provider.clone(), topic.clone()));
        let consumers_active = Arc::new(AtomicBool::new(false));

        let receive_handler = Arc::new(ReceiveHandler::new(execution_tx.clone(), consumers_active.clone()));

        Ok(Tasks {
            provider,
            topic,
            config: self.config,
            cancellation,
            handlers: Arc::new(HandlerRegistry::new()),
            periodic: Arc::new(PeriodicRegistry::new()),
            publisher,
            metrics,
            receive_handler,
            execution_tx,
            execution_rx,
            retry_tx,
            retry_rx,
            delayed_tx,
            delayed_rx,
            consumers_active,
            worker_handles: tokio::sync::Mutex::new(Vec::new()),
            retry_handle: tokio::sync::Mutex::new(None),
            delayed_handle: tokio::sync::Mutex::new(None),
            periodic_handle: tokio::sync::Mutex::new(None),
        })
    }
}
