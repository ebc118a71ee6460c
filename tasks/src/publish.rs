//! Publish path: build or forward a [`Task`], serialize it, hand it to the
//! transport.
//!
//! Shared by the public `Tasks::create` and by the retry/delayed engines'
//! dispatch step, which both ultimately "create" a task the same way the
//! original source's engines call back into `t.Create(...)`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use transport::{Envelope, Provider};

use crate::error::TasksError;
use crate::task::Task;

pub(crate) struct Publisher {
    provider: Arc<dyn Provider>,
    topic: String,
}

impl Publisher {
    pub(crate) fn new(provider: Arc<dyn Provider>, topic: String) -> Self {
        Self { provider, topic }
    }

    /// Marshal `task` to JSON and send it on the configured topic.
    pub(crate) async fn publish(&self, task: &Task) -> Result<(), TasksError> {
        let payload = serde_json::to_vec(task)?;
        let envelope = Envelope::new(self.topic.clone(), payload);
        self.provider.send(envelope).await?;
        Ok(())
    }

    /// Build a fresh task with `start_time = now` and publish it. This is
    /// what `Create` does, and what the retry/periodic engines do on
    /// dispatch: they never republish the exact bytes they hold, they build
    /// a new immediate task carrying the same name and params.
    pub(crate) async fn create(&self, name: &str, params: HashMap<String, String>) -> Result<(), TasksError> {
        let task = Task {
            name: name.to_string(),
            params,
            start_time: Utc::now(),
            host: None,
            time_of_next_exec: None,
            period: None,
        };

        self.publish(&task).await
    }
}
