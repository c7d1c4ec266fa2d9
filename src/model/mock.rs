//! Scripted model for tests and dry runs.
//!
//! Replays a queue of canned replies in order. Once the queue is drained the
//! last reply is repeated, so a model scripted with a single reply answers the
//! same way forever.

use super::ModelClient;
use crate::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// One canned reply.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Return this text.
    Text(String),
    /// Fail with [`Error::Model`] carrying this message.
    Error(String),
}

/// Model double that replays scripted replies and records its prompts.
pub struct ScriptedModel {
    name: String,
    replies: Mutex<VecDeque<ScriptedReply>>,
    last: Mutex<Option<ScriptedReply>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
    latency: Option<Duration>,
}

impl ScriptedModel {
    /// Create a model with an empty script.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            replies: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            latency: None,
        }
    }

    /// Create a model that always answers `text`.
    pub fn always(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name).reply(text)
    }

    /// Queue a text reply (builder).
    #[must_use]
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.replies.lock().push_back(ScriptedReply::Text(text.into()));
        self
    }

    /// Queue a failing reply (builder).
    #[must_use]
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.replies
            .lock()
            .push_back(ScriptedReply::Error(message.into()));
        self
    }

    /// Sleep for `latency` before every reply (builder).
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of `generate` calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far, in call order.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    fn next_reply(&self) -> Option<ScriptedReply> {
        let next = self.replies.lock().pop_front();
        let mut last = self.last.lock();
        if let Some(reply) = next {
            *last = Some(reply);
        }
        last.clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match self.next_reply() {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::Error(message)) => Err(Error::Model(message)),
            None => Err(Error::Model(format!("{} has no scripted reply", self.name))),
        }
    }
}
