//! Model collaborators.
//!
//! A model receives the verification prompt and answers with raw text that
//! should contain a JSON object, possibly inside a fenced code block. Two
//! instances are used per verification: [`ModelRole::Primary`] and
//! [`ModelRole::Secondary`].
//!
//! - [`GeminiClient`] talks to the Gemini `generateContent` REST endpoint.
//! - [`ScriptedModel`] replays canned answers for tests and dry runs.

mod gemini;
mod mock;

pub use gemini::GeminiClient;
pub use mock::{ScriptedModel, ScriptedReply};

use crate::error::Result;
use async_trait::async_trait;
use std::fmt;

/// Position of a model in the dual-model protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelRole {
    /// First model; wins ties.
    Primary,
    /// Second model.
    Secondary,
}

impl fmt::Display for ModelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Secondary => f.write_str("secondary"),
        }
    }
}

/// A language model that turns a prompt into raw response text.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Model name used in logs.
    fn name(&self) -> &str;

    /// Send `prompt` and return the model's raw text answer.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an unusable response.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
