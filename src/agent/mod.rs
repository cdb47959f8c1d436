//! Agent runtime - interprets a natural-language task with a model and tools.
//!
//! The orchestrator only sees [`AgentRuntime`]: prompt and model in, final
//! text out. [`ToolAgent`] is the production implementation.

mod executor;

pub use executor::ToolAgent;

use async_trait::async_trait;

use crate::config::ModelSettings;

/// Runs one full attempt of a task against one model.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Run `prompt` with `model` and return the model's final text.
    ///
    /// # Errors
    /// Returns `Err` when the attempt is aborted by a transport failure
    /// (inference API, tool server pipe, download); model-level failures are
    /// reported in the returned text instead.
    async fn run(&self, prompt: &str, model: &str, settings: &ModelSettings) -> anyhow::Result<String>;
}
