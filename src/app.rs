//! Wires config, browser session, tools, agent and orchestrator together.

use std::sync::Arc;

use anyhow::Context;

use crate::agent::ToolAgent;
use crate::config::Config;
use crate::llm::{LlmClient, OpenRouterClient};
use crate::mcp::McpClient;
use crate::orchestrator::{Orchestrator, RunOutcome};
use crate::task::{TaskScript, SYSTEM_PROMPT};
use crate::tools::ToolRegistry;

/// Start the browser session, run every attempt inside it, then stop it.
///
/// The session is shut down whether the attempts ran or setup failed.
pub async fn run(config: &Config) -> anyhow::Result<RunOutcome> {
    let session = Arc::new(
        McpClient::spawn_stdio(&config.browser)
            .await
            .context("starting browser tool server")?,
    );
    let llm: Arc<dyn LlmClient> = Arc::new(OpenRouterClient::new(
        config.api_key.clone(),
        &config.base_url,
    ));

    let result = run_in_session(config, llm, Arc::clone(&session)).await;
    session.shutdown().await;
    result
}

/// Everything that happens while the browser session is open.
pub async fn run_in_session(
    config: &Config,
    llm: Arc<dyn LlmClient>,
    session: Arc<McpClient>,
) -> anyhow::Result<RunOutcome> {
    session
        .initialize()
        .await
        .context("initializing browser tool server")?;

    let mut tools = ToolRegistry::with_local_tools(&config.downloads_dir);
    tools
        .register_mcp_tools(session)
        .await
        .context("listing browser tools")?;

    let agent = ToolAgent::new(llm, Arc::new(tools), SYSTEM_PROMPT, config.max_iterations);
    let prompt = TaskScript::new(&config.credentials).render();

    Ok(Orchestrator::new(&agent, config).run(&prompt).await)
}
