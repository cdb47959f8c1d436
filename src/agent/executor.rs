//! Tool-calling agent loop.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::AgentRuntime;
use crate::config::ModelSettings;
use crate::llm::{ChatMessage, ChatOptions, LlmClient, Role, ToolCall};
use crate::tools::{InvalidArguments, ToolRegistry};

/// Agent that executes a task using tools.
///
/// # Algorithm
/// 1. Send the system prompt and the task
/// 2. If the model requests tool calls: execute them one by one, in order,
///    and feed every result back
/// 3. Repeat until the model answers without tool calls or the iteration
///    limit is hit
pub struct ToolAgent {
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
    system_prompt: String,
    max_iterations: usize,
}

impl ToolAgent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: Arc<ToolRegistry>,
        system_prompt: impl Into<String>,
        max_iterations: usize,
    ) -> Self {
        Self {
            llm,
            tools,
            system_prompt: system_prompt.into(),
            max_iterations,
        }
    }

    /// Execute a single tool call.
    ///
    /// Unknown tools and bad arguments are reported to the model as the
    /// tool's output; any other tool failure aborts the run.
    async fn execute_tool_call(&self, tool_call: &ToolCall) -> anyhow::Result<String> {
        let name = tool_call.function.name.as_str();

        if !self.tools.has_tool(name) {
            let available = self
                .tools
                .list_tools()
                .into_iter()
                .map(|t| t.name)
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(tool = name, "Model requested an unknown tool");
            return Ok(format!(
                "Error: Unknown tool '{}'. Available tools: {}",
                name, available
            ));
        }

        let raw = tool_call.function.arguments.trim();
        let args: Value = if raw.is_empty() {
            Value::Object(Default::default())
        } else {
            match serde_json::from_str(raw) {
                Ok(args) => args,
                Err(e) => {
                    return Ok(format!("Error: arguments are not valid JSON: {}", e));
                }
            }
        };

        tracing::info!(tool = name, "Calling tool");
        tracing::debug!(tool = name, args = %args, "Tool arguments");

        match self.tools.execute(name, args).await {
            Ok(output) => Ok(output),
            Err(e) => match e.downcast_ref::<InvalidArguments>() {
                Some(invalid) => Ok(format!("Error: {}", invalid)),
                None => {
                    tracing::error!(tool = name, "Tool failed, aborting attempt: {:#}", e);
                    Err(e.context(format!("tool '{}' failed", name)))
                }
            },
        }
    }
}

#[async_trait]
impl AgentRuntime for ToolAgent {
    async fn run(&self, prompt: &str, model: &str, settings: &ModelSettings) -> anyhow::Result<String> {
        let mut messages = vec![
            ChatMessage::new(Role::System, self.system_prompt.as_str()),
            ChatMessage::new(Role::User, prompt),
        ];
        let tool_schemas = self.tools.get_tool_schemas();
        let options = ChatOptions::from(settings);
        let mut tool_calls_made = 0usize;

        for iteration in 0..self.max_iterations {
            tracing::debug!(iteration = iteration + 1, model, "Agent iteration");

            let response = self
                .llm
                .chat_completion_with_options(model, &messages, Some(tool_schemas.as_slice()), options.clone())
                .await?;

            if let Some(tool_calls) = response.tool_calls.filter(|calls| !calls.is_empty()) {
                messages.push(ChatMessage::assistant_tool_calls(
                    response.content,
                    tool_calls.clone(),
                ));

                for tool_call in &tool_calls {
                    let result = self.execute_tool_call(tool_call).await?;
                    tool_calls_made += 1;
                    messages.push(ChatMessage::tool_result(tool_call.id.as_str(), result));
                }
                continue;
            }

            tracing::info!(
                iterations = iteration + 1,
                tool_calls = tool_calls_made,
                "Agent finished"
            );
            return Ok(response
                .content
                .unwrap_or_else(|| "LLM returned empty response".to_string()));
        }

        tracing::warn!(limit = self.max_iterations, "Agent hit iteration limit");
        Ok(format!("Max iterations ({}) reached", self.max_iterations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatResponse, FunctionCall, ToolDefinition};
    use crate::tools::Tool;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses and records every request it receives.
    struct ScriptedLlm {
        responses: Mutex<VecDeque<ChatResponse>>,
        requests: Mutex<Vec<(String, Vec<ChatMessage>, ChatOptions)>>,
    }

    impl ScriptedLlm {
        fn new(responses: Vec<ChatResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn chat_completion(
            &self,
            model: &str,
            messages: &[ChatMessage],
            tools: Option<&[ToolDefinition]>,
        ) -> anyhow::Result<ChatResponse> {
            self.chat_completion_with_options(model, messages, tools, ChatOptions::default())
                .await
        }

        async fn chat_completion_with_options(
            &self,
            model: &str,
            messages: &[ChatMessage],
            _tools: Option<&[ToolDefinition]>,
            options: ChatOptions,
        ) -> anyhow::Result<ChatResponse> {
            self.requests
                .lock()
                .unwrap()
                .push((model.to_string(), messages.to_vec(), options));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("script exhausted"))
        }
    }

    /// Records the order in which it was called.
    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl Tool for Recorder {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "records calls"
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, args: Value) -> anyhow::Result<String> {
            self.log.lock().unwrap().push(format!("{} {}", self.name, args));
            if self.fail {
                anyhow::bail!("connection reset");
            }
            if args.get("bad").is_some() {
                return Err(InvalidArguments::new(self.name, "unexpected 'bad'").into());
            }
            Ok(format!("{} ok", self.name))
        }
    }

    fn call(id: &str, name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }
    }

    fn tool_turn(calls: Vec<ToolCall>) -> ChatResponse {
        ChatResponse {
            tool_calls: Some(calls),
            finish_reason: Some("tool_calls".to_string()),
            ..Default::default()
        }
    }

    fn final_turn(text: &str) -> ChatResponse {
        ChatResponse {
            content: Some(text.to_string()),
            finish_reason: Some("stop".to_string()),
            ..Default::default()
        }
    }

    fn registry(log: &Arc<Mutex<Vec<String>>>, failing: &'static str) -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::empty();
        for name in ["browser_click", "download_file"] {
            registry.register(Arc::new(Recorder {
                name,
                log: Arc::clone(log),
                fail: name == failing,
            }));
        }
        Arc::new(registry)
    }

    #[tokio::test]
    async fn executes_tool_calls_in_order_and_returns_final_text() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let llm = ScriptedLlm::new(vec![
            tool_turn(vec![
                call("c1", "browser_click", r##"{"selector":"#a"}"##),
                call("c2", "browser_click", r##"{"selector":"#b"}"##),
            ]),
            tool_turn(vec![call("c3", "download_file", "")]),
            final_turn("Listo! Ya descargue los PDFs!"),
        ]);
        let agent = ToolAgent::new(llm.clone(), registry(&log, ""), "system", 10);

        let output = agent
            .run("task", "meta-llama/llama-4-scout", &ModelSettings::deterministic())
            .await
            .unwrap();

        assert_eq!(output, "Listo! Ya descargue los PDFs!");
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                r##"browser_click {"selector":"#a"}"##.to_string(),
                r##"browser_click {"selector":"#b"}"##.to_string(),
                "download_file {}".to_string(),
            ]
        );

        let requests = llm.requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        let (model, messages, options) = &requests[2];
        assert_eq!(model, "meta-llama/llama-4-scout");
        assert_eq!(options.parallel_tool_calls, Some(false));
        // system, user, assistant(2 calls), tool, tool, assistant(1 call), tool
        assert_eq!(messages.len(), 7);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[3].tool_call_id.as_deref(), Some("c1"));
        assert_eq!(messages[6].content.as_deref(), Some("download_file ok"));
    }

    #[tokio::test]
    async fn unknown_tools_and_bad_arguments_are_fed_back() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let llm = ScriptedLlm::new(vec![
            tool_turn(vec![
                call("c1", "browser_type", "{}"),
                call("c2", "browser_click", "{not json"),
                call("c3", "browser_click", r#"{"bad":1}"#),
            ]),
            final_turn("No pude iniciar sesión"),
        ]);
        let agent = ToolAgent::new(llm.clone(), registry(&log, ""), "system", 10);

        let output = agent.run("task", "m", &ModelSettings::default()).await.unwrap();
        assert_eq!(output, "No pude iniciar sesión");

        let requests = llm.requests.lock().unwrap();
        let messages = &requests[1].1;
        let unknown = messages[3].content.as_deref().unwrap();
        assert!(unknown.starts_with("Error: Unknown tool 'browser_type'"));
        assert!(unknown.contains("browser_click, download_file"));
        assert!(messages[4]
            .content
            .as_deref()
            .unwrap()
            .starts_with("Error: arguments are not valid JSON"));
        assert_eq!(
            messages[5].content.as_deref(),
            Some("Error: Invalid arguments for browser_click: unexpected 'bad'")
        );
    }

    #[tokio::test]
    async fn tool_failure_aborts_the_run() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let llm = ScriptedLlm::new(vec![
            tool_turn(vec![
                call("c1", "download_file", r#"{"url":"https://x"}"#),
                call("c2", "browser_click", "{}"),
            ]),
            final_turn("unreachable"),
        ]);
        let agent = ToolAgent::new(llm.clone(), registry(&log, "download_file"), "system", 10);

        let err = agent.run("task", "m", &ModelSettings::default()).await.unwrap_err();
        assert!(format!("{:#}", err).contains("tool 'download_file' failed: connection reset"));
        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(llm.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn browser_server_rejections_do_not_abort_the_run() {
        use crate::mcp::testing::fake_server;
        use crate::mcp::McpToolDescriptor;
        use crate::tools::McpToolProxy;

        let session = Arc::new(fake_server());
        let mut registry = ToolRegistry::empty();
        registry.register(Arc::new(McpToolProxy::new(
            session,
            McpToolDescriptor {
                name: "browser_type".to_string(),
                description: "Type text".to_string(),
                input_schema: json!({"type": "object"}),
            },
        )));
        let llm = ScriptedLlm::new(vec![
            tool_turn(vec![call("c1", "browser_type", r#"{"text":"1036654321"}"#)]),
            final_turn("Listo! Ya descargue los PDFs!"),
        ]);
        let agent = ToolAgent::new(llm.clone(), Arc::new(registry), "system", 10);

        let output = agent.run("task", "m", &ModelSettings::default()).await.unwrap();
        assert_eq!(output, "Listo! Ya descargue los PDFs!");

        let requests = llm.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[1].1[3].content.as_deref(),
            Some("Error: JSON-RPC error -32602: Unknown tool: browser_type")
        );
    }

    #[tokio::test]
    async fn stops_at_iteration_limit() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let llm = ScriptedLlm::new(vec![
            tool_turn(vec![call("c1", "browser_click", "{}")]),
            tool_turn(vec![call("c2", "browser_click", "{}")]),
            tool_turn(vec![call("c3", "browser_click", "{}")]),
        ]);
        let agent = ToolAgent::new(llm, registry(&log, ""), "system", 2);

        let output = agent.run("task", "m", &ModelSettings::default()).await.unwrap();
        assert_eq!(output, "Max iterations (2) reached");
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn empty_final_response_is_reported() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let llm = ScriptedLlm::new(vec![ChatResponse::default()]);
        let agent = ToolAgent::new(llm, registry(&log, ""), "system", 5);

        let output = agent.run("task", "m", &ModelSettings::default()).await.unwrap();
        assert_eq!(output, "LLM returned empty response");
    }

    #[tokio::test]
    async fn llm_errors_propagate() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let llm = ScriptedLlm::new(vec![]);
        let agent = ToolAgent::new(llm, registry(&log, ""), "system", 5);

        let err = agent.run("task", "m", &ModelSettings::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "script exhausted");
    }
}
