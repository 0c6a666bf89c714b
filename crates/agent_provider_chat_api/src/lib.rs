//! Chat-completions implementation of the shared `agent_provider` contract.
//!
//! One run drives the model/tool loop: send the history, execute any tool
//! calls the reply asks for through the host, append their results and ask
//! again, until a reply carries no tool calls. Every round trip is reported as
//! a `ModelRequest`/`ModelResponse` pair carrying the wire JSON.

use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use agent_provider::{
    CancelSignal, ProviderInitError, ProviderProfile, RunEvent, RunMessage, RunProvider,
    RunRequest, ToolCallRequest, ToolDefinition, ToolResult,
};
use chat_api::{
    ChatApiClient, ChatApiConfig, ChatApiError, ChatCompletion, ChatMessage, ChatRequest, ChatTool,
    ChatToolCall,
};
use serde_json::{json, Value};
use tracing::debug;

/// Provider identifier used when the config does not name one.
pub const CHAT_API_PROVIDER_ID: &str = "chat-api";

/// Upper bound on model requests in one run.
pub const MAX_MODEL_REQUESTS: usize = 24;

/// Runtime configuration for one chat-completions provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatApiProviderConfig {
    pub provider_id: String,
    pub api_key: String,
    pub model_id: String,
    pub base_url: Option<String>,
    pub extra_headers: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
}

impl ChatApiProviderConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            provider_id: CHAT_API_PROVIDER_ID.to_string(),
            api_key: api_key.into(),
            model_id: model_id.into(),
            base_url: None,
            extra_headers: BTreeMap::new(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = provider_id.into();
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn into_chat_api_config(self) -> ChatApiConfig {
        let mut config = ChatApiConfig::new(self.api_key);

        if let Some(base_url) = self.base_url {
            config = config.with_base_url(base_url);
        }

        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }

        for (key, value) in self.extra_headers {
            config = config.insert_header(key, value);
        }

        config
    }
}

trait CompletionClient: Send + Sync {
    fn complete(
        &self,
        request: &ChatRequest,
        cancel: &CancelSignal,
    ) -> Result<ChatCompletion, ChatApiError>;
}

#[derive(Debug)]
struct DefaultCompletionClient {
    client: ChatApiClient,
}

impl CompletionClient for DefaultCompletionClient {
    fn complete(
        &self,
        request: &ChatRequest,
        cancel: &CancelSignal,
    ) -> Result<ChatCompletion, ChatApiError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| {
                ChatApiError::InvalidRequest(format!("failed to initialize tokio runtime: {error}"))
            })?;

        runtime.block_on(self.client.complete(request, Some(cancel)))
    }
}

/// `RunProvider` adapter backed by `chat_api` transport primitives.
pub struct ChatApiProvider {
    provider_id: String,
    model_id: String,
    client: Arc<dyn CompletionClient>,
}

impl ChatApiProvider {
    /// Creates a provider using real HTTP transport.
    pub fn new(config: ChatApiProviderConfig) -> Result<Self, ProviderInitError> {
        let provider_id = sanitize_or(&config.provider_id, CHAT_API_PROVIDER_ID);
        if config.api_key.trim().is_empty() {
            return Err(ProviderInitError::new(format!(
                "Failed to initialize {provider_id} provider: API key is empty"
            )));
        }
        let model_id = config.model_id.trim().to_string();
        if model_id.is_empty() {
            return Err(ProviderInitError::new(format!(
                "Failed to initialize {provider_id} provider: model id is empty"
            )));
        }

        let client = ChatApiClient::new(config.into_chat_api_config()).map_err(|error| {
            ProviderInitError::new(format!(
                "Failed to initialize {provider_id} provider: {error}"
            ))
        })?;

        Ok(Self {
            provider_id,
            model_id,
            client: Arc::new(DefaultCompletionClient { client }),
        })
    }

    #[cfg(test)]
    fn with_client_for_tests(model_id: &str, client: Arc<dyn CompletionClient>) -> Self {
        Self {
            provider_id: CHAT_API_PROVIDER_ID.to_string(),
            model_id: model_id.to_string(),
            client,
        }
    }

    /// Runs the model/tool loop; returns the terminal event to emit.
    fn drive(
        &self,
        req: RunRequest,
        cancel: &CancelSignal,
        execute_tool: &mut dyn FnMut(ToolCallRequest) -> ToolResult,
        emit: &mut dyn FnMut(RunEvent),
    ) -> RunEvent {
        let run_id = req.run_id;
        let tools = chat_tools(&req.tools);
        let mut messages = chat_messages(&req.instructions, &req.messages);

        for round in 1..=MAX_MODEL_REQUESTS {
            if cancel.load(Ordering::Acquire) {
                return RunEvent::Cancelled { run_id };
            }

            let request =
                ChatRequest::new(self.model_id.clone(), messages.clone()).with_tools(tools.clone());
            let payload = request
                .to_value()
                .unwrap_or_else(|error| json!(format!("<serialization failed: {error}>")));
            debug!(run_id, round, model = %self.model_id, "sending chat completion request");
            emit(RunEvent::ModelRequest { run_id, payload });

            let completion = match self.client.complete(&request, cancel) {
                Ok(completion) => completion,
                Err(error) => {
                    emit(RunEvent::ModelResponse {
                        run_id,
                        payload: json!({ "error": error.to_string() }),
                    });
                    return match error {
                        ChatApiError::Cancelled => RunEvent::Cancelled { run_id },
                        error => RunEvent::Failed {
                            run_id,
                            error: format!("{} request failed: {error}", self.provider_id),
                        },
                    };
                }
            };
            emit(RunEvent::ModelResponse {
                run_id,
                payload: completion.raw.clone(),
            });

            let Some(reply) = completion.response.first_message().cloned() else {
                return RunEvent::Failed {
                    run_id,
                    error: format!("{} response carried no message", self.provider_id),
                };
            };
            if let Some(text) = reply.text() {
                emit(RunEvent::Chunk {
                    run_id,
                    text: text.to_string(),
                });
            }
            if reply.tool_calls.is_empty() {
                return RunEvent::Finished { run_id };
            }

            messages.push(ChatMessage::assistant(
                reply.content.clone(),
                reply.tool_calls.clone(),
            ));
            for call in reply.tool_calls {
                let result = execute_tool(tool_call_request(&call));
                messages.push(ChatMessage::tool(call.id, result.content_text()));
                if cancel.load(Ordering::Acquire) {
                    return RunEvent::Cancelled { run_id };
                }
            }
        }

        RunEvent::Failed {
            run_id,
            error: format!("stopped after {MAX_MODEL_REQUESTS} model requests without a final answer"),
        }
    }
}

impl RunProvider for ChatApiProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: self.provider_id.clone(),
            model_id: self.model_id.clone(),
        }
    }

    fn run(
        &self,
        req: RunRequest,
        cancel: CancelSignal,
        execute_tool: &mut dyn FnMut(ToolCallRequest) -> ToolResult,
        emit: &mut dyn FnMut(RunEvent),
    ) -> Result<(), String> {
        let run_id = req.run_id;
        emit(RunEvent::Started { run_id });

        let terminal = self.drive(req, &cancel, execute_tool, emit);
        emit(terminal);
        Ok(())
    }
}

fn chat_tools(tools: &[ToolDefinition]) -> Vec<ChatTool> {
    tools
        .iter()
        .map(|tool| {
            ChatTool::function(
                tool.name.clone(),
                tool.description.clone().unwrap_or_default(),
                tool.input_schema.clone(),
            )
        })
        .collect()
}

/// Maps neutral history onto chat messages.
///
/// Tool calls following assistant text (or each other) join that assistant
/// message, matching how the model produced them.
fn chat_messages(instructions: &str, history: &[RunMessage]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    if !instructions.trim().is_empty() {
        messages.push(ChatMessage::system(instructions));
    }

    for message in history {
        match message {
            RunMessage::UserText { text } => messages.push(ChatMessage::user(text.clone())),
            RunMessage::AssistantText { text } => {
                messages.push(ChatMessage::assistant(Some(text.clone()), Vec::new()));
            }
            RunMessage::ToolCall {
                call_id,
                tool_name,
                arguments,
            } => {
                let call = ChatToolCall::function(call_id.clone(), tool_name.clone(), arguments.to_string());
                match messages.last_mut() {
                    Some(last) if last.role == "assistant" => last.tool_calls.push(call),
                    _ => messages.push(ChatMessage::assistant(None, vec![call])),
                }
            }
            RunMessage::ToolResult {
                call_id, content, ..
            } => {
                let content = match content {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                messages.push(ChatMessage::tool(call_id.clone(), content));
            }
        }
    }

    messages
}

fn tool_call_request(call: &ChatToolCall) -> ToolCallRequest {
    let raw = call.function.arguments.trim();
    let arguments = if raw.is_empty() {
        json!({})
    } else {
        serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    };

    ToolCallRequest {
        call_id: call.id.clone(),
        tool_name: call.function.name.clone(),
        arguments,
    }
}

fn sanitize_or(value: &str, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}
