//! Deterministic mock implementation of the shared `agent_provider` contract.
//!
//! The provider replays a fixed script on every run: each step is one model
//! round trip that either asks the host to run a tool or answers with text.
//! Request/response payloads are emitted exactly like a real provider would,
//! which makes the mock suitable for transcript tests and offline sessions.

use std::sync::atomic::Ordering;

use agent_provider::{
    CancelSignal, ProviderProfile, RunEvent, RunMessage, RunProvider, RunRequest,
    ToolCallRequest, ToolResult,
};
use serde_json::{json, Value};

/// Stable provider identifier used for explicit startup selection.
pub const MOCK_PROVIDER_ID: &str = "mock";

/// One scripted model round trip.
#[derive(Debug, Clone, PartialEq)]
pub enum MockStep {
    /// The model requests a host tool call; the run continues afterwards.
    ToolCall { tool_name: String, arguments: Value },
    /// The model answers with final text; the run finishes.
    Reply(String),
    /// The model answers by echoing the latest user prompt; the run finishes.
    EchoPrompt,
}

impl MockStep {
    #[must_use]
    pub fn shell(command: impl Into<String>) -> Self {
        Self::ToolCall {
            tool_name: "shell".to_string(),
            arguments: json!({ "command": command.into() }),
        }
    }

    #[must_use]
    pub fn reply(text: impl Into<String>) -> Self {
        Self::Reply(text.into())
    }
}

/// Deterministic mock provider used by `coding_agent` tests and local runs.
#[derive(Debug, Clone)]
pub struct MockProvider {
    model_id: String,
    script: Vec<MockStep>,
}

impl MockProvider {
    /// Creates a mock provider that plays `script` on every run.
    #[must_use]
    pub fn new(script: Vec<MockStep>) -> Self {
        Self::with_model_id("mock", script)
    }

    #[must_use]
    pub fn with_model_id(model_id: impl Into<String>, script: Vec<MockStep>) -> Self {
        let model_id = model_id.into();
        let model_id = if model_id.trim().is_empty() {
            "mock".to_string()
        } else {
            model_id.trim().to_string()
        };

        Self { model_id, script }
    }

    fn request_payload(&self, req: &RunRequest, history: &[RunMessage]) -> Value {
        json!({
            "model": self.model_id,
            "instructions": req.instructions,
            "tools": req.tools.iter().map(|tool| tool.name.clone()).collect::<Vec<_>>(),
            "messages": history.iter().map(RunMessage::to_json).collect::<Vec<_>>(),
        })
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(vec![MockStep::EchoPrompt])
    }
}

impl RunProvider for MockProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: MOCK_PROVIDER_ID.to_string(),
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
        let mut history = req.messages.clone();

        emit(RunEvent::Started { run_id });

        for (step_index, step) in self.script.iter().enumerate() {
            if cancel.load(Ordering::SeqCst) {
                emit(RunEvent::Cancelled { run_id });
                return Ok(());
            }

            emit(RunEvent::ModelRequest {
                run_id,
                payload: self.request_payload(&req, &history),
            });

            match step {
                MockStep::ToolCall {
                    tool_name,
                    arguments,
                } => {
                    let call_id = format!("mock-call-{run_id}-{step_index}");
                    emit(RunEvent::ModelResponse {
                        run_id,
                        payload: json!({
                            "role": "assistant",
                            "tool_calls": [{
                                "id": call_id,
                                "name": tool_name,
                                "arguments": arguments,
                            }],
                        }),
                    });

                    history.push(RunMessage::ToolCall {
                        call_id: call_id.clone(),
                        tool_name: tool_name.clone(),
                        arguments: arguments.clone(),
                    });
                    let result = execute_tool(ToolCallRequest {
                        call_id,
                        tool_name: tool_name.clone(),
                        arguments: arguments.clone(),
                    });
                    history.push(RunMessage::ToolResult {
                        call_id: result.call_id,
                        tool_name: result.tool_name,
                        content: result.content,
                        is_error: result.is_error,
                    });
                }
                MockStep::Reply(text) => {
                    finish_with_text(run_id, text.clone(), emit);
                    return Ok(());
                }
                MockStep::EchoPrompt => {
                    let prompt = latest_user_text(&history).unwrap_or_default();
                    finish_with_text(run_id, format!("(mock) You said: {prompt}"), emit);
                    return Ok(());
                }
            }
        }

        if cancel.load(Ordering::SeqCst) {
            emit(RunEvent::Cancelled { run_id });
        } else {
            emit(RunEvent::Finished { run_id });
        }

        Ok(())
    }
}

fn finish_with_text(run_id: u64, text: String, emit: &mut dyn FnMut(RunEvent)) {
    emit(RunEvent::ModelResponse {
        run_id,
        payload: json!({ "role": "assistant", "content": text }),
    });
    if !text.is_empty() {
        emit(RunEvent::Chunk { run_id, text });
    }
    emit(RunEvent::Finished { run_id });
}

fn latest_user_text(history: &[RunMessage]) -> Option<String> {
    history.iter().rev().find_map(|message| match message {
        RunMessage::UserText { text } => Some(text.clone()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    use super::*;

    fn request(prompt: &str) -> RunRequest {
        RunRequest {
            run_id: 7,
            messages: vec![RunMessage::UserText {
                text: prompt.to_string(),
            }],
            instructions: "system instructions".to_string(),
            tools: Vec::new(),
        }
    }

    fn collect_events(
        provider: &MockProvider,
        cancel: CancelSignal,
        tool_calls: &mut Vec<ToolCallRequest>,
    ) -> Vec<RunEvent> {
        let mut events = Vec::new();
        provider
            .run(
                request("list files"),
                cancel,
                &mut |call| {
                    tool_calls.push(call.clone());
                    ToolResult::success(call.call_id, call.tool_name, "Cargo.toml\n")
                },
                &mut |event| events.push(event),
            )
            .expect("mock run should succeed");
        events
    }

    #[test]
    fn profile_exposes_explicit_mock_provider_identity() {
        let profile = MockProvider::default().profile();

        assert_eq!(profile.provider_id, MOCK_PROVIDER_ID);
        assert_eq!(profile.model_id, "mock");
    }

    #[test]
    fn default_script_echoes_the_prompt() {
        let provider = MockProvider::default();
        let events = collect_events(&provider, Arc::new(AtomicBool::new(false)), &mut Vec::new());

        assert!(events.iter().any(|event| matches!(
            event,
            RunEvent::Chunk { text, .. } if text == "(mock) You said: list files"
        )));
        assert!(matches!(events.last(), Some(RunEvent::Finished { run_id: 7 })));
    }

    #[test]
    fn tool_step_round_trips_through_host_before_reply() {
        let provider = MockProvider::new(vec![MockStep::shell("ls"), MockStep::reply("done")]);
        let mut tool_calls = Vec::new();
        let events = collect_events(&provider, Arc::new(AtomicBool::new(false)), &mut tool_calls);

        assert_eq!(tool_calls.len(), 1);
        assert_eq!(tool_calls[0].arguments["command"], "ls");

        let exchanges: Vec<&str> = events
            .iter()
            .filter_map(|event| match event {
                RunEvent::ModelRequest { .. } => Some("request"),
                RunEvent::ModelResponse { .. } => Some("response"),
                _ => None,
            })
            .collect();
        assert_eq!(exchanges, vec!["request", "response", "request", "response"]);

        let second_request = events
            .iter()
            .filter_map(|event| match event {
                RunEvent::ModelRequest { payload, .. } => Some(payload),
                _ => None,
            })
            .nth(1)
            .expect("second request exists");
        assert_eq!(
            second_request["messages"].as_array().map(Vec::len),
            Some(3),
            "user text, tool call and tool result are replayed"
        );
    }

    #[test]
    fn run_emits_cancelled_when_cancel_is_set() {
        let provider = MockProvider::new(vec![MockStep::reply("ignored")]);
        let events = collect_events(&provider, Arc::new(AtomicBool::new(true)), &mut Vec::new());

        assert_eq!(
            events,
            vec![
                RunEvent::Started { run_id: 7 },
                RunEvent::Cancelled { run_id: 7 }
            ]
        );
    }

    #[test]
    fn cancel_set_by_tool_call_stops_the_script() {
        let provider = MockProvider::new(vec![MockStep::shell("rm -rf /tmp/x"), MockStep::reply("never")]);
        let cancel = Arc::new(AtomicBool::new(false));
        let cancel_from_tool = Arc::clone(&cancel);
        let mut events = Vec::new();

        provider
            .run(
                request("clean up"),
                cancel,
                &mut |call| {
                    cancel_from_tool.store(true, Ordering::SeqCst);
                    ToolResult::error(call.call_id, call.tool_name, "User denied tool call")
                },
                &mut |event| events.push(event),
            )
            .expect("mock run should succeed");

        assert!(matches!(events.last(), Some(RunEvent::Cancelled { run_id: 7 })));
        assert!(!events
            .iter()
            .any(|event| matches!(event, RunEvent::Chunk { .. })));
    }

    #[test]
    fn blank_model_id_falls_back_to_mock() {
        let provider = MockProvider::with_model_id("   ", Vec::new());
        assert_eq!(provider.profile().model_id, "mock");
    }
}
