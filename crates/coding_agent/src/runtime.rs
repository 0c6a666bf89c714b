//! Runs one provider turn and records what happens along the way.
//!
//! Provider events and tool calls arrive through two callbacks that share the
//! same turn state. Every `ModelRequest`/`ModelResponse` pair is written to the
//! session transcript, every tool call goes through the approval gate, and the
//! run's messages are collected for the caller to commit or discard.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;

use agent_provider::{
    CancelSignal, RunEvent, RunId, RunMessage, RunProvider, RunRequest, ToolCallRequest,
    ToolResult,
};
use serde_json::Value;
use session_log::{
    InteractionId, LlmRequestRecord, LlmResponseRecord, SessionLogger, ToolRequestRecord,
    ToolResponseRecord,
};
use tracing::{debug, warn};

use crate::app::HostOps;
use crate::approval::{is_approved, ApprovalMode, APPROVAL_PROMPT, DENIED_MESSAGE, DENIED_TOOL_ERROR};
use crate::tools::{shell_command_argument, ShellTool, SHELL_TOOL_NAME};

pub const NO_OUTPUT_PLACEHOLDER: &str = "<no output>";
const ANSWER_PROMPT: &str = "› ";

/// Per-turn settings the host does not own.
#[derive(Debug, Clone, Copy)]
pub struct TurnSettings<'a> {
    pub system_prompt: &'a str,
    pub approval: ApprovalMode,
    pub shell: &'a ShellTool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The run finished; `messages` are ready to join conversation memory.
    Completed {
        reply: String,
        messages: Vec<RunMessage>,
    },
    /// The user denied a tool call, which cancelled the run.
    Denied,
    Cancelled,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Terminal {
    Finished,
    Failed(String),
    Cancelled,
}

struct TurnState<'a> {
    run_id: RunId,
    model_id: String,
    logger: &'a mut SessionLogger,
    host: &'a mut dyn HostOps,
    settings: TurnSettings<'a>,
    cancel: CancelSignal,
    pending_llm: Option<InteractionId>,
    messages: Vec<RunMessage>,
    reply_parts: Vec<String>,
    terminal: Option<Terminal>,
    denied: bool,
}

/// Drives `provider` through one run of `request`.
pub fn run_turn(
    provider: &dyn RunProvider,
    request: RunRequest,
    cancel: CancelSignal,
    logger: &mut SessionLogger,
    host: &mut dyn HostOps,
    settings: TurnSettings<'_>,
) -> TurnOutcome {
    let run_id = request.run_id;
    let state = RefCell::new(TurnState {
        run_id,
        model_id: provider.profile().model_id,
        logger,
        host,
        settings,
        cancel: CancelSignal::clone(&cancel),
        pending_llm: None,
        messages: Vec::new(),
        reply_parts: Vec::new(),
        terminal: None,
        denied: false,
    });

    let result = {
        let mut execute_tool = |call: ToolCallRequest| state.borrow_mut().execute_tool(call);
        let mut emit = |event: RunEvent| state.borrow_mut().on_event(event);
        panic::catch_unwind(AssertUnwindSafe(|| {
            provider.run(request, CancelSignal::clone(&cancel), &mut execute_tool, &mut emit)
        }))
    };

    let state = state.into_inner();
    let cancelled = cancel.load(Ordering::SeqCst);
    match result {
        Err(_) => TurnOutcome::Failed("Provider panicked".to_string()),
        Ok(Err(_)) if state.denied => TurnOutcome::Denied,
        Ok(Err(_)) if cancelled => TurnOutcome::Cancelled,
        Ok(Err(error)) => TurnOutcome::Failed(error),
        Ok(Ok(())) => state.into_outcome(),
    }
}

impl TurnState<'_> {
    fn on_event(&mut self, event: RunEvent) {
        if event.run_id() != self.run_id {
            warn!(
                expected = self.run_id,
                received = event.run_id(),
                "ignoring event from another run"
            );
            return;
        }

        match event {
            RunEvent::Started { run_id } => debug!(run_id, model = %self.model_id, "run started"),
            RunEvent::ModelRequest { payload, .. } => {
                if let Some(unanswered) = self.pending_llm.take() {
                    warn!(
                        interaction = unanswered.number(),
                        "model request was never answered"
                    );
                }
                let logged = self.logger.log_llm_request(&LlmRequestRecord {
                    model: &self.model_id,
                    system_prompt: self.settings.system_prompt,
                    payload: &payload,
                });
                self.pending_llm = Some(logged.interaction);
            }
            RunEvent::ModelResponse { payload, .. } => match self.pending_llm.take() {
                Some(interaction) => {
                    self.logger.log_llm_response(
                        interaction,
                        &LlmResponseRecord {
                            text: response_text(&payload),
                            payload: &payload,
                        },
                    );
                }
                None => warn!("model response without a preceding request; not logged"),
            },
            RunEvent::Chunk { text, .. } => {
                self.reply_parts.push(text.clone());
                self.messages.push(RunMessage::AssistantText { text });
            }
            RunEvent::Finished { .. } => self.set_terminal(Terminal::Finished),
            RunEvent::Failed { error, .. } => self.set_terminal(Terminal::Failed(error)),
            RunEvent::Cancelled { .. } => self.set_terminal(Terminal::Cancelled),
        }
    }

    fn set_terminal(&mut self, terminal: Terminal) {
        if self.terminal.is_none() {
            self.terminal = Some(terminal);
        } else {
            debug!(?terminal, "ignoring repeated terminal event");
        }
    }

    fn execute_tool(&mut self, call: ToolCallRequest) -> ToolResult {
        let ui = self.host.ui();
        ui.stop_thinking();
        ui.tool_call_box(&describe_call(&call));

        let approval_mode = self.settings.approval.requires_approval();
        if approval_mode {
            self.host.ui().info(APPROVAL_PROMPT);
            let answer = self.host.read_answer(ANSWER_PROMPT);
            if !is_approved(answer.as_deref()) {
                return self.deny(call);
            }
        }

        let logged = self.logger.log_tool_request(&ToolRequestRecord {
            tool_name: &call.tool_name,
            arguments: &call.arguments,
            approval_mode,
            approved: true,
        });

        let command = shell_command_argument(&call.arguments).map(str::to_string);
        let result = match command {
            Some(command) if call.tool_name == SHELL_TOOL_NAME => {
                let output = self.settings.shell.run(&command, Some(&*self.cancel));
                let shown = if output.is_empty() {
                    NO_OUTPUT_PLACEHOLDER
                } else {
                    output.as_str()
                };
                self.host.ui().tool_output_box(shown);
                self.logger.log_tool_response(
                    logged.interaction,
                    &ToolResponseRecord {
                        output: &output,
                        error: None,
                    },
                );
                ToolResult::success(&call.call_id, &call.tool_name, output)
            }
            _ => {
                let error = if call.tool_name == SHELL_TOOL_NAME {
                    "Missing required argument: command".to_string()
                } else {
                    format!("Unknown tool: {}", call.tool_name)
                };
                self.host.ui().error(&error);
                self.logger.log_tool_response(
                    logged.interaction,
                    &ToolResponseRecord {
                        output: "",
                        error: Some(&error),
                    },
                );
                ToolResult::error(&call.call_id, &call.tool_name, error)
            }
        };

        self.record_tool_exchange(call, &result);
        self.host.ui().start_thinking();
        result
    }

    fn deny(&mut self, call: ToolCallRequest) -> ToolResult {
        self.host.ui().error(DENIED_MESSAGE);

        let logged = self.logger.log_tool_request(&ToolRequestRecord {
            tool_name: &call.tool_name,
            arguments: &call.arguments,
            approval_mode: true,
            approved: false,
        });
        self.logger.log_tool_response(
            logged.interaction,
            &ToolResponseRecord {
                output: "",
                error: Some(DENIED_TOOL_ERROR),
            },
        );

        self.denied = true;
        self.cancel.store(true, Ordering::SeqCst);

        let result = ToolResult::error(&call.call_id, &call.tool_name, DENIED_TOOL_ERROR);
        self.record_tool_exchange(call, &result);
        result
    }

    fn record_tool_exchange(&mut self, call: ToolCallRequest, result: &ToolResult) {
        self.messages.push(RunMessage::ToolCall {
            call_id: call.call_id,
            tool_name: call.tool_name,
            arguments: call.arguments,
        });
        self.messages.push(RunMessage::ToolResult {
            call_id: result.call_id.clone(),
            tool_name: result.tool_name.clone(),
            content: result.content.clone(),
            is_error: result.is_error,
        });
    }

    fn into_outcome(self) -> TurnOutcome {
        if self.denied {
            return TurnOutcome::Denied;
        }

        match self.terminal {
            Some(Terminal::Finished) => TurnOutcome::Completed {
                reply: self.reply_parts.join("\n\n"),
                messages: self.messages,
            },
            Some(Terminal::Cancelled) => TurnOutcome::Cancelled,
            Some(Terminal::Failed(error)) => TurnOutcome::Failed(error),
            None => TurnOutcome::Failed("Provider exited without a terminal event".to_string()),
        }
    }
}

/// `shell(command="ls")` for shell calls, `name(arguments)` otherwise.
fn describe_call(call: &ToolCallRequest) -> String {
    match shell_command_argument(&call.arguments) {
        Some(command) if call.tool_name == SHELL_TOOL_NAME => {
            format!("{SHELL_TOOL_NAME}(command={command:?})")
        }
        _ => format!("{}({})", call.tool_name, call.arguments),
    }
}

/// Assistant text inside a response payload, for the readable transcript.
fn response_text(payload: &Value) -> Option<&str> {
    payload
        .pointer("/choices/0/message/content")
        .or_else(|| payload.get("content"))
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
}
