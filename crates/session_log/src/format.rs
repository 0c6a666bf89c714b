//! Turns logged events into file payloads.
//!
//! `Raw` stores what the collaborators handed over, untouched: prompts and
//! shell text as `.txt`, model wire payloads as `.json`. Tool requests get a
//! short `key: value` header above the command. `Markdown` wraps the
//! same content in a small timestamped document per file.

use std::fmt::Write as _;
use std::str::FromStr;

use serde_json::Value;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::payload::Payload;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TranscriptFormat {
    #[default]
    Raw,
    Markdown,
}

impl TranscriptFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Markdown => "markdown",
        }
    }
}

impl FromStr for TranscriptFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(Self::Raw),
            "markdown" | "md" => Ok(Self::Markdown),
            other => Err(format!(
                "unknown transcript format '{other}' (expected 'raw' or 'markdown')"
            )),
        }
    }
}

/// One request sent to the model.
#[derive(Debug, Clone, Copy)]
pub struct LlmRequestRecord<'a> {
    pub model: &'a str,
    pub system_prompt: &'a str,
    /// Wire payload exactly as the provider sent it.
    pub payload: &'a Value,
}

/// The model's reply to the matching [`LlmRequestRecord`].
#[derive(Debug, Clone, Copy)]
pub struct LlmResponseRecord<'a> {
    /// Assistant text extracted from the payload, if any.
    pub text: Option<&'a str>,
    pub payload: &'a Value,
}

#[derive(Debug, Clone, Copy)]
pub struct ToolRequestRecord<'a> {
    pub tool_name: &'a str,
    pub arguments: &'a Value,
    pub approval_mode: bool,
    pub approved: bool,
}

impl ToolRequestRecord<'_> {
    /// Shell command text, or the compact JSON arguments for tools without one.
    #[must_use]
    pub fn command_text(&self) -> String {
        match self.arguments.get("command").and_then(Value::as_str) {
            Some(command) => command.to_string(),
            None => self.arguments.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ToolResponseRecord<'a> {
    pub output: &'a str,
    pub error: Option<&'a str>,
}

impl TranscriptFormat {
    pub(crate) fn user_input(self, number: u32, input: &str) -> Payload {
        match self {
            Self::Raw => Payload::Text(input.to_string()),
            Self::Markdown => {
                let mut doc = header("User Input", number, &[], &[]);
                section(&mut doc, "Input", "", input);
                Payload::Markdown(doc)
            }
        }
    }

    pub(crate) fn llm_request(self, number: u32, record: &LlmRequestRecord<'_>) -> Payload {
        match self {
            Self::Raw => Payload::Json(record.payload.clone()),
            Self::Markdown => {
                let mut doc = header("LLM Request", number, &[("Model", record.model)], &[]);
                section(&mut doc, "Request", "json", &pretty_json(record.payload));
                section(&mut doc, "System Prompt", "", record.system_prompt);
                Payload::Markdown(doc)
            }
        }
    }

    pub(crate) fn llm_response(self, number: u32, record: &LlmResponseRecord<'_>) -> Payload {
        match self {
            Self::Raw => Payload::Json(record.payload.clone()),
            Self::Markdown => {
                let mut doc = header("LLM Response", number, &[], &[]);
                let text = record
                    .text
                    .filter(|text| !text.is_empty())
                    .unwrap_or("<no text response>");
                section(&mut doc, "Text Output", "", text);
                section(&mut doc, "Raw Response", "json", &pretty_json(record.payload));
                Payload::Markdown(doc)
            }
        }
    }

    pub(crate) fn tool_request(self, number: u32, record: &ToolRequestRecord<'_>) -> Payload {
        match self {
            Self::Raw => {
                let mut text = String::new();
                let _ = writeln!(text, "tool: {}", record.tool_name);
                let _ = writeln!(text, "approval_mode: {}", record.approval_mode);
                let _ = writeln!(text, "approved: {}", record.approved);
                let _ = write!(text, "\n{}", record.command_text());
                Payload::Text(text)
            }
            Self::Markdown => {
                let approval_mode = record.approval_mode.to_string();
                let approved = record.approved.to_string();
                let mut doc = header(
                    &format!("Tool Call: {}", record.tool_name),
                    number,
                    &[],
                    &[("Approval Mode", &approval_mode), ("Approved", &approved)],
                );
                doc.push_str("\n## Arguments\n");
                match record.arguments.as_object() {
                    Some(arguments) => {
                        for (key, value) in arguments {
                            let value = value
                                .as_str()
                                .map(str::to_string)
                                .unwrap_or_else(|| value.to_string());
                            let _ = writeln!(doc, "**{key}**: {value}");
                        }
                    }
                    None => {
                        let _ = writeln!(doc, "{}", record.arguments);
                    }
                }
                let command = record
                    .arguments
                    .get("command")
                    .and_then(Value::as_str)
                    .unwrap_or("<no command>");
                section(&mut doc, "Command", "bash", command);
                Payload::Markdown(doc)
            }
        }
    }

    pub(crate) fn tool_response(self, number: u32, record: &ToolResponseRecord<'_>) -> Payload {
        match self {
            Self::Raw => {
                let mut text = record.output.to_string();
                if let Some(error) = record.error {
                    if !text.is_empty() && !text.ends_with('\n') {
                        text.push('\n');
                    }
                    let _ = writeln!(text, "[error] {error}");
                }
                Payload::Text(text)
            }
            Self::Markdown => {
                let mut doc = header("Tool Response", number, &[], &[]);
                section(&mut doc, "Output", "", record.output);
                if let Some(error) = record.error {
                    section(&mut doc, "Error", "", error);
                }
                Payload::Markdown(doc)
            }
        }
    }
}

/// `leading` fields print above the timestamp, `trailing` ones below the interaction number.
fn header(
    title: &str,
    number: u32,
    leading: &[(&str, &str)],
    trailing: &[(&str, &str)],
) -> String {
    let mut doc = format!("# {title}\n\n");
    for (name, value) in leading {
        let _ = writeln!(doc, "**{name}**: {value}");
    }
    let _ = writeln!(doc, "**Timestamp**: {}", local_timestamp());
    let _ = writeln!(doc, "**Interaction**: {number:03}");
    for (name, value) in trailing {
        let _ = writeln!(doc, "**{name}**: {value}");
    }
    doc
}

fn section(doc: &mut String, title: &str, fence_lang: &str, body: &str) {
    let _ = write!(doc, "\n## {title}\n```{fence_lang}\n{body}");
    if !body.ends_with('\n') {
        doc.push('\n');
    }
    doc.push_str("```\n");
}

fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|error| format!("<serialization failed: {error}>"))
}

fn local_timestamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ))
    .unwrap_or_else(|_| now.unix_timestamp().to_string())
}
