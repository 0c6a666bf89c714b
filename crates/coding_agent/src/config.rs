//! Startup configuration.
//!
//! Flags win over the process environment, which already includes anything
//! `.env` supplied (loaded before parsing without overriding real variables),
//! which wins over built-in defaults. Blank variables count as unset.

use std::path::PathBuf;
use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use session_log::TranscriptFormat;
use thiserror::Error;

use crate::approval::ApprovalMode;
use crate::models::{ModelName, ProviderSource};

pub const SYSTEM_INSTRUCTIONS_ENV_VAR: &str = "GLASSBOX_SYSTEM_INSTRUCTIONS";
pub const PROVIDER_ENV_VAR: &str = "GLASSBOX_PROVIDER";
pub const DEFAULT_SYSTEM_INSTRUCTIONS: &str = "You are an AI coding agent.
Your goal is to act on the user's request to complete a given task.
You operate in a loop, repeatedly calling tools until the task is finished.
You must explain your thought process and the steps you plan to take to solve the problem.
You must use the provided tools to interact with the environment, specifically the file system.
";

#[derive(Debug, Clone, Parser)]
#[command(
    name = "glassbox",
    version,
    about = "Interactive coding agent that logs every interaction it performs"
)]
pub struct Cli {
    /// Model to start with (gpt-5, claude-4.5-sonnet, grok-code-fast-1)
    #[arg(long, env = "GLASSBOX_MODEL")]
    pub model: Option<ModelName>,

    /// Run tool calls without asking for approval
    #[arg(
        long,
        env = "GLASSBOX_YOLO",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub yolo: bool,

    /// Transcript file format (raw or markdown)
    #[arg(long, env = "GLASSBOX_TRANSCRIPT_FORMAT")]
    pub transcript_format: Option<TranscriptFormat>,

    /// Directory that holds session_NNN directories and the counter file
    #[arg(long, env = "GLASSBOX_SESSION_ROOT")]
    pub session_root: Option<PathBuf>,

    /// Kill shell commands that run longer than this many seconds
    #[arg(long = "shell-timeout", env = "GLASSBOX_SHELL_TIMEOUT_SEC")]
    pub shell_timeout_sec: Option<u64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("shell timeout must be at least one second")]
    ZeroShellTimeout,
    #[error("invalid GLASSBOX_PROVIDER: {0}")]
    Provider(String),
    #[error("failed to resolve the current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
}

/// Resolved settings for one run of the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `None` means pick from the models with keys at startup.
    pub model: Option<ModelName>,
    pub approval: ApprovalMode,
    pub transcript_format: TranscriptFormat,
    pub session_root: PathBuf,
    pub shell_timeout: Option<Duration>,
    pub system_instructions: String,
    pub provider_source: ProviderSource,
}

impl Config {
    /// Combines parsed flags with the env-only settings.
    pub fn resolve(
        cli: Cli,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let session_root = match cli.session_root {
            Some(root) => root,
            None => std::env::current_dir().map_err(ConfigError::CurrentDir)?,
        };

        let shell_timeout = match cli.shell_timeout_sec {
            Some(0) => return Err(ConfigError::ZeroShellTimeout),
            Some(seconds) => Some(Duration::from_secs(seconds)),
            None => None,
        };

        let provider_source = env(PROVIDER_ENV_VAR)
            .map(|value| value.parse::<ProviderSource>())
            .transpose()
            .map_err(ConfigError::Provider)?
            .unwrap_or_default();

        Ok(Self {
            model: cli.model,
            approval: if cli.yolo {
                ApprovalMode::Yolo
            } else {
                ApprovalMode::Approval
            },
            transcript_format: cli.transcript_format.unwrap_or_default(),
            session_root,
            shell_timeout,
            system_instructions: sanitize_system_instructions(env(SYSTEM_INSTRUCTIONS_ENV_VAR)),
            provider_source,
        })
    }
}

fn sanitize_system_instructions(raw: Option<String>) -> String {
    let Some(value) = raw else {
        return DEFAULT_SYSTEM_INSTRUCTIONS.to_string();
    };

    let trimmed = value.trim();
    if trimmed.is_empty() {
        DEFAULT_SYSTEM_INSTRUCTIONS.to_string()
    } else {
        trimmed.to_string()
    }
}
