use std::io::Read;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use agent_provider::ToolDefinition;
use serde_json::{json, Value};
use wait_timeout::ChildExt;

pub const SHELL_TOOL_NAME: &str = "shell";
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 100 * 1024;

const WAIT_SLICE: Duration = Duration::from_millis(100);

/// Definition offered to the model for the single `shell` tool.
pub fn shell_tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: SHELL_TOOL_NAME.to_string(),
        description: Some(
            "Execute a shell command in the current working directory and return its combined stdout and stderr."
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to run with bash."
                }
            },
            "required": ["command"],
            "additionalProperties": false
        }),
    }
}

/// Extracts the `command` argument of a `shell` call.
pub fn shell_command_argument(arguments: &Value) -> Option<&str> {
    match arguments {
        Value::Object(map) => map.get("command").and_then(Value::as_str),
        Value::String(command) => Some(command.as_str()),
        _ => None,
    }
}

/// Runs commands through `bash -lc` with an optional timeout.
#[derive(Debug, Clone)]
pub struct ShellTool {
    timeout: Option<Duration>,
    max_output_bytes: usize,
    cwd: Option<PathBuf>,
    /// `None` removes the variable from the child environment.
    env: Vec<(String, Option<String>)>,
    startup_files: bool,
}

impl Default for ShellTool {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ShellTool {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            cwd: None,
            env: Vec::new(),
            startup_files: true,
        }
    }

    #[must_use]
    pub fn with_max_output_bytes(mut self, max_output_bytes: usize) -> Self {
        self.max_output_bytes = max_output_bytes;
        self
    }

    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), Some(value.into())));
        self
    }

    #[must_use]
    pub fn without_env(mut self, key: impl Into<String>) -> Self {
        self.env.push((key.into(), None));
        self
    }

    /// Skips `/etc/profile` and the user's profile files (`--noprofile --norc`).
    #[must_use]
    pub fn without_startup_files(mut self) -> Self {
        self.startup_files = false;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Runs `command` and returns `stdout + stderr`.
    ///
    /// Never fails: launch errors, timeouts and cancellation are reported
    /// inside the returned text.
    pub fn run(&self, command: &str, cancel: Option<&AtomicBool>) -> String {
        let mut builder = Command::new("bash");
        if !self.startup_files {
            builder.args(["--noprofile", "--norc"]);
        }
        builder
            .arg("-lc")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);
        if let Some(cwd) = &self.cwd {
            builder.current_dir(cwd);
        }
        for (key, value) in &self.env {
            match value {
                Some(value) => builder.env(key, value),
                None => builder.env_remove(key),
            };
        }

        let mut child = match builder.spawn() {
            Ok(child) => child,
            Err(error) => return format!("[error] {:?}: {error}", error.kind()),
        };

        let stdout = spawn_pipe_reader(child.stdout.take());
        let stderr = spawn_pipe_reader(child.stderr.take());

        let ending = self.wait(&mut child, cancel);
        if !matches!(ending, Ending::Exited) {
            kill_process_group(&mut child);
        }

        let mut output = String::from_utf8_lossy(&join_pipe_reader(stdout)).into_owned();
        output.push_str(&String::from_utf8_lossy(&join_pipe_reader(stderr)));
        let output = truncate_to_byte_limit(output, self.max_output_bytes);

        match ending {
            Ending::Exited => output,
            Ending::TimedOut(limit) => format!(
                "[timeout] Command exceeded {} seconds. Partial output: {output}",
                limit.as_secs()
            ),
            Ending::Cancelled => format!("[cancelled] Command interrupted. Partial output: {output}"),
            Ending::WaitFailed(error) => format!("[error] {error}. Partial output: {output}"),
        }
    }

    fn wait(&self, child: &mut Child, cancel: Option<&AtomicBool>) -> Ending {
        let started = Instant::now();
        loop {
            if cancel.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
                return Ending::Cancelled;
            }

            let slice = match self.timeout {
                Some(limit) => {
                    let elapsed = started.elapsed();
                    if elapsed >= limit {
                        return Ending::TimedOut(limit);
                    }
                    WAIT_SLICE.min(limit - elapsed)
                }
                None => WAIT_SLICE,
            };

            match child.wait_timeout(slice) {
                Ok(Some(_)) => return Ending::Exited,
                Ok(None) => {}
                Err(error) => return Ending::WaitFailed(error.to_string()),
            }
        }
    }
}

enum Ending {
    Exited,
    TimedOut(Duration),
    Cancelled,
    WaitFailed(String),
}

fn kill_process_group(child: &mut Child) {
    if let Ok(pid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: signalling our own child's process group has no memory effects.
        unsafe {
            libc::kill(-pid, libc::SIGKILL);
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

fn spawn_pipe_reader<R>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    let mut pipe = pipe?;
    Some(thread::spawn(move || {
        let mut bytes = Vec::new();
        let _ = pipe.read_to_end(&mut bytes);
        bytes
    }))
}

fn join_pipe_reader(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

fn truncate_to_byte_limit(content: String, max_bytes: usize) -> String {
    if content.len() <= max_bytes {
        return content;
    }

    let mut cutoff = max_bytes.min(content.len());
    while cutoff > 0 && !content.is_char_boundary(cutoff) {
        cutoff -= 1;
    }

    let mut truncated = content[..cutoff].to_string();
    truncated.push_str("\n[truncated]");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        let content = "héllo".to_string();

        assert_eq!(truncate_to_byte_limit(content.clone(), 10), "héllo");
        assert_eq!(truncate_to_byte_limit(content, 2), "h\n[truncated]");
    }

    #[test]
    fn command_argument_accepts_object_or_bare_string() {
        assert_eq!(shell_command_argument(&json!({"command": "ls"})), Some("ls"));
        assert_eq!(shell_command_argument(&json!("pwd")), Some("pwd"));
        assert_eq!(shell_command_argument(&json!({"cmd": "ls"})), None);
        assert_eq!(shell_command_argument(&json!(3)), None);
    }

    #[test]
    fn definition_requires_command() {
        let definition = shell_tool_definition();

        assert_eq!(definition.name, "shell");
        assert_eq!(definition.input_schema["required"], json!(["command"]));
        assert_eq!(
            definition.input_schema["properties"]["command"]["type"],
            "string"
        );
    }
}
