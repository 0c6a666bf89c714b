//! Interactive terminal host: line editing, history and interrupt handling.

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use agent_provider::{CancelSignal, ProviderInitError, RunProvider};
use glassbox::{Console, Ui};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::FileHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use signal_hook::iterator::{Handle, Signals};
use tracing::{debug, warn};

use crate::app::HostOps;
use crate::commands::complete_slash_command;
use crate::models::{self, ModelName, ProviderSource};

pub const PROMPT: &str = "› ";
const HISTORY_FILE_NAME: &str = ".glassbox_history";

/// Completes and hints slash commands at the start of the line.
#[derive(Debug, Clone, Default)]
pub struct CommandHelper;

impl Helper for CommandHelper {}

impl Completer for CommandHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let candidates = complete_slash_command(&line[..pos])
            .into_iter()
            .map(|command| Pair {
                display: command.to_string(),
                replacement: command.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Hinter for CommandHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if line.contains(' ') {
            return None;
        }

        complete_slash_command(line)
            .into_iter()
            .find(|command| command.len() > line.len())
            .map(|command| command[line.len()..].to_string())
    }
}

impl Highlighter for CommandHelper {}

impl Validator for CommandHelper {}

/// Turns SIGINT into a cancel flag while a run is in flight.
///
/// At the prompt the line editor owns the terminal in raw mode and sees
/// Ctrl+C as a key, so the signal only arrives while a turn is running.
pub struct InterruptWatcher {
    flag: CancelSignal,
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl InterruptWatcher {
    pub fn install() -> io::Result<Self> {
        let flag: CancelSignal = Arc::new(AtomicBool::new(false));
        let mut signals = Signals::new([libc::SIGINT])?;
        let handle = signals.handle();
        let thread_flag = Arc::clone(&flag);

        let thread = thread::spawn(move || {
            for _ in signals.forever() {
                debug!("interrupt received");
                thread_flag.store(true, Ordering::SeqCst);
            }
        });

        Ok(Self {
            flag,
            handle,
            thread: Some(thread),
        })
    }

    /// Clears any stale interrupt and returns the flag for the next run.
    pub fn arm(&self) -> CancelSignal {
        self.flag.store(false, Ordering::SeqCst);
        Arc::clone(&self.flag)
    }
}

impl Drop for InterruptWatcher {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

pub enum PromptLine {
    Line(String),
    Interrupted,
    Eof,
}

/// [`HostOps`] over the real terminal and process environment.
pub struct ConsoleHost {
    console: Console,
    editor: Editor<CommandHelper, FileHistory>,
    interrupts: InterruptWatcher,
    provider_source: ProviderSource,
    history_path: Option<PathBuf>,
}

impl ConsoleHost {
    pub fn new(console: Console, provider_source: ProviderSource) -> anyhow::Result<Self> {
        let mut editor: Editor<CommandHelper, FileHistory> = Editor::new()?;
        editor.set_helper(Some(CommandHelper));

        let history_path = dirs::home_dir().map(|home| home.join(HISTORY_FILE_NAME));
        if let Some(path) = &history_path {
            if let Err(error) = editor.load_history(path) {
                debug!(path = %path.display(), %error, "no readable prompt history");
            }
        }

        Ok(Self {
            console,
            editor,
            interrupts: InterruptWatcher::install()?,
            provider_source,
            history_path,
        })
    }

    pub fn read_prompt(&mut self) -> Result<PromptLine, ReadlineError> {
        match self.editor.readline(PROMPT) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(PromptLine::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(PromptLine::Interrupted),
            Err(ReadlineError::Eof) => Ok(PromptLine::Eof),
            Err(error) => Err(error),
        }
    }

    pub fn save_history(&mut self) {
        let Some(path) = &self.history_path else {
            return;
        };
        if let Err(error) = self.editor.save_history(path) {
            warn!(path = %path.display(), %error, "failed to save prompt history");
        }
    }
}

impl HostOps for ConsoleHost {
    fn ui(&mut self) -> &mut dyn Ui {
        &mut self.console
    }

    fn read_answer(&mut self, prompt: &str) -> Option<String> {
        match self.editor.readline(prompt) {
            Ok(answer) => Some(answer),
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => None,
            Err(error) => {
                warn!(%error, "failed to read answer");
                None
            }
        }
    }

    fn available_models(&self) -> Vec<ModelName> {
        match self.provider_source {
            ProviderSource::Mock => ModelName::ALL.to_vec(),
            ProviderSource::Catalog => models::available_models(&models::process_env),
        }
    }

    fn build_provider(
        &mut self,
        model: ModelName,
    ) -> Result<Box<dyn RunProvider>, ProviderInitError> {
        models::build_provider(self.provider_source, model, &models::process_env)
    }

    fn begin_run(&mut self) -> CancelSignal {
        self.interrupts.arm()
    }
}

#[cfg(test)]
mod tests {
    use rustyline::history::DefaultHistory;

    use super::*;

    #[test]
    fn helper_completes_commands_from_line_start() {
        let history = DefaultHistory::new();
        let ctx = Context::new(&history);

        let (start, candidates) = CommandHelper
            .complete("/mo", 3, &ctx)
            .expect("completion should succeed");

        assert_eq!(start, 0);
        let names: Vec<&str> = candidates.iter().map(|pair| pair.replacement.as_str()).collect();
        assert_eq!(names, vec!["/model"]);
    }

    #[test]
    fn helper_hints_the_rest_of_a_command() {
        let history = DefaultHistory::new();
        let ctx = Context::new(&history);

        assert_eq!(
            CommandHelper.hint("/appr", 5, &ctx),
            Some("oval".to_string())
        );
        assert_eq!(CommandHelper.hint("/approval", 9, &ctx), None);
        assert_eq!(CommandHelper.hint("list files", 10, &ctx), None);
    }
}
