#![allow(dead_code)]

use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use agent_provider::{CancelSignal, ProviderInitError, RunProvider};
use agent_provider_mock::{MockProvider, MockStep};
use coding_agent::app::HostOps;
use coding_agent::models::ModelName;
use coding_agent::tools::ShellTool;
use glassbox::{Recorded, RecordingUi, Tone, Ui};

/// Scripted host: queued answers, queued provider scripts, recorded output.
pub struct HostSpy {
    pub ui: RecordingUi,
    pub answers: VecDeque<String>,
    pub answer_prompts: Vec<String>,
    pub scripts: VecDeque<Vec<MockStep>>,
    pub available: Vec<ModelName>,
    pub failing_models: Vec<ModelName>,
    pub built: Vec<ModelName>,
    /// Raises the cancel flag whenever an answer is read, as if Ctrl+C
    /// arrived right after the user approved.
    pub interrupt_on_answer: bool,
    pub runs_begun: usize,
    pub runs_ended: usize,
    cancel: CancelSignal,
}

impl HostSpy {
    pub fn new() -> Self {
        Self {
            ui: RecordingUi::new(),
            answers: VecDeque::new(),
            answer_prompts: Vec::new(),
            scripts: VecDeque::new(),
            available: ModelName::ALL.to_vec(),
            failing_models: Vec::new(),
            built: Vec::new(),
            interrupt_on_answer: false,
            runs_begun: 0,
            runs_ended: 0,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_script(mut self, script: Vec<MockStep>) -> Self {
        self.scripts.push_back(script);
        self
    }

    pub fn with_answers(mut self, answers: &[&str]) -> Self {
        self.answers
            .extend(answers.iter().map(|answer| answer.to_string()));
        self
    }

    pub fn infos(&self) -> Vec<&str> {
        self.ui.lines_with(Tone::Info)
    }

    pub fn errors(&self) -> Vec<&str> {
        self.ui.lines_with(Tone::Error)
    }

    /// Content of every panel titled `title`, borders stripped.
    pub fn panel_texts(&self, title: &str) -> Vec<String> {
        self.ui
            .entries
            .iter()
            .filter_map(|entry| match entry {
                Recorded::Panel {
                    title: panel_title,
                    lines,
                } if panel_title == title => Some(panel_body(lines)),
                _ => None,
            })
            .collect()
    }
}

fn panel_body(lines: &[String]) -> String {
    let body = lines.get(1..lines.len().saturating_sub(1)).unwrap_or_default();
    body.iter()
        .map(|line| {
            line.trim_start_matches("│ ")
                .trim_end_matches(" │")
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl HostOps for HostSpy {
    fn ui(&mut self) -> &mut dyn Ui {
        &mut self.ui
    }

    fn read_answer(&mut self, prompt: &str) -> Option<String> {
        self.answer_prompts.push(prompt.to_string());
        if self.interrupt_on_answer {
            self.cancel.store(true, Ordering::SeqCst);
        }
        self.answers.pop_front()
    }

    fn available_models(&self) -> Vec<ModelName> {
        self.available.clone()
    }

    fn build_provider(
        &mut self,
        model: ModelName,
    ) -> Result<Box<dyn RunProvider>, ProviderInitError> {
        self.built.push(model);
        if self.failing_models.contains(&model) {
            return Err(ProviderInitError::new(format!(
                "{} is not set",
                model.api_key_env_var()
            )));
        }

        let script = self
            .scripts
            .pop_front()
            .unwrap_or_else(|| vec![MockStep::EchoPrompt]);
        Ok(Box::new(MockProvider::with_model_id(model.as_str(), script)))
    }

    fn begin_run(&mut self) -> CancelSignal {
        self.runs_begun += 1;
        self.cancel.store(false, Ordering::SeqCst);
        Arc::clone(&self.cancel)
    }

    fn end_run(&mut self) {
        self.runs_ended += 1;
    }
}

/// Files below `dir`, relative to it, sorted.
pub fn tree(dir: &Path) -> Vec<String> {
    fn walk(base: &Path, dir: &Path, out: &mut Vec<String>) {
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        for entry in entries {
            let path = entry.expect("entry should be readable").path();
            if path.is_dir() {
                walk(base, &path, out);
            } else {
                let relative = path.strip_prefix(base).expect("path under base");
                out.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
    }

    let mut out = Vec::new();
    walk(dir, dir, &mut out);
    out.sort();
    out
}

pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|error| panic!("{}: {error}", path.display()))
}

/// Shell confined to `dir`: no profile files, `HOME` pointed at `dir`.
pub fn isolated_shell(dir: &Path) -> ShellTool {
    ShellTool::new(None)
        .without_startup_files()
        .with_cwd(dir)
        .with_env("HOME", dir.to_string_lossy())
        .without_env("BASH_ENV")
        .without_env("ENV")
}
