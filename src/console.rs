//! Output sinks for agent panels, status lines and the thinking spinner.

use std::io::{self, Write};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::panel::Panel;
use crate::terminal;
use crate::theme::Tone;

const SPINNER_TICK: Duration = Duration::from_millis(80);

/// Presentation surface used by the agent loop.
///
/// Only [`Ui::panel`], [`Ui::line`] and the spinner hooks are required; the
/// titled helpers map agent roles onto panel titles and tones.
pub trait Ui {
    fn panel(&mut self, panel: Panel);

    fn line(&mut self, tone: Tone, text: &str);

    fn start_thinking(&mut self) {}

    fn stop_thinking(&mut self) {}

    fn user_box(&mut self, content: &str) {
        self.panel(Panel::new("User", content, Tone::User));
    }

    fn model_box(&mut self, content: &str) {
        self.panel(Panel::new("Model", content, Tone::Model));
    }

    fn tool_call_box(&mut self, content: &str) {
        self.panel(Panel::new("Tool Call", content, Tone::Tool));
    }

    fn tool_output_box(&mut self, content: &str) {
        self.panel(Panel::new("Tool Output", content, Tone::ToolOutput));
    }

    fn info(&mut self, text: &str) {
        self.line(Tone::Info, text);
    }

    fn error(&mut self, text: &str) {
        self.line(Tone::Error, text);
    }
}

/// Stdout-backed [`Ui`] with an optional spinner while the model is thinking.
#[derive(Default)]
pub struct Console {
    spinner: Option<ProgressBar>,
    width_override: Option<usize>,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins panel width instead of probing the terminal on every render.
    pub fn with_width(width: usize) -> Self {
        Self {
            spinner: None,
            width_override: Some(width),
        }
    }

    fn width(&self) -> usize {
        self.width_override
            .unwrap_or_else(|| usize::from(terminal::columns()))
    }

    fn emit(&self, rendered: &str) {
        let write = || {
            let mut stdout = io::stdout().lock();
            let _ = stdout.write_all(rendered.as_bytes());
            let _ = stdout.flush();
        };

        match &self.spinner {
            Some(spinner) => spinner.suspend(write),
            None => write(),
        }
    }
}

impl Ui for Console {
    fn panel(&mut self, panel: Panel) {
        let rendered = panel.render(self.width());
        self.emit(&rendered);
    }

    fn line(&mut self, tone: Tone, text: &str) {
        self.emit(&format!("{}\n", tone.paint(text)));
    }

    fn start_thinking(&mut self) {
        if self.spinner.is_some() {
            return;
        }

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.magenta} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message("Thinking...");
        spinner.enable_steady_tick(SPINNER_TICK);
        self.spinner = Some(spinner);
    }

    fn stop_thinking(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

impl Drop for Console {
    fn drop(&mut self) {
        self.stop_thinking();
    }
}

/// One entry captured by [`RecordingUi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Panel { title: String, lines: Vec<String> },
    Line { tone: Tone, text: String },
    ThinkingStarted,
    ThinkingStopped,
}

/// In-memory [`Ui`] that records what would have been printed.
#[derive(Debug, Default)]
pub struct RecordingUi {
    pub entries: Vec<Recorded>,
}

impl RecordingUi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Panel titles in print order.
    pub fn panel_titles(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                Recorded::Panel { title, .. } => Some(title.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Text of every status line printed with `tone`.
    pub fn lines_with(&self, tone: Tone) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                Recorded::Line { tone: line_tone, text } if *line_tone == tone => {
                    Some(text.as_str())
                }
                _ => None,
            })
            .collect()
    }
}

impl Ui for RecordingUi {
    fn panel(&mut self, panel: Panel) {
        self.entries.push(Recorded::Panel {
            title: panel.title().to_string(),
            lines: panel.render_plain(80),
        });
    }

    fn line(&mut self, tone: Tone, text: &str) {
        self.entries.push(Recorded::Line {
            tone,
            text: text.to_string(),
        });
    }

    fn start_thinking(&mut self) {
        self.entries.push(Recorded::ThinkingStarted);
    }

    fn stop_thinking(&mut self) {
        self.entries.push(Recorded::ThinkingStopped);
    }
}
