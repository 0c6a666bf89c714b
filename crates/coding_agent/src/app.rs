use agent_provider::{CancelSignal, ProviderInitError, RunId, RunMessage, RunProvider, RunRequest};
use glassbox::Ui;
use session_log::SessionLogger;
use tracing::info;

use crate::approval::ApprovalMode;
use crate::commands::{parse_slash_command, SlashCommand, HELP_TEXT};
use crate::models::{available_models_line, ModelName, MODEL_MENU};
use crate::runtime::{run_turn, TurnOutcome, TurnSettings};
use crate::tools::{shell_tool_definition, ShellTool};

const INIT_TIP: &str = "Tip: create a .env with the appropriate API key(s).";
const MENU_ANSWER_PROMPT: &str = "Choice: ";

/// Everything the app needs from the process it runs in.
pub trait HostOps {
    fn ui(&mut self) -> &mut dyn Ui;
    /// Reads one answer line; `None` on end of input or interrupt.
    fn read_answer(&mut self, prompt: &str) -> Option<String>;
    fn available_models(&self) -> Vec<ModelName>;
    fn build_provider(
        &mut self,
        model: ModelName,
    ) -> Result<Box<dyn RunProvider>, ProviderInitError>;
    /// Returns a cleared cancel signal wired to the user's interrupt key.
    fn begin_run(&mut self) -> CancelSignal;
    fn end_run(&mut self) {}
}

#[derive(Debug, Clone)]
pub struct App {
    model: ModelName,
    approval: ApprovalMode,
    conversation: Vec<RunMessage>,
    system_instructions: String,
    shell: ShellTool,
    next_run_id: RunId,
    pub should_exit: bool,
}

impl App {
    pub fn new(
        model: ModelName,
        approval: ApprovalMode,
        system_instructions: impl Into<String>,
        shell: ShellTool,
    ) -> Self {
        Self {
            model,
            approval,
            conversation: Vec::new(),
            system_instructions: system_instructions.into(),
            shell,
            next_run_id: 1,
            should_exit: false,
        }
    }

    pub fn model(&self) -> ModelName {
        self.model
    }

    pub fn approval(&self) -> ApprovalMode {
        self.approval
    }

    pub fn conversation(&self) -> &[RunMessage] {
        &self.conversation
    }

    pub fn system_instructions(&self) -> &str {
        &self.system_instructions
    }

    /// Handles one submitted line: a slash command or a prompt for the model.
    pub fn on_submit(&mut self, line: &str, logger: &mut SessionLogger, host: &mut dyn HostOps) {
        let prompt = line.trim();
        if prompt.is_empty() {
            return;
        }

        match parse_slash_command(prompt) {
            Some(command) => self.on_command(command, logger, host),
            None => self.run_prompt(prompt, logger, host),
        }
    }

    fn on_command(
        &mut self,
        command: SlashCommand,
        logger: &mut SessionLogger,
        host: &mut dyn HostOps,
    ) {
        match command {
            SlashCommand::New => {
                self.conversation.clear();
                logger.start_next_session();
                host.ui().info("Session cleared.");
                host.ui().info(&format!(
                    "Session logging to: {}",
                    logger.session_dir().display()
                ));
            }
            SlashCommand::Model => {
                if let Some(model) = select_model(host) {
                    self.model = model;
                }
            }
            SlashCommand::Approval => {
                self.approval = self.approval.toggled();
                info!(mode = %self.approval, "approval mode changed");
                host.ui()
                    .info(&format!("Mode switched to {} mode.", self.approval));
            }
            SlashCommand::Help => host.ui().info(HELP_TEXT),
            SlashCommand::Quit => {
                self.should_exit = true;
                host.ui().info("Exiting. Bye.");
            }
            SlashCommand::Unknown(name) => {
                host.ui()
                    .error(&format!("Unknown command: {name}. Type /help for commands."));
            }
        }
    }

    fn run_prompt(&mut self, prompt: &str, logger: &mut SessionLogger, host: &mut dyn HostOps) {
        logger.log_user_input(prompt);
        host.ui().user_box(prompt);

        let Some(provider) = self.provider_for_turn(host) else {
            return;
        };

        let run_id = self.next_run_id;
        self.next_run_id += 1;

        let mut messages = self.conversation.clone();
        messages.push(RunMessage::UserText {
            text: prompt.to_string(),
        });
        let request = RunRequest {
            run_id,
            messages,
            instructions: self.system_instructions.clone(),
            tools: vec![shell_tool_definition()],
        };

        let cancel = host.begin_run();
        host.ui().start_thinking();
        let outcome = run_turn(
            provider.as_ref(),
            request,
            cancel,
            logger,
            host,
            TurnSettings {
                system_prompt: &self.system_instructions,
                approval: self.approval,
                shell: &self.shell,
            },
        );
        host.ui().stop_thinking();
        host.end_run();

        match outcome {
            TurnOutcome::Completed { reply, messages } => {
                if !reply.is_empty() {
                    host.ui().model_box(&reply);
                }
                self.conversation.push(RunMessage::UserText {
                    text: prompt.to_string(),
                });
                self.conversation.extend(messages);
            }
            TurnOutcome::Denied => {}
            TurnOutcome::Cancelled => host.ui().error("Generation aborted."),
            TurnOutcome::Failed(error) => host.ui().error(&format!("Error: {error}")),
        }
    }

    /// Builds the provider for the selected model, offering one reselection on failure.
    fn provider_for_turn(&mut self, host: &mut dyn HostOps) -> Option<Box<dyn RunProvider>> {
        let error = match host.build_provider(self.model) {
            Ok(provider) => return Some(provider),
            Err(error) => error,
        };

        host.ui().error(&format!(
            "Failed to initialize model '{}': {error}",
            self.model
        ));
        host.ui().info(INIT_TIP);

        self.model = select_model(host)?;
        match host.build_provider(self.model) {
            Ok(provider) => Some(provider),
            Err(error) => {
                host.ui()
                    .error(&format!("Still failed to initialize: {error}"));
                None
            }
        }
    }
}

/// Shows the numbered menu and reads a choice.
fn select_model(host: &mut dyn HostOps) -> Option<ModelName> {
    let available = host.available_models();
    host.ui().info(MODEL_MENU);
    host.ui().info(&available_models_line(&available));

    let answer = host.read_answer(MENU_ANSWER_PROMPT);
    match answer.as_deref().and_then(ModelName::from_menu_choice) {
        Some(model) => {
            info!(model = %model, "model selected");
            host.ui().info(&format!("Model set to {model}"));
            Some(model)
        }
        None => {
            host.ui().error("Invalid selection.");
            None
        }
    }
}
