#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    New,
    Model,
    Approval,
    Help,
    Quit,
    Unknown(String),
}

/// Command names offered by line completion, in menu order.
pub const SLASH_COMMANDS: &[&str] = &["/new", "/model", "/approval", "/help", "/quit"];

pub const HELP_TEXT: &str = "Commands: /new (fresh session), /model (choose model), /approval (toggle approval), /help, /quit";

pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let command = trimmed
        .split_whitespace()
        .next()
        .unwrap_or(trimmed)
        .to_ascii_lowercase();

    let parsed = match command.as_str() {
        "/new" => SlashCommand::New,
        "/model" => SlashCommand::Model,
        "/approval" => SlashCommand::Approval,
        "/help" => SlashCommand::Help,
        "/quit" | "/exit" => SlashCommand::Quit,
        _ => SlashCommand::Unknown(command),
    };

    Some(parsed)
}

/// Slash commands that start with `prefix`, for tab completion.
pub fn complete_slash_command(prefix: &str) -> Vec<&'static str> {
    if !prefix.starts_with('/') {
        return Vec::new();
    }

    SLASH_COMMANDS
        .iter()
        .copied()
        .filter(|command| command.starts_with(prefix))
        .collect()
}
