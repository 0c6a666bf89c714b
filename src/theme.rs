use colored::{ColoredString, Colorize};

/// Semantic color roles for everything the agent prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    User,
    Model,
    Tool,
    ToolOutput,
    System,
    Info,
    Error,
}

impl Tone {
    pub fn paint(self, text: &str) -> ColoredString {
        match self {
            Self::User => text.cyan().bold(),
            Self::Model => text.magenta().bold(),
            Self::Tool => text.yellow().bold(),
            Self::ToolOutput => text.bright_yellow(),
            Self::System => text.white().dimmed(),
            Self::Info => text.green(),
            Self::Error => text.red().bold(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Tone;

    #[test]
    fn paint_preserves_text_when_colors_are_disabled() {
        colored::control::set_override(false);
        assert_eq!(Tone::Error.paint("boom").to_string(), "boom");
        colored::control::unset_override();
    }
}
