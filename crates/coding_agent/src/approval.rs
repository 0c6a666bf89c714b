use std::fmt;

pub const APPROVAL_PROMPT: &str = "Approval required. Execute this tool call? [y/N]";
pub const DENIED_MESSAGE: &str = "Denied. Tool call cancelled.";
pub const DENIED_TOOL_ERROR: &str = "User denied tool call";

/// Whether tool calls wait for the user before running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApprovalMode {
    #[default]
    Approval,
    Yolo,
}

impl ApprovalMode {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Approval => Self::Yolo,
            Self::Yolo => Self::Approval,
        }
    }

    pub fn requires_approval(self) -> bool {
        self == Self::Approval
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Approval => "Approval",
            Self::Yolo => "YOLO",
        }
    }
}

impl fmt::Display for ApprovalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Only `y` and `yes` approve; anything else, including no answer, denies.
pub fn is_approved(answer: Option<&str>) -> bool {
    answer.is_some_and(|answer| {
        let answer = answer.trim();
        answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
    })
}
