use std::fmt;

/// What an interaction directory records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    User,
    Llm,
    Tool,
}

impl InteractionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Llm => "llm",
            Self::Tool => "tool",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which half of an interaction a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Request,
    Response,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Response => "response",
        }
    }
}

/// Handle to one numbered interaction inside the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InteractionId {
    number: u32,
    kind: InteractionKind,
}

impl InteractionId {
    #[must_use]
    pub fn new(number: u32, kind: InteractionKind) -> Self {
        Self { number, kind }
    }

    #[must_use]
    pub fn number(self) -> u32 {
        self.number
    }

    #[must_use]
    pub fn kind(self) -> InteractionKind {
        self.kind
    }

    /// Sequence number carried by the file for `role`: N for the request, N+1 for the response.
    #[must_use]
    pub fn sequence_for(self, role: Role) -> u32 {
        match role {
            Role::Request => self.number,
            Role::Response => self.number.saturating_add(1),
        }
    }
}

/// Per-session interaction numbering; starts at zero, first number handed out is 1.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InteractionCounter {
    current: u32,
}

impl InteractionCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances and returns the next interaction number.
    pub fn next(&mut self) -> u32 {
        self.current = self.current.saturating_add(1);
        self.current
    }

    /// Last number handed out, zero before the first interaction.
    #[must_use]
    pub fn current(&self) -> u32 {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_starts_at_one_and_never_repeats() {
        let mut counter = InteractionCounter::new();
        let numbers: Vec<u32> = (0..5).map(|_| counter.next()).collect();

        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        assert_eq!(counter.current(), 5);
    }

    #[test]
    fn response_sequence_is_one_past_request() {
        let id = InteractionId::new(2, InteractionKind::Llm);
        assert_eq!(id.sequence_for(Role::Request), 2);
        assert_eq!(id.sequence_for(Role::Response), 3);
    }
}
