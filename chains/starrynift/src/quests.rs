use std::fmt;

/// Daily quests the workflow knows how to complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestKind {
    Follow,
    Online,
    /// Anything else the service hands out. Skipped with a warning.
    Unknown(String),
}

impl QuestKind {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "follow" => QuestKind::Follow,
            "online" => QuestKind::Online,
            _ => QuestKind::Unknown(name.to_string()),
        }
    }
}

impl fmt::Display for QuestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestKind::Follow => write!(f, "Follow"),
            QuestKind::Online => write!(f, "Online"),
            QuestKind::Unknown(name) => write!(f, "Unknown({})", name),
        }
    }
}

/// Per-run tally of the quest step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuestReport {
    pub completed: usize,
    pub already_completed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl QuestReport {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}
