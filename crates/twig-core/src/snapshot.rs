use twig_tree::DisplayMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Submitting,
}

/// Everything a front end needs to render the session. Published on every
/// state change through [`ChatSession::subscribe`](crate::ChatSession::subscribe).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub messages: Vec<DisplayMessage>,
    pub status: SessionStatus,
    pub input_draft: String,
}

impl SessionSnapshot {
    pub fn is_loading(&self) -> bool {
        self.status == SessionStatus::Submitting
    }
}
