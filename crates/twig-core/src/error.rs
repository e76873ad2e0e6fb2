use twig_tree::{NodeId, TreeError};

/// Usage errors returned by [`ChatSession`](crate::ChatSession) intents.
///
/// Network failures are not represented here: they end up in the
/// conversation as an assistant turn and are reported through
/// [`TurnOutcome::Failed`](crate::TurnOutcome::Failed).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("a completion request is already in flight")]
    Busy,

    #[error("message has no content and no attachments")]
    EmptyMessage,

    #[error("unknown message: {0}")]
    UnknownMessage(NodeId),

    #[error("message index {index} is out of range (conversation has {len} messages)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("only user messages can be edited ({0})")]
    NotEditable(NodeId),

    #[error("no user message to regenerate from at index {index}")]
    NotRegenerable { index: usize },

    #[error("tree invariant violated: {0}")]
    Tree(#[from] TreeError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
