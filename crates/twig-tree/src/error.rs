use crate::node::NodeId;

/// Invariant violations. The tree only ever hands out ids it created, so
/// seeing one of these means a caller mixed up ids from another tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("path is not a contiguous root-to-node walk (breaks at position {position})")]
    BrokenPath { position: usize },
}

pub type Result<T> = std::result::Result<T, TreeError>;
