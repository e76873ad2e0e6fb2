use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque node identifier, unique across trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg_{}", self.0.simple())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub kind: AttachmentKind,
    pub name: String,
    /// A `data:` URI or an `https:` URL.
    pub data: String,
}

impl Attachment {
    pub fn new(kind: AttachmentKind, name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            id: format!("att_{}", Uuid::new_v4().simple()),
            kind,
            name: name.into(),
            data: data.into(),
        }
    }
}

/// One message turn.
///
/// Nodes are only ever created by [`Tree::add_node`](crate::Tree::add_node).
/// Adding a child produces a new copy of the parent with a longer
/// `children_ids`; the old copy stays intact in older tree snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    pub parent_id: Option<NodeId>,
    /// Creation order, which is also the sibling order.
    pub children_ids: Vec<NodeId>,
}

impl Node {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.children_ids.is_empty()
    }
}
