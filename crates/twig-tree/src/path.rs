//! Projection of a [`Tree`] onto the flat, linear conversation a UI renders.

use std::sync::Arc;

use crate::node::{Attachment, Node, NodeId, Role};
use crate::tree::Tree;

/// One entry of the rendered conversation, with enough branch information to
/// draw a "2/3" indicator and enable the previous/next controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMessage {
    pub node: Arc<Node>,
    /// Zero-based position among the node's siblings.
    pub sibling_index: usize,
    pub sibling_count: usize,
}

impl DisplayMessage {
    pub fn id(&self) -> NodeId {
        self.node.id
    }

    pub fn role(&self) -> Role {
        self.node.role
    }

    pub fn content(&self) -> &str {
        &self.node.content
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.node.attachments
    }

    pub fn has_branches(&self) -> bool {
        self.sibling_count > 1
    }

    pub fn has_previous(&self) -> bool {
        self.sibling_index > 0
    }

    pub fn has_next(&self) -> bool {
        self.sibling_index + 1 < self.sibling_count
    }

    /// True when both entries point at the very same node allocation.
    pub fn same_node(&self, other: &DisplayMessage) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }
}

/// Walk the selected path and annotate every node with its sibling position.
pub fn flat_messages(tree: &Tree) -> Vec<DisplayMessage> {
    tree.selected_path()
        .iter()
        .filter_map(|id| {
            let node = tree.node(*id)?;
            let (sibling_index, sibling_count) = tree.sibling_position(*id)?;
            Some(DisplayMessage {
                node,
                sibling_index,
                sibling_count,
            })
        })
        .collect()
}

/// Nodes from the root down to `through`, inclusive. This is the history
/// sent with a completion request for that node. Empty for an unknown id.
pub fn history(tree: &Tree, through: NodeId) -> Vec<Arc<Node>> {
    tree.ancestry(through)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|id| tree.node(id))
        .collect()
}
