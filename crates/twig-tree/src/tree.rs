use std::sync::Arc;

use imbl::HashMap;

use crate::error::{Result, TreeError};
use crate::node::{Attachment, Node, NodeId, Role};

/// Every message ever created in a conversation, plus the one root-to-leaf
/// walk through it that is currently displayed.
///
/// A `Tree` is a value: operations return a new tree and leave `self`
/// untouched. The id map is a persistent hash map, so a new snapshot shares
/// all unchanged entries with the old one and only the node whose children
/// changed is copied.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: HashMap<NodeId, Arc<Node>>,
    root_ids: Arc<Vec<NodeId>>,
    selected_path: Arc<Vec<NodeId>>,
}

impl Tree {
    /// An empty tree with nothing selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// A single chain of messages, each the child of the one before, with
    /// the whole chain selected. Used to seed a conversation.
    pub fn from_chain<S: Into<String>>(messages: impl IntoIterator<Item = (Role, S)>) -> Self {
        let mut nodes: HashMap<NodeId, Arc<Node>> = HashMap::new();
        let mut path: Vec<NodeId> = Vec::new();

        for (role, content) in messages {
            let id = NodeId::generate();
            let parent_id = path.last().copied();
            if let Some(parent) = parent_id.and_then(|p| nodes.get_mut(&p)) {
                Arc::make_mut(parent).children_ids.push(id);
            }
            nodes.insert(
                id,
                Arc::new(Node {
                    id,
                    role,
                    content: content.into(),
                    attachments: Vec::new(),
                    parent_id,
                    children_ids: Vec::new(),
                }),
            );
            path.push(id);
        }

        Tree {
            nodes,
            root_ids: Arc::new(path.first().copied().into_iter().collect()),
            selected_path: Arc::new(path),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id).map(Arc::as_ref)
    }

    /// Shared handle to a node, for callers that want to keep it past the
    /// lifetime of this snapshot.
    pub fn node(&self, id: NodeId) -> Option<Arc<Node>> {
        self.nodes.get(&id).cloned()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().map(Arc::as_ref)
    }

    pub fn root_ids(&self) -> &[NodeId] {
        &self.root_ids
    }

    pub fn selected_path(&self) -> &[NodeId] {
        &self.selected_path
    }

    /// Last node on the selected path.
    pub fn leaf(&self) -> Option<NodeId> {
        self.selected_path.last().copied()
    }

    /// Allocate a fresh node and attach it under `parent_id`, or as a new
    /// root when `parent_id` is `None`. The selected path is unchanged.
    pub fn add_node(
        &self,
        role: Role,
        content: impl Into<String>,
        parent_id: Option<NodeId>,
        attachments: Vec<Attachment>,
    ) -> Result<(Tree, NodeId)> {
        let id = NodeId::generate();
        let node = Node {
            id,
            role,
            content: content.into(),
            attachments,
            parent_id,
            children_ids: Vec::new(),
        };

        let mut nodes = self.nodes.clone();
        let mut root_ids = Arc::clone(&self.root_ids);

        match parent_id {
            Some(parent_id) => {
                let parent = nodes
                    .get(&parent_id)
                    .ok_or(TreeError::UnknownNode(parent_id))?;
                let mut parent = Node::clone(parent);
                parent.children_ids.push(id);
                nodes.insert(parent_id, Arc::new(parent));
            }
            None => Arc::make_mut(&mut root_ids).push(id),
        }
        nodes.insert(id, Arc::new(node));

        let tree = Tree {
            nodes,
            root_ids,
            selected_path: Arc::clone(&self.selected_path),
        };
        Ok((tree, id))
    }

    /// The ordered group `id` belongs to: its parent's children, or the
    /// root ids for a root node.
    pub fn siblings(&self, id: NodeId) -> Option<&[NodeId]> {
        let node = self.get(id)?;
        match node.parent_id {
            Some(parent_id) => self.get(parent_id).map(|p| p.children_ids.as_slice()),
            None => Some(self.root_ids.as_slice()),
        }
    }

    /// Position of `id` within its sibling group, and the group's size.
    pub fn sibling_position(&self, id: NodeId) -> Option<(usize, usize)> {
        let siblings = self.siblings(id)?;
        let index = siblings.iter().position(|s| *s == id)?;
        Some((index, siblings.len()))
    }

    /// The sibling `offset` places away from `id`. `None` when the offset
    /// runs off either end of the group (or `id` is unknown).
    pub fn sibling_at_offset(&self, id: NodeId, offset: isize) -> Option<NodeId> {
        let siblings = self.siblings(id)?;
        let index = siblings.iter().position(|s| *s == id)?;
        let target = index.checked_add_signed(offset)?;
        siblings.get(target).copied()
    }

    /// The root-to-node chain ending at `id`, inclusive.
    pub fn ancestry(&self, id: NodeId) -> Option<Vec<NodeId>> {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.get(current)?;
            chain.push(current);
            cursor = node.parent_id;
        }
        chain.reverse();
        Some(chain)
    }

    /// Full root-to-leaf path through `id`. Below `id` the walk always takes
    /// the most recently created child.
    pub fn recompute_path_from(&self, id: NodeId) -> Option<Vec<NodeId>> {
        let mut path = self.ancestry(id)?;
        let mut cursor = self.get(id)?;
        while let Some(&last) = cursor.children_ids.last() {
            path.push(last);
            cursor = self.get(last)?;
        }
        Some(path)
    }

    /// Replace the selected path. The path must start at a root and each
    /// entry must be a child of the one before it; an empty path is allowed.
    pub fn with_selected_path(&self, path: Vec<NodeId>) -> Result<Tree> {
        self.check_path(&path)?;
        Ok(Tree {
            nodes: self.nodes.clone(),
            root_ids: Arc::clone(&self.root_ids),
            selected_path: Arc::new(path),
        })
    }

    /// Select the path through `id` as computed by
    /// [`recompute_path_from`](Self::recompute_path_from).
    pub fn select(&self, id: NodeId) -> Result<Tree> {
        let path = self
            .recompute_path_from(id)
            .ok_or(TreeError::UnknownNode(id))?;
        self.with_selected_path(path)
    }

    /// Cut the selected path so it ends at `id`, which must be on it.
    pub fn truncate_path_at(&self, id: NodeId) -> Result<Tree> {
        let position = self
            .selected_path
            .iter()
            .position(|p| *p == id)
            .ok_or(TreeError::UnknownNode(id))?;
        self.with_selected_path(self.selected_path[..=position].to_vec())
    }

    fn check_path(&self, path: &[NodeId]) -> Result<()> {
        let mut expected_parent: Option<NodeId> = None;
        for (position, id) in path.iter().enumerate() {
            let node = self.get(*id).ok_or(TreeError::UnknownNode(*id))?;
            if node.parent_id != expected_parent {
                return Err(TreeError::BrokenPath { position });
            }
            expected_parent = Some(*id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(tree: &Tree, role: Role, content: &str, parent: Option<NodeId>) -> (Tree, NodeId) {
        tree.add_node(role, content, parent, Vec::new())
            .expect("parent exists")
    }

    #[test]
    fn empty_tree_has_nothing_selected() {
        let tree = Tree::new();
        assert!(tree.is_empty());
        assert!(tree.root_ids().is_empty());
        assert!(tree.selected_path().is_empty());
        assert_eq!(tree.leaf(), None);
    }

    #[test]
    fn from_chain_selects_every_seed() {
        let tree = Tree::from_chain([
            (Role::System, "You are a helpful assistant."),
            (Role::Assistant, "Hi! Ask me anything."),
        ]);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.root_ids().len(), 1);
        assert_eq!(tree.selected_path().len(), 2);
        assert!(tree.with_selected_path(tree.selected_path().to_vec()).is_ok());

        let empty = Tree::from_chain(Vec::<(Role, String)>::new());
        assert!(empty.is_empty());
        assert!(empty.root_ids().is_empty());
    }

    #[test]
    fn add_node_links_parent_and_child() {
        let (tree, root) = add(&Tree::new(), Role::User, "Oi", None);
        let (tree, reply) = add(&tree, Role::Assistant, "Olá!", Some(root));

        assert_eq!(tree.root_ids(), &[root]);
        assert_eq!(tree.get(root).unwrap().children_ids, vec![reply]);
        assert_eq!(tree.get(reply).unwrap().parent_id, Some(root));
        assert!(tree.selected_path().is_empty(), "add_node never selects");
    }

    #[test]
    fn add_node_leaves_input_snapshot_untouched() {
        let (before, root) = add(&Tree::new(), Role::User, "Oi", None);
        let (after, child) = add(&before, Role::Assistant, "Olá!", Some(root));

        assert!(before.get(root).unwrap().children_ids.is_empty());
        assert!(!before.contains(child));
        assert!(after.contains(child));
    }

    #[test]
    fn untouched_nodes_are_shared_between_snapshots() {
        let tree = Tree::from_chain([(Role::System, "be kind"), (Role::User, "Oi")]);
        let [system, user] = [tree.selected_path()[0], tree.selected_path()[1]];
        let (after, reply) = add(&tree, Role::Assistant, "Olá!", Some(user));

        assert!(Arc::ptr_eq(
            &tree.node(system).unwrap(),
            &after.node(system).unwrap()
        ));
        assert!(!Arc::ptr_eq(&tree.node(user).unwrap(), &after.node(user).unwrap()));
        assert_eq!(after.get(user).unwrap().children_ids, vec![reply]);
        assert!(tree.get(user).unwrap().children_ids.is_empty());
    }

    #[test]
    fn add_node_rejects_unknown_parent() {
        let (_, foreign) = add(&Tree::new(), Role::User, "elsewhere", None);
        let err = Tree::new()
            .add_node(Role::User, "Oi", Some(foreign), Vec::new())
            .unwrap_err();
        assert_eq!(err, TreeError::UnknownNode(foreign));
    }

    #[test]
    fn siblings_cover_roots_and_children() {
        let (tree, a) = add(&Tree::new(), Role::User, "a", None);
        let (tree, b) = add(&tree, Role::User, "b", None);
        let (tree, a1) = add(&tree, Role::Assistant, "a1", Some(a));
        let (tree, a2) = add(&tree, Role::Assistant, "a2", Some(a));

        assert_eq!(tree.siblings(b), Some(&[a, b][..]));
        assert_eq!(tree.siblings(a2), Some(&[a1, a2][..]));
        assert_eq!(tree.sibling_position(a2), Some((1, 2)));
    }

    #[test]
    fn sibling_at_offset_stops_at_the_ends() {
        let (tree, parent) = add(&Tree::new(), Role::User, "q", None);
        let (tree, first) = add(&tree, Role::Assistant, "1", Some(parent));
        let (tree, second) = add(&tree, Role::Assistant, "2", Some(parent));
        let (tree, third) = add(&tree, Role::Assistant, "3", Some(parent));

        assert_eq!(tree.sibling_at_offset(second, -1), Some(first));
        assert_eq!(tree.sibling_at_offset(second, 1), Some(third));
        assert_eq!(tree.sibling_at_offset(first, -1), None);
        assert_eq!(tree.sibling_at_offset(third, 1), None);
        assert_eq!(tree.sibling_at_offset(first, 2), Some(third));
        assert_eq!(tree.sibling_at_offset(parent, 1), None, "lone root");
    }

    #[test]
    fn recompute_path_descends_into_newest_branch() {
        let (tree, q) = add(&Tree::new(), Role::User, "q", None);
        let (tree, old) = add(&tree, Role::Assistant, "old", Some(q));
        let (tree, old_follow) = add(&tree, Role::User, "follow-up", Some(old));
        let (tree, new) = add(&tree, Role::Assistant, "new", Some(q));

        assert_eq!(tree.recompute_path_from(q), Some(vec![q, new]));
        assert_eq!(tree.recompute_path_from(old), Some(vec![q, old, old_follow]));
        assert_eq!(tree.recompute_path_from(old_follow), Some(vec![q, old, old_follow]));
    }

    #[test]
    fn with_selected_path_rejects_gaps() {
        let (tree, q) = add(&Tree::new(), Role::User, "q", None);
        let (tree, a) = add(&tree, Role::Assistant, "a", Some(q));
        let (tree, q2) = add(&tree, Role::User, "q2", Some(a));

        assert!(tree.with_selected_path(vec![q, a, q2]).is_ok());
        assert_eq!(
            tree.with_selected_path(vec![q, q2]).unwrap_err(),
            TreeError::BrokenPath { position: 1 }
        );
        assert_eq!(
            tree.with_selected_path(vec![a]).unwrap_err(),
            TreeError::BrokenPath { position: 0 }
        );
    }

    #[test]
    fn truncate_path_keeps_prefix() {
        let (tree, q) = add(&Tree::new(), Role::User, "q", None);
        let (tree, a) = add(&tree, Role::Assistant, "a", Some(q));
        let tree = tree.select(a).unwrap();

        let truncated = tree.truncate_path_at(q).unwrap();
        assert_eq!(truncated.selected_path(), &[q]);
        assert_eq!(tree.selected_path(), &[q, a]);
        assert!(truncated.contains(a), "truncation hides, never deletes");
    }
}
