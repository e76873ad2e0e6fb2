//! Serializes the ancestor chain of a node into completion-request messages.

use std::sync::Arc;

use twig_llm::{ChatMessage, ContentBlock, MessageContent};
use twig_tree::{AttachmentKind, Node, Role};

pub fn to_chat_messages(history: &[Arc<Node>]) -> Vec<ChatMessage> {
    history.iter().map(|node| to_chat_message(node)).collect()
}

fn to_chat_message(node: &Node) -> ChatMessage {
    let role = match node.role {
        Role::System => twig_llm::Role::System,
        Role::User => twig_llm::Role::User,
        Role::Assistant => twig_llm::Role::Assistant,
    };

    if node.attachments.is_empty() {
        return ChatMessage::new(role, MessageContent::Text(node.content.clone()));
    }

    let mut blocks = Vec::with_capacity(node.attachments.len() + 1);
    if !node.content.is_empty() {
        blocks.push(ContentBlock::text(&node.content));
    }
    blocks.extend(node.attachments.iter().map(|a| match a.kind {
        AttachmentKind::Image => ContentBlock::image(&a.data),
        AttachmentKind::File => ContentBlock::file(&a.name, &a.data),
    }));
    ChatMessage::new(role, MessageContent::Blocks(blocks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use twig_tree::{Attachment, Tree, history};

    #[test]
    fn text_only_nodes_stay_plain() {
        let tree = Tree::from_chain([(Role::System, "be brief"), (Role::User, "Oi")]);
        let leaf = tree.leaf().unwrap();

        let messages = to_chat_messages(&history(&tree, leaf));
        assert_eq!(
            messages,
            vec![ChatMessage::system("be brief"), ChatMessage::user("Oi")]
        );
    }

    #[test]
    fn attachments_follow_the_text_block() {
        let attachments = vec![
            Attachment {
                id: "att_1".into(),
                kind: AttachmentKind::Image,
                name: "cat.png".into(),
                data: "data:image/png;base64,iVBORw0KGgo=".into(),
            },
            Attachment {
                id: "att_2".into(),
                kind: AttachmentKind::File,
                name: "notes.txt".into(),
                data: "data:text/plain;base64,aGk=".into(),
            },
        ];
        let (tree, id) = Tree::new()
            .add_node(Role::User, "what's this?", None, attachments)
            .unwrap();

        let messages = to_chat_messages(&history(&tree, id));
        assert_eq!(
            messages[0].content,
            MessageContent::Blocks(vec![
                ContentBlock::text("what's this?"),
                ContentBlock::image("data:image/png;base64,iVBORw0KGgo="),
                ContentBlock::file("notes.txt", "data:text/plain;base64,aGk="),
            ])
        );
    }

    #[test]
    fn attachment_only_message_has_no_text_block() {
        let attachments = vec![Attachment {
            id: "att_1".into(),
            kind: AttachmentKind::Image,
            name: "cat.png".into(),
            data: "https://example.com/cat.png".into(),
        }];
        let (tree, id) = Tree::new()
            .add_node(Role::User, "", None, attachments)
            .unwrap();

        let messages = to_chat_messages(&history(&tree, id));
        assert_eq!(
            messages[0].content,
            MessageContent::Blocks(vec![ContentBlock::image("https://example.com/cat.png")])
        );
    }
}
