use std::fmt::Write;

use twig_tree::{AttachmentKind, DisplayMessage, Role};

const INDENT: &str = "    ";

/// Render the whole visible conversation, one numbered block per message.
pub fn conversation(messages: &[DisplayMessage]) -> String {
    if messages.is_empty() {
        return "(empty conversation)\n".to_string();
    }
    messages
        .iter()
        .enumerate()
        .map(|(index, message)| self::message(index, message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `index` is zero-based; it is shown one-based.
pub fn message(index: usize, message: &DisplayMessage) -> String {
    let mut out = format!("[{}] {}", index + 1, label(message.role()));
    if message.has_branches() {
        let _ = write!(
            out,
            " ({}/{})",
            message.sibling_index + 1,
            message.sibling_count
        );
    }
    out.push('\n');

    for line in message.content().lines() {
        out.push_str(INDENT);
        out.push_str(line);
        out.push('\n');
    }
    for attachment in message.attachments() {
        let kind = match attachment.kind {
            AttachmentKind::Image => "image",
            AttachmentKind::File => "file",
        };
        let _ = writeln!(out, "{INDENT}+ {kind}: {}", attachment.name);
    }
    out
}

fn label(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "you",
        Role::Assistant => "twig",
    }
}
