pub mod error;
pub mod node;
pub mod path;
pub mod tree;

pub use error::{Result, TreeError};
pub use node::{Attachment, AttachmentKind, Node, NodeId, Role};
pub use path::{DisplayMessage, flat_messages, history};
pub use tree::Tree;
