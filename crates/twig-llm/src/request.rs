use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level request
// ---------------------------------------------------------------------------

/// The frozen, built request. Produced by a builder and consumed by `complete()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub options: GenerateOptions,
}

/// Knobs that control generation behavior.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Provider-agnostic request builder.
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    pub(crate) messages: Vec<ChatMessage>,
    pub(crate) options: GenerateOptions,
}

/// Convenience entry point: `twig_llm::request()`.
pub fn request() -> RequestBuilder {
    RequestBuilder::default()
}

impl RequestBuilder {
    // -- messages --

    pub fn system(&mut self, text: impl Into<String>) -> &mut Self {
        self.messages.push(ChatMessage::system(text));
        self
    }

    pub fn user(&mut self, text: impl Into<String>) -> &mut Self {
        self.messages.push(ChatMessage::user(text));
        self
    }

    pub fn assistant(&mut self, text: impl Into<String>) -> &mut Self {
        self.messages.push(ChatMessage::assistant(text));
        self
    }

    pub fn message(&mut self, message: ChatMessage) -> &mut Self {
        self.messages.push(message);
        self
    }

    pub fn messages(&mut self, messages: impl IntoIterator<Item = ChatMessage>) -> &mut Self {
        self.messages.extend(messages);
        self
    }

    // -- options --

    pub fn temperature(&mut self, t: f32) -> &mut Self {
        self.options.temperature = Some(t);
        self
    }

    pub fn max_tokens(&mut self, n: u32) -> &mut Self {
        self.options.max_tokens = Some(n);
        self
    }

    /// Replace all options at once.
    pub fn options(&mut self, options: GenerateOptions) -> &mut Self {
        self.options = options;
        self
    }

    // -- build --

    pub fn build(self) -> CompletionRequest {
        self.into()
    }
}

impl From<RequestBuilder> for CompletionRequest {
    fn from(b: RequestBuilder) -> Self {
        CompletionRequest {
            messages: b.messages,
            options: b.options,
        }
    }
}

// ---------------------------------------------------------------------------
// Content blocks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPart {
    pub text: String,
}

/// An image referenced by URL. Either an `https:` URL or a `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePart {
    pub url: String,
}

/// An inline file. `data` is a `data:` URI carrying the file bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePart {
    pub filename: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentBlock {
    Text(TextPart),
    Image(ImagePart),
    File(FilePart),
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text(TextPart { text: text.into() })
    }

    pub fn image(url: impl Into<String>) -> Self {
        ContentBlock::Image(ImagePart { url: url.into() })
    }

    pub fn file(filename: impl Into<String>, data: impl Into<String>) -> Self {
        ContentBlock::File(FilePart {
            filename: filename.into(),
            data: data.into(),
        })
    }
}

/// Message body: plain text, or an ordered list of typed blocks when the
/// message carries attachments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl MessageContent {
    /// Concatenated text of the message, ignoring non-text blocks.
    pub fn text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::Text(t) => Some(t.text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

// ---------------------------------------------------------------------------
// Convenience constructors
// ---------------------------------------------------------------------------

impl ChatMessage {
    pub fn new(role: Role, content: MessageContent) -> Self {
        Self { role, content }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, MessageContent::Text(text.into()))
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, MessageContent::Text(text.into()))
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, MessageContent::Text(text.into()))
    }
}
