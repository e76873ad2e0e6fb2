use serde::{Deserialize, Serialize};
use twig_llm::GenerateOptions;
use twig_tree::{Role, Tree};

/// Shown as the assistant turn when a request fails for any reason other
/// than the user stopping it.
pub const DEFAULT_ERROR_MESSAGE: &str =
    "Sorry, something went wrong while generating a response. Please try again.";

/// A message the conversation starts with (and returns to on clear).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedMessage {
    pub role: Role,
    pub content: String,
}

impl SeedMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub initial_messages: Vec<SeedMessage>,
    pub error_message: String,
    /// Sent with every completion request.
    pub options: GenerateOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_messages: Vec::new(),
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
            options: GenerateOptions::default(),
        }
    }
}

impl SessionConfig {
    /// Prepend a system message to the seed chain.
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.initial_messages
            .insert(0, SeedMessage::new(Role::System, prompt));
        self
    }

    /// Append an assistant message to the seed chain.
    pub fn greeting(mut self, text: impl Into<String>) -> Self {
        self.initial_messages
            .push(SeedMessage::new(Role::Assistant, text));
        self
    }

    pub fn error_message(mut self, text: impl Into<String>) -> Self {
        self.error_message = text.into();
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.options.max_tokens = Some(max_tokens);
        self
    }

    pub(crate) fn initial_tree(&self) -> Tree {
        Tree::from_chain(
            self.initial_messages
                .iter()
                .map(|m| (m.role, m.content.clone())),
        )
    }
}
