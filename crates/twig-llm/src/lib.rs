pub mod error;
pub mod model;
pub mod request;
pub mod response;

pub use error::{Error, Result};
pub use model::{LanguageModel, LanguageModelBackend};
pub use request::{
    ChatMessage, CompletionRequest, ContentBlock, FilePart, GenerateOptions, ImagePart,
    MessageContent, RequestBuilder, Role, TextPart, request,
};
pub use response::{Completion, FinishReason, Usage};
