use async_trait::async_trait;

use crate::error::Result;
use crate::request::CompletionRequest;
use crate::response::Completion;

/// A concrete, type-erased language model handle.
///
/// Wraps a [`LanguageModelBackend`] so callers never need generics.
pub struct LanguageModel {
    inner: Box<dyn LanguageModelBackend>,
}

impl LanguageModel {
    /// Wrap any backend implementation into a model.
    pub fn new(backend: impl LanguageModelBackend + 'static) -> Self {
        Self {
            inner: Box::new(backend),
        }
    }

    /// The model identifier sent as `model` on every request.
    pub fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    /// The provider name this model belongs to.
    pub fn provider(&self) -> &str {
        self.inner.provider()
    }

    /// Request a single, non-streamed completion.
    ///
    /// Dropping the returned future aborts the request.
    pub async fn complete(&self, request: impl Into<CompletionRequest>) -> Result<Completion> {
        self.inner.complete(request.into()).await
    }
}

/// Trait that provider crates implement for a specific model.
#[async_trait]
pub trait LanguageModelBackend: Send + Sync {
    fn model_id(&self) -> &str;
    fn provider(&self) -> &str;
    async fn complete(&self, request: CompletionRequest) -> Result<Completion>;
}
