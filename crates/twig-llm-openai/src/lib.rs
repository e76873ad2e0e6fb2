mod client;
mod convert;
mod types;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use twig_llm::request::CompletionRequest;
use twig_llm::response::Completion;
use twig_llm::{Error, LanguageModel, LanguageModelBackend};

pub use convert::{api_error, parse_response};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Configuration for a Chat Completions compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// Sent as a bearer token. Left out entirely when empty, which is what a
    /// same-origin proxy that holds the real key expects.
    pub api_key: String,
    pub base_url: String,
    /// Whole-request timeout. A timed-out request surfaces as [`Error::Http`].
    pub timeout: Duration,
    pub extra_headers: HashMap<String, String>,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.into(),
            timeout: DEFAULT_TIMEOUT,
            extra_headers: HashMap::new(),
        }
    }
}

impl OpenAIConfig {
    /// Read `OPENAI_API_KEY` and `OPENAI_BASE_URL` from the environment.
    pub fn from_env() -> Self {
        let mut config = Self {
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            ..Default::default()
        };
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL")
            && !base_url.trim().is_empty()
        {
            config.base_url = base_url;
        }
        config
    }
}

/// Create a model handle for `model_id` against the configured endpoint.
pub fn model(config: OpenAIConfig, model_id: impl Into<String>) -> Result<LanguageModel, Error> {
    let client = reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|e| Error::Http(Box::new(e)))?;

    Ok(LanguageModel::new(OpenAIModel {
        model_id: model_id.into(),
        state: Arc::new(ProviderState { client, config }),
    }))
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

struct ProviderState {
    client: reqwest::Client,
    config: OpenAIConfig,
}

struct OpenAIModel {
    model_id: String,
    state: Arc<ProviderState>,
}

#[async_trait]
impl LanguageModelBackend for OpenAIModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn provider(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, Error> {
        let body = convert::to_openai_request(&self.model_id, &request);
        client::send(&self.state, &body).await
    }
}
