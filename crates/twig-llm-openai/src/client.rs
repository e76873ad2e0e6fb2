//! Sends a single, non-streamed request to the Chat Completions endpoint
//! and maps transport, status and body failures onto the twig-llm error type.

use twig_llm::error::{Error, Result};
use twig_llm::response::Completion;

use crate::ProviderState;
use crate::convert;
use crate::types::ChatCompletionRequest;

pub async fn send(state: &ProviderState, body: &ChatCompletionRequest) -> Result<Completion> {
    let url = format!(
        "{}/chat/completions",
        state.config.base_url.trim_end_matches('/')
    );
    let mut req = state.client.post(&url);

    if !state.config.api_key.is_empty() {
        req = req.header("Authorization", format!("Bearer {}", state.config.api_key));
    }
    for (k, v) in &state.config.extra_headers {
        req = req.header(k, v);
    }

    tracing::debug!(
        %url,
        model = %body.model,
        messages = body.messages.len(),
        "sending completion request"
    );

    let resp = req
        .json(body)
        .send()
        .await
        .map_err(|e| Error::Http(Box::new(e)))?;

    let status = resp.status();
    tracing::debug!(status = status.as_u16(), "completion response received");

    if !status.is_success() {
        let body_text = resp.text().await.unwrap_or_default();
        return Err(convert::api_error(status.as_u16(), &body_text));
    }

    let text = resp.text().await.map_err(|e| Error::Http(Box::new(e)))?;
    convert::parse_response(&text)
}
