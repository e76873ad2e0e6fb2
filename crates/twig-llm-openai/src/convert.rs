//! Converts between twig-llm generic types and Chat Completions wire format.

use twig_llm::error::{Error, Result};
use twig_llm::request::{ChatMessage, CompletionRequest, ContentBlock, MessageContent};
use twig_llm::response::{Completion, FinishReason, Usage};

use crate::types::{
    ChatCompletionRequest, ChatCompletionResponse, ErrorBody, ErrorEnvelope, FileData, ImageUrl,
    Role, WireContent, WireMessage, WirePart,
};

pub fn to_openai_request(model_id: &str, req: &CompletionRequest) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: model_id.to_string(),
        messages: req.messages.iter().map(to_wire_message).collect(),
        stream: false,
        max_tokens: req.options.max_tokens,
        temperature: req.options.temperature,
    }
}

fn to_wire_message(msg: &ChatMessage) -> WireMessage {
    let role = match msg.role {
        twig_llm::Role::System => Role::System,
        twig_llm::Role::User => Role::User,
        twig_llm::Role::Assistant => Role::Assistant,
    };
    let content = match &msg.content {
        MessageContent::Text(text) => WireContent::Text(text.clone()),
        MessageContent::Blocks(blocks) => WireContent::Parts(
            blocks
                .iter()
                .map(|b| match b {
                    ContentBlock::Text(t) => WirePart::Text {
                        text: t.text.clone(),
                    },
                    ContentBlock::Image(img) => WirePart::ImageUrl {
                        image_url: ImageUrl {
                            url: img.url.clone(),
                        },
                    },
                    ContentBlock::File(f) => WirePart::File {
                        file: FileData {
                            filename: f.filename.clone(),
                            file_data: f.data.clone(),
                        },
                    },
                })
                .collect(),
        ),
    };
    WireMessage { role, content }
}

/// Parse a 2xx response body. Only `choices[0].message.content` matters;
/// anything without non-blank content there is treated as an empty response.
pub fn parse_response(body: &str) -> Result<Completion> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body)?;
    from_openai_response(parsed)
}

pub fn from_openai_response(resp: ChatCompletionResponse) -> Result<Completion> {
    let choice = resp.choices.into_iter().next().ok_or(Error::EmptyResponse)?;
    let text = choice
        .message
        .and_then(|m| m.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or(Error::EmptyResponse)?;

    let usage = resp
        .usage
        .map(|u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
            cached_tokens: u.prompt_tokens_details.and_then(|d| d.cached_tokens),
        })
        .unwrap_or_default();

    Ok(Completion {
        text,
        finish_reason: choice
            .finish_reason
            .as_deref()
            .map(FinishReason::from_wire)
            .unwrap_or(FinishReason::Stop),
        usage,
    })
}

/// Build the [`Error::Api`] for a non-2xx response, pulling a readable
/// message out of the JSON error envelope when there is one.
pub fn api_error(status: u16, body: &str) -> Error {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope {
            error: ErrorBody::Detailed { message },
        })
        | Ok(ErrorEnvelope {
            error: ErrorBody::Message(message),
        }) => message,
        Err(_) => body.trim().to_string(),
    };
    Error::Api { status, message }
}
