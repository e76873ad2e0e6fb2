#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use twig_core::{ChatSession, SessionConfig};
use twig_llm::{Completion, CompletionRequest, Error, LanguageModel, LanguageModelBackend};

pub struct Call {
    pub request: CompletionRequest,
    pub reply: oneshot::Sender<twig_llm::Result<Completion>>,
}

/// A model whose every request is answered by hand from the test body.
struct Gated {
    calls: mpsc::UnboundedSender<Call>,
}

#[async_trait]
impl LanguageModelBackend for Gated {
    fn model_id(&self) -> &str {
        "twig-test"
    }

    fn provider(&self) -> &str {
        "test"
    }

    async fn complete(&self, request: CompletionRequest) -> twig_llm::Result<Completion> {
        let (reply, answer) = oneshot::channel();
        self.calls
            .send(Call { request, reply })
            .map_err(|_| Error::Other("test server gone".into()))?;
        answer
            .await
            .unwrap_or_else(|_| Err(Error::Other("reply dropped".into())))
    }
}

pub struct Server {
    calls: mpsc::UnboundedReceiver<Call>,
}

impl Server {
    pub async fn next_call(&mut self) -> Call {
        self.calls.recv().await.expect("a request was issued")
    }

    /// Answer the next request and hand back what was asked.
    pub async fn answer(&mut self, reply: twig_llm::Result<Completion>) -> CompletionRequest {
        let call = self.next_call().await;
        let _ = call.reply.send(reply);
        call.request
    }
}

pub fn harness(config: SessionConfig) -> (Arc<ChatSession>, Server) {
    let (tx, rx) = mpsc::unbounded_channel();
    let model = LanguageModel::new(Gated { calls: tx });
    (
        Arc::new(ChatSession::new(model, config)),
        Server { calls: rx },
    )
}

pub fn ok(text: &str) -> twig_llm::Result<Completion> {
    Ok(Completion::text(text))
}
