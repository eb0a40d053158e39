//! Test utilities for integration tests
use std::sync::Arc;

use async_trait::async_trait;
use axum::{ Router, body::Body };
use http_body_util::BodyExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use groq_chat_server::agent::ChatAgent;
use groq_chat_server::history::memory::MemoryHistoryStore;
use groq_chat_server::llm::chat::{ ChatClient, CompletionResponse, TokenStream };
use groq_chat_server::models::chat::ChatMessage;
use groq_chat_server::server::api::{ router, AppState };

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Chat client that replays a fixed list of fragments instead of calling
/// the Groq API.
#[derive(Clone)]
pub struct ScriptedChatClient {
    fragments: Vec<String>,
}

impl ScriptedChatClient {
    pub fn new(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl ChatClient for ScriptedChatClient {
    async fn complete(
        &self,
        _messages: &[ChatMessage]
    ) -> Result<CompletionResponse, BoxError> {
        Ok(CompletionResponse {
            response: self.fragments.concat(),
        })
    }

    async fn stream_completion(
        &self,
        _messages: &[ChatMessage]
    ) -> Result<TokenStream, BoxError> {
        let fragments = self.fragments.clone();
        let (tx, rx) = mpsc::channel(8);
        tokio::spawn(async move {
            for fragment in fragments {
                if tx.send(Ok(fragment)).await.is_err() {
                    return;
                }
            }
        });
        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

/// Chat client that emits a few fragments and then fails, standing in for
/// a provider that drops the connection mid-stream.
pub struct InterruptedChatClient {
    fragments: Vec<String>,
}

impl InterruptedChatClient {
    pub fn new(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl ChatClient for InterruptedChatClient {
    async fn complete(
        &self,
        _messages: &[ChatMessage]
    ) -> Result<CompletionResponse, BoxError> {
        Err("connection reset by peer".into())
    }

    async fn stream_completion(
        &self,
        _messages: &[ChatMessage]
    ) -> Result<TokenStream, BoxError> {
        let fragments = self.fragments.clone();
        let (tx, rx) = mpsc::channel(8);
        tokio::spawn(async move {
            for fragment in fragments {
                if tx.send(Ok(fragment)).await.is_err() {
                    return;
                }
            }
            let _ = tx.send(Err("connection reset by peer".into())).await;
        });
        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

/// Chat client whose calls always fail, standing in for an unreachable
/// provider or a rejected credential.
pub struct FailingChatClient;

#[async_trait]
impl ChatClient for FailingChatClient {
    async fn complete(
        &self,
        _messages: &[ChatMessage]
    ) -> Result<CompletionResponse, BoxError> {
        Err("connection refused".into())
    }

    async fn stream_completion(
        &self,
        _messages: &[ChatMessage]
    ) -> Result<TokenStream, BoxError> {
        Err("connection refused".into())
    }
}

pub fn test_app(chat_client: Arc<dyn ChatClient>) -> Router {
    let history_store = Arc::new(MemoryHistoryStore::new());
    let agent = Arc::new(
        ChatAgent::from_parts(
            chat_client,
            history_store,
            "You are a useful AI assistant.".to_string(),
            64
        )
    );
    router(AppState { agent })
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = body.collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
