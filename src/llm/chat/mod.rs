pub mod groq;

use async_trait::async_trait;
use futures::Stream;
use serde::Deserialize;
use std::error::Error as StdError;
use std::pin::Pin;
use std::sync::Arc;

use super::LlmConfig;
use self::groq::GroqChatClient;
use crate::models::chat::ChatMessage;

pub type TokenStream = Pin<
    Box<dyn Stream<Item = Result<String, Box<dyn StdError + Send + Sync>>> + Send>
>;

#[derive(Deserialize, Debug, Clone)]
pub struct CompletionResponse {
    pub response: String,
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Buffered completion over the full ordered transcript.
    async fn complete(
        &self,
        messages: &[ChatMessage]
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>>;

    /// Incremental completion: yields generated text fragments as the
    /// provider emits them.
    async fn stream_completion(
        &self,
        messages: &[ChatMessage]
    ) -> Result<TokenStream, Box<dyn StdError + Send + Sync>>;
}

pub fn new_client(
    config: &LlmConfig
) -> Result<Arc<dyn ChatClient>, Box<dyn StdError + Send + Sync>> {
    let client = GroqChatClient::from_config(config)?;
    Ok(Arc::new(client))
}
