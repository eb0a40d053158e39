use crate::cli::Args;
use crate::history::{ initialize_history_store, HistoryStore };
use crate::llm::chat::{ new_client as new_chat_client, ChatClient, TokenStream };
use crate::llm::LlmConfig;
use crate::models::chat::{ ChatMessage, Conversation };

use chrono::Utc;
use futures::StreamExt;
use log::{ error, info, warn };
use std::error::Error;
use std::sync::Arc;
use thiserror::Error as ThisError;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

#[derive(Debug, ThisError)]
pub enum ChatError {
    #[error("The chat session has ended. Please start a new session.")]
    ConversationEnded,
    #[error("Error with Groq API: {0}")]
    Provider(String),
    #[error("History store error: {0}")]
    History(String),
}

/// Orchestrates one chat turn: transcript lookup, user append, provider
/// call, and the assistant append once the reply is assembled.
#[derive(Clone)]
pub struct ChatAgent {
    chat_client: Arc<dyn ChatClient>,
    history_store: Arc<dyn HistoryStore>,
    system_prompt: String,
    history_limit: usize,
}

impl ChatAgent {
    pub fn new(args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let chat_config = LlmConfig {
            api_key: args.groq_api_key.clone(),
            completion_model: args.chat_model.clone(),
            base_url: args.chat_base_url.clone(),
            temperature: args.temperature,
            max_tokens: args.max_tokens,
            top_p: args.top_p,
        };
        let chat_client = new_chat_client(&chat_config)?;
        info!(
            "Chat client configured: Model={}, BaseURL={}",
            chat_config.completion_model.as_deref().unwrap_or("adapter default"),
            chat_config.base_url.as_deref().unwrap_or("adapter default")
        );

        let history_store = initialize_history_store(args)?;

        Ok(
            Self::from_parts(
                chat_client,
                history_store,
                args.system_prompt.clone(),
                args.history_limit
            )
        )
    }

    pub fn from_parts(
        chat_client: Arc<dyn ChatClient>,
        history_store: Arc<dyn HistoryStore>,
        system_prompt: String,
        history_limit: usize,
    ) -> Self {
        Self {
            chat_client,
            history_store,
            system_prompt,
            history_limit,
        }
    }

    /// Appends the inbound message and builds the outbound message list:
    /// the system prompt, the replayed transcript, then the new message.
    async fn prepare_transcript(
        &self,
        conversation_id: &str,
        role: &str,
        message: &str
    ) -> Result<Vec<ChatMessage>, ChatError> {
        let conversation = self.history_store
            .get_conversation(conversation_id, self.history_limit).await
            .map_err(|e| ChatError::History(e.to_string()))?;

        if !conversation.active {
            return Err(ChatError::ConversationEnded);
        }

        self.history_store
            .add_message(conversation_id, role, message).await
            .map_err(|e| ChatError::History(e.to_string()))?;

        let now = Utc::now().timestamp();
        let mut outbound = Vec::with_capacity(conversation.messages.len() + 2);
        outbound.push(ChatMessage {
            role: "system".to_string(),
            content: self.system_prompt.clone(),
            timestamp: now,
        });
        outbound.extend(conversation.messages);
        outbound.push(ChatMessage {
            role: role.to_string(),
            content: message.to_string(),
            timestamp: now,
        });

        Ok(outbound)
    }

    /// Buffered chat turn: waits for the full reply, records it, returns it.
    pub async fn chat(
        &self,
        conversation_id: &str,
        role: &str,
        message: &str
    ) -> Result<String, ChatError> {
        let outbound = self.prepare_transcript(conversation_id, role, message).await?;

        let completion = self.chat_client
            .complete(&outbound).await
            .map_err(|e| ChatError::Provider(e.to_string()))?;

        self.history_store
            .add_message(conversation_id, "assistant", &completion.response).await
            .map_err(|e| ChatError::History(e.to_string()))?;

        Ok(completion.response)
    }

    /// Streaming chat turn: returns a relay of the provider's fragments.
    /// The assembled reply is appended to the transcript when the provider
    /// stream finishes cleanly; a provider error leaves the transcript
    /// without an assistant entry. A caller disconnect stops the relay but
    /// the reply is still assembled and recorded.
    pub async fn chat_stream(
        &self,
        conversation_id: &str,
        role: &str,
        message: &str
    ) -> Result<TokenStream, ChatError> {
        let outbound = self.prepare_transcript(conversation_id, role, message).await?;

        let mut upstream = self.chat_client
            .stream_completion(&outbound).await
            .map_err(|e| ChatError::Provider(e.to_string()))?;

        let (tx, rx) = mpsc::channel(32);
        let history_store = self.history_store.clone();
        let conversation_id = conversation_id.to_string();

        tokio::spawn(async move {
            let mut reply = String::new();
            let mut client_gone = false;

            while let Some(item) = upstream.next().await {
                match item {
                    Ok(fragment) => {
                        reply.push_str(&fragment);
                        if !client_gone && tx.send(Ok(fragment)).await.is_err() {
                            warn!(
                                "Client for conversation {} disconnected mid-stream",
                                conversation_id
                            );
                            client_gone = true;
                        }
                    }
                    Err(e) => {
                        error!(
                            "Provider stream error for conversation {}: {}",
                            conversation_id, e
                        );
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                }
            }

            if let Err(e) = history_store
                .add_message(&conversation_id, "assistant", &reply).await
            {
                error!(
                    "Failed to record assistant reply for conversation {}: {}",
                    conversation_id, e
                );
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    pub async fn transcript(&self, conversation_id: &str) -> Result<Conversation, ChatError> {
        self.history_store
            .get_conversation(conversation_id, usize::MAX).await
            .map_err(|e| ChatError::History(e.to_string()))
    }

    pub async fn end_conversation(&self, conversation_id: &str) -> Result<(), ChatError> {
        info!("Ending conversation {}", conversation_id);
        self.history_store
            .end_conversation(conversation_id).await
            .map_err(|e| ChatError::History(e.to_string()))
    }
}
