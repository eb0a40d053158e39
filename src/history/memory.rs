use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::error::Error;
use tokio::sync::RwLock;

use crate::history::HistoryStore;
use crate::models::chat::{ ChatMessage, Conversation };

/// Process-wide transcript map. Lives for the lifetime of the server process;
/// nothing is evicted or persisted.
pub struct MemoryHistoryStore {
    conversations: RwLock<HashMap<String, Conversation>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn empty_conversation(conversation_id: &str) -> Conversation {
    Conversation {
        id: conversation_id.to_string(),
        messages: Vec::new(),
        active: true,
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn add_message(
        &self,
        conversation_id: &str,
        role: &str,
        content: &str
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut conversations = self.conversations.write().await;
        let conversation = conversations
            .entry(conversation_id.to_string())
            .or_insert_with(|| empty_conversation(conversation_id));

        conversation.messages.push(ChatMessage {
            role: role.to_string(),
            content: content.to_string(),
            timestamp: Utc::now().timestamp(),
        });
        Ok(())
    }

    async fn get_conversation(
        &self,
        conversation_id: &str,
        limit: usize
    ) -> Result<Conversation, Box<dyn Error + Send + Sync>> {
        let conversations = self.conversations.read().await;
        match conversations.get(conversation_id) {
            Some(conversation) => {
                let start = conversation.messages.len().saturating_sub(limit);
                Ok(Conversation {
                    id: conversation.id.clone(),
                    messages: conversation.messages[start..].to_vec(),
                    active: conversation.active,
                })
            }
            None => Ok(empty_conversation(conversation_id)),
        }
    }

    async fn end_conversation(
        &self,
        conversation_id: &str
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut conversations = self.conversations.write().await;
        let conversation = conversations
            .entry(conversation_id.to_string())
            .or_insert_with(|| empty_conversation(conversation_id));
        conversation.active = false;
        Ok(())
    }
}
