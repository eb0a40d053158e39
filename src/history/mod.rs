pub mod memory;

use async_trait::async_trait;
use log::info;
use std::error::Error;
use std::sync::Arc;

use crate::cli::Args;
use crate::models::chat::Conversation;

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn add_message(
        &self,
        conversation_id: &str,
        role: &str,
        content: &str
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Returns the last `limit` messages for the id, in append order. An
    /// unseen id reads as an empty, active conversation without creating it.
    async fn get_conversation(
        &self,
        conversation_id: &str,
        limit: usize
    ) -> Result<Conversation, Box<dyn Error + Send + Sync>>;

    async fn end_conversation(
        &self,
        conversation_id: &str
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

pub fn create_history_store(
    args: &Args
) -> Result<Arc<dyn HistoryStore>, Box<dyn Error + Send + Sync>> {
    match args.history_type.to_lowercase().as_str() {
        "memory" => Ok(Arc::new(memory::MemoryHistoryStore::new())),
        _ =>
            Err(
                Box::new(
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("Unsupported history store type: {}", args.history_type)
                    )
                )
            ),
    }
}

pub fn initialize_history_store(
    args: &Args
) -> Result<Arc<dyn HistoryStore>, Box<dyn Error + Send + Sync>> {
    info!("Chat history will be stored in: {}", args.history_type);
    create_history_store(args)
}
