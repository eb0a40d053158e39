pub mod agent;
pub mod cli;
pub mod history;
pub mod llm;
pub mod models;
pub mod server;

use agent::ChatAgent;
use cli::Args;
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Chat Model: {}", args.chat_model.as_deref().unwrap_or("adapter default"));
    info!("Chat Base URL: {}", args.chat_base_url.as_deref().unwrap_or("adapter default"));
    info!("History Store Type: {}", args.history_type);
    info!("History Replay Limit: {}", args.history_limit);
    info!("System Prompt: {}", args.system_prompt);
    info!("-------------------------");

    let agent = Arc::new(ChatAgent::new(&args)?);
    let addr = args.server_addr.clone();
    info!("Starting server on: {}", addr);
    let server = Server::new(addr, agent);
    server.run().await?;

    Ok(())
}
