use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Host address and port for the HTTP server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "0.0.0.0:8000")]
    pub server_addr: String,

    /// API key for the Groq chat completions API.
    #[arg(long, env = "GROQ_API_KEY")]
    pub groq_api_key: String,

    /// Model name for chat completion (e.g., llama-3.1-8b-instant)
    #[arg(long, env = "CHAT_MODEL")] // No default, let the adapter handle it if None
    pub chat_model: Option<String>,

    /// Base URL for the Groq API.
    #[arg(long, env = "CHAT_BASE_URL")]
    pub chat_base_url: Option<String>,

    /// Sampling temperature for chat completion (1.0 = balanced).
    #[arg(long, env = "CHAT_TEMPERATURE", default_value = "1.0")]
    pub temperature: f32,

    /// Maximum number of tokens the model may generate per reply.
    #[arg(long, env = "CHAT_MAX_TOKENS", default_value = "1024")]
    pub max_tokens: u32,

    /// Nucleus sampling parameter.
    #[arg(long, env = "CHAT_TOP_P", default_value = "1.0")]
    pub top_p: f32,

    /// System prompt prepended to every outbound transcript.
    #[arg(long, env = "SYSTEM_PROMPT", default_value = "You are a useful AI assistant.")]
    pub system_prompt: String,

    /// History chat store type (memory)
    #[arg(long, env = "HISTORY_TYPE", default_value = "memory")]
    pub history_type: String,

    /// Maximum number of stored messages replayed to the model per request.
    #[arg(long, env = "HISTORY_LIMIT", default_value = "64")]
    pub history_limit: usize,
}
