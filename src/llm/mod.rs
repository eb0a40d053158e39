pub mod chat;

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub completion_model: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl LlmConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            completion_model: None,
            base_url: None,
            temperature: 1.0,
            max_tokens: 1024,
            top_p: 1.0,
        }
    }
}
