use async_trait::async_trait;
use futures::StreamExt;
use log::{ info, warn };
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };
use std::error::Error as StdError;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::{ ChatClient, CompletionResponse, TokenStream };
use crate::llm::LlmConfig;
use crate::models::chat::ChatMessage;

const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
const DEFAULT_BASE_URL: &str = "https://api.groq.com";
const COMPLETIONS_ROUTE: &str = "/openai/v1/chat/completions";

pub struct GroqChatClient {
    http: HttpClient,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

#[derive(Serialize)]
struct GroqMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct GroqRequest {
    messages: Vec<GroqMessage>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Deserialize)]
struct GroqResponse {
    choices: Vec<GroqChoice>,
}

#[derive(Deserialize)]
struct GroqChoice {
    message: GroqChoiceMessage,
}

#[derive(Deserialize)]
struct GroqChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct GroqStreamResponse {
    choices: Vec<GroqStreamChoice>,
}

#[derive(Deserialize)]
struct GroqStreamChoice {
    delta: GroqDelta,
    #[serde(rename = "finish_reason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GroqDelta {
    content: Option<String>,
}

impl GroqChatClient {
    pub fn new(
        api_key: &str,
        model: Option<String>,
        base_url: Option<String>,
        temperature: f32,
        max_tokens: u32,
        top_p: f32,
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let chat_model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| format!("Invalid API key format: {}", e))?
        );

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Box::new(e) as Box<dyn StdError + Send + Sync>)?;

        Ok(Self {
            http,
            model: chat_model,
            base_url: api_url,
            temperature,
            max_tokens,
            top_p,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        if config.api_key.is_empty() {
            return Err("Groq API key is required".into());
        }

        Self::new(
            &config.api_key,
            config.completion_model.clone(),
            config.base_url.clone(),
            config.temperature,
            config.max_tokens,
            config.top_p,
        )
    }

    fn completions_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), COMPLETIONS_ROUTE)
    }

    fn build_request(&self, messages: &[ChatMessage], stream: bool) -> GroqRequest {
        let messages = messages
            .iter()
            .map(|m| GroqMessage {
                role: m.role.clone(),
                content: m.content.clone(),
            })
            .collect();

        GroqRequest {
            messages,
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
            stream: if stream { Some(true) } else { None },
        }
    }
}

/// Extracts the delta contents from one SSE line, sending each onward.
/// Returns `true` when the provider signalled the end of the completion.
async fn relay_sse_line(
    line: &str,
    tx: &mpsc::Sender<Result<String, Box<dyn StdError + Send + Sync>>>
) -> bool {
    if line.is_empty() || line == "data: [DONE]" {
        return false;
    }

    let Some(data) = line.strip_prefix("data: ") else {
        return false;
    };

    match serde_json::from_str::<GroqStreamResponse>(data) {
        Ok(stream_resp) => {
            for choice in stream_resp.choices {
                if let Some(content) = choice.delta.content {
                    if !content.is_empty() && tx.send(Ok(content)).await.is_err() {
                        return true;
                    }
                }

                if let Some(reason) = choice.finish_reason {
                    if reason == "stop" {
                        return true;
                    }
                }
            }
            false
        }
        Err(e) => {
            warn!("Failed to parse Groq chunk: {}, error: {}", data, e);
            false
        }
    }
}

#[async_trait]
impl ChatClient for GroqChatClient {
    async fn complete(
        &self,
        messages: &[ChatMessage]
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
        let req = self.build_request(messages, false);

        let resp = self.http
            .post(self.completions_url())
            .json(&req)
            .send().await?
            .error_for_status()?
            .json::<GroqResponse>().await?;

        let content = resp.choices
            .first()
            .ok_or_else(|| "No response from Groq API".to_string())?
            .message.content.clone();

        Ok(CompletionResponse { response: content })
    }

    async fn stream_completion(
        &self,
        messages: &[ChatMessage]
    ) -> Result<TokenStream, Box<dyn StdError + Send + Sync>> {
        let url = self.completions_url();
        let req = self.build_request(messages, true);

        info!("Starting Groq stream request to {}", url);

        // Fail the call up front so a bad credential or unreachable host
        // surfaces as an error response instead of an aborted body.
        let resp = self.http
            .post(&url)
            .json(&req)
            .send().await?
            .error_for_status()?;

        let (tx, rx) = mpsc::channel(32);

        tokio::spawn(async move {
            let mut stream = resp.bytes_stream();
            // SSE lines may be split across network chunks; buffer the
            // trailing partial line until the rest arrives.
            let mut pending = String::new();

            while let Some(chunk_result) = stream.next().await {
                match chunk_result {
                    Ok(chunk) => {
                        pending.push_str(&String::from_utf8_lossy(&chunk));

                        while let Some(newline) = pending.find('\n') {
                            let line: String = pending.drain(..=newline).collect();
                            if relay_sse_line(line.trim_end(), &tx).await {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(Box::new(e) as _)).await;
                        return;
                    }
                }
            }

            if !pending.is_empty() {
                relay_sse_line(pending.trim_end(), &tx).await;
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}
