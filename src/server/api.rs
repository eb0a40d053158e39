use crate::agent::{ ChatAgent, ChatError };

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{ get, post },
    Router,
    body::Body,
    extract::{ Path, State },
    response::{ IntoResponse, Response },
    http::{ header, StatusCode },
    Json,
};
use serde::{ Deserialize, Serialize };
use tower_http::cors::{ Any, CorsLayer };
use log::info;

#[derive(Deserialize)]
pub struct UserInput {
    pub message: String,
    #[serde(default = "default_role")]
    pub role: String,
    pub conversation_id: String,
    #[serde(default = "default_stream")]
    pub stream: bool,
}

fn default_role() -> String {
    "user".to_string()
}

fn default_stream() -> bool {
    true
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub conversation_id: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

#[derive(Serialize)]
struct EndResponse {
    success: bool,
    conversation_id: String,
}

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<ChatAgent>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat", post(chat_handler))
        .route("/chat/{id}", get(transcript_handler))
        .route("/chat/{id}/end", post(end_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_http_server(
    addr: &str,
    agent: Arc<ChatAgent>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = addr.parse::<SocketAddr>()?;
    info!("Starting HTTP API server on: http://{}", addr);

    let app = router(AppState { agent });
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(input): Json<UserInput>,
) -> Response {
    if input.message.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "message must not be empty");
    }
    if input.conversation_id.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "conversation_id must not be empty");
    }

    info!("Chat request for conversation {}", input.conversation_id);

    if input.stream {
        match state.agent.chat_stream(&input.conversation_id, &input.role, &input.message).await {
            Ok(stream) => {
                (
                    [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                    Body::from_stream(stream),
                ).into_response()
            }
            Err(e) => chat_error_response(e),
        }
    } else {
        match state.agent.chat(&input.conversation_id, &input.role, &input.message).await {
            Ok(response) =>
                Json(ChatResponse {
                    response,
                    conversation_id: input.conversation_id,
                }).into_response(),
            Err(e) => chat_error_response(e),
        }
    }
}

async fn transcript_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.agent.transcript(&id).await {
        Ok(conversation) if conversation.messages.is_empty() =>
            error_response(
                StatusCode::NOT_FOUND,
                &format!("Conversation {} not found", id)
            ),
        Ok(conversation) => Json(conversation).into_response(),
        Err(e) => chat_error_response(e),
    }
}

async fn end_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.agent.end_conversation(&id).await {
        Ok(()) =>
            Json(EndResponse {
                success: true,
                conversation_id: id,
            }).into_response(),
        Err(e) => chat_error_response(e),
    }
}

fn chat_error_response(err: ChatError) -> Response {
    let status = match err {
        ChatError::ConversationEnded => StatusCode::BAD_REQUEST,
        ChatError::Provider(_) => StatusCode::BAD_GATEWAY,
        ChatError::History(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, &err.to_string())
}

fn error_response(status: StatusCode, detail: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            detail: detail.to_string(),
        }),
    ).into_response()
}
