//! Chat endpoints
//!
//! POST /api/conversations/{id}/chat        - wait for the full reply
//! POST /api/conversations/{id}/chat/stream - relay the reply over SSE

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::post,
    Json, Router,
};
use futures_util::{stream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::chat::{self, ChatEvent, Message, Prompt, STREAM_DONE};
use crate::gemini::ModelError;

use super::{AppState, ErrorResponse};

/// Build the chat router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/conversations/{id}/chat", post(chat_sync))
        .route("/api/conversations/{id}/chat/stream", post(chat_stream))
}

/// Request body for both chat variants
#[derive(Debug, Deserialize)]
struct ChatRequest {
    content: String,
    /// Reference to a previously uploaded input image
    #[serde(default)]
    image: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatResponse {
    user_message: Message,
    assistant_message: Message,
}

/// Append the user message and assemble the model prompt
async fn prepare_exchange(
    state: &AppState,
    conversation_id: &str,
    request: ChatRequest,
) -> Result<(Message, Prompt), (StatusCode, Json<ErrorResponse>)> {
    let user_message = Message::user(&request.content, request.image);
    if !state
        .conversations
        .append_message(conversation_id, user_message.clone())
    {
        return Err((
            StatusCode::NOT_FOUND,
            ErrorResponse::new("Conversation not found"),
        ));
    }

    let conversation = state.conversations.get(conversation_id).ok_or((
        StatusCode::NOT_FOUND,
        ErrorResponse::new("Conversation not found"),
    ))?;
    let prompt = chat::build_prompt(&conversation.messages, &state.artifacts).await;

    Ok((user_message, prompt))
}

fn status_for(error: &ModelError) -> StatusCode {
    match error {
        ModelError::InvalidCredential(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ModelError::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
        ModelError::ContentBlocked(_) => StatusCode::BAD_REQUEST,
        ModelError::Unclassified(_) => StatusCode::BAD_GATEWAY,
    }
}

async fn chat_sync(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Response {
    let (user_message, prompt) = match prepare_exchange(&state, &id, request).await {
        Ok(prepared) => prepared,
        Err(rejection) => return rejection.into_response(),
    };

    match chat::generate_reply(
        state.model.as_ref(),
        &state.conversations,
        &state.artifacts,
        &id,
        prompt,
    )
    .await
    {
        Ok(assistant_message) => Json(ChatResponse {
            user_message,
            assistant_message,
        })
        .into_response(),
        Err(e) => (status_for(&e), ErrorResponse::new(e.user_message())).into_response(),
    }
}

async fn chat_stream(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, Json<ErrorResponse>)> {
    let (user_message, prompt) = prepare_exchange(&state, &id, request).await?;

    let (tx, rx) = mpsc::channel::<ChatEvent>(32);

    // First frame: the stored user message
    let _ = tx.send(ChatEvent::UserMessage(user_message)).await;

    let relay_state = state.clone();
    let conversation_id = id.clone();
    tokio::spawn(async move {
        chat::stream_reply(
            relay_state.model.as_ref(),
            &relay_state.conversations,
            &relay_state.artifacts,
            &conversation_id,
            prompt,
            &tx,
        )
        .await;
    });

    let stream = ReceiverStream::new(rx)
        .map(|event| {
            Event::default()
                .json_data(&event)
                .unwrap_or_else(|_| Event::default().data("{}"))
        })
        .chain(stream::once(async { Event::default().data(STREAM_DONE) }))
        .map(Ok::<_, Infallible>);

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
