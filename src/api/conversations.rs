//! Conversation CRUD endpoints
//!
//! POST   /api/conversations        - create
//! GET    /api/conversations        - list summaries
//! GET    /api/conversations/{id}   - fetch
//! DELETE /api/conversations/{id}   - delete

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use super::{AppState, ErrorResponse};

/// Build the conversations router
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/conversations",
            post(create_conversation).get(list_conversations),
        )
        .route(
            "/api/conversations/{id}",
            get(get_conversation).delete(delete_conversation),
        )
}

fn not_found() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        ErrorResponse::new("Conversation not found"),
    )
}

async fn create_conversation(State(state): State<AppState>) -> impl IntoResponse {
    let conversation = state.conversations.create();
    (StatusCode::CREATED, Json(conversation))
}

async fn list_conversations(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.conversations.list())
}

async fn get_conversation(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.conversations.get(&id) {
        Some(conversation) => Json(conversation).into_response(),
        None => not_found().into_response(),
    }
}

#[derive(Serialize)]
struct DeleteResponse {
    deleted: bool,
}

async fn delete_conversation(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    if state.conversations.delete(&id) {
        Json(DeleteResponse { deleted: true }).into_response()
    } else {
        not_found().into_response()
    }
}
