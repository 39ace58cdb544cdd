//! Image endpoints
//!
//! GET  /images/{reference} - serve a stored image by reference
//! POST /api/upload         - accept a user image for chat input

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::images::mime_for;

use super::{AppState, ErrorResponse};

/// Upload size cap
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const ALLOWED_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Build the images router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/images/{reference}", get(get_image))
        .route(
            "/api/upload",
            post(upload_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 16 * 1024)),
        )
}

/// Serve an image by reference
async fn get_image(
    Path(reference): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.artifacts.resolve(&reference).await {
        Ok(Some(data)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, mime_for(&reference).to_string()),
                (
                    header::CACHE_CONTROL,
                    "public, max-age=31536000, immutable".to_string(),
                ),
            ],
            data,
        )
            .into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, ErrorResponse::new("Image not found")).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::new(format!("Error: {}", e)),
        )
            .into_response(),
    }
}

#[derive(Serialize)]
struct UploadResponse {
    filename: String,
}

/// Accept a multipart image upload; rejects wrong types and oversized files
async fn upload_image(State(state): State<AppState>, mut multipart: Multipart) -> impl IntoResponse {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new(format!("Malformed upload: {}", e)),
                )
                    .into_response();
            }
        };
        if field.name() != Some("image") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !ALLOWED_TYPES.contains(&content_type.as_str()) {
            return (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(format!("Unsupported image type: {}", content_type)),
            )
                .into_response();
        }

        let file_name = field.file_name().unwrap_or("upload.jpg").to_string();
        let data = match field.bytes().await {
            Ok(data) => data,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new(format!("Failed to read upload: {}", e)),
                )
                    .into_response();
            }
        };
        if data.is_empty() {
            return (StatusCode::BAD_REQUEST, ErrorResponse::new("Empty upload")).into_response();
        }
        if data.len() > MAX_UPLOAD_BYTES {
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorResponse::new("Image too large"),
            )
                .into_response();
        }

        return match state.artifacts.store_upload(&data, &file_name).await {
            Ok(filename) => (StatusCode::OK, Json(UploadResponse { filename })).into_response(),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new(format!("Failed to store upload: {}", e)),
            )
                .into_response(),
        };
    }

    (
        StatusCode::BAD_REQUEST,
        ErrorResponse::new("Missing image field"),
    )
        .into_response()
}
