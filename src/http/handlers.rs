//! HTTP request handlers
//!
//! Implements handlers for the catalog listing and streaming endpoints.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::error::TranscodeError;
use crate::state::AppState;

/// HTTP error type
#[derive(Debug)]
pub enum HttpError {
    TrackNotFound(String),
    UnsupportedFormat(String),
    InternalError(String),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            HttpError::TrackNotFound(id) => {
                (StatusCode::NOT_FOUND, format!("Track not found: {}", id))
            }
            HttpError::UnsupportedFormat(ext) => (
                StatusCode::BAD_REQUEST,
                format!("Unsupported format: {:?}", ext),
            ),
            HttpError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, body).into_response()
    }
}

impl From<TranscodeError> for HttpError {
    fn from(err: TranscodeError) -> Self {
        match err {
            TranscodeError::NotFound(id) => HttpError::TrackNotFound(id),
            TranscodeError::UnsupportedFormat(ext) => HttpError::UnsupportedFormat(ext),
            _ => {
                tracing::error!("Unable to start encoder: {}", err);
                HttpError::InternalError(err.to_string())
            }
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Catalog endpoint
/// GET /songs
pub async fn list_songs(State(state): State<Arc<AppState>>) -> Response {
    Json(&*state.catalog).into_response()
}

/// Streaming endpoint
/// GET /songs/{id}.{ext}
pub async fn stream_song(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
) -> Result<Response, HttpError> {
    let (format, stream) = state.open_stream(&file).await?;

    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static(format.mime_type()))],
        Body::from_stream(stream),
    )
        .into_response())
}
