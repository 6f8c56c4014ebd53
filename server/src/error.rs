use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use clipharvest::{
    ClipharvestError, ConfigError, DatabaseError, DownloadFailure, FailureKind, KeywordError,
    QueueError, SearchError,
};
use serde_json::json;
use thiserror::Error;

/// Error body: `{ "error": { "kind", "message" } }`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn usage_denied(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYMENT_REQUIRED, "usage_denied", message)
    }

    fn from_kind(kind: FailureKind, message: String) -> Self {
        let (status, name) = match kind {
            FailureKind::Validation => (StatusCode::BAD_REQUEST, "validation"),
            FailureKind::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            FailureKind::Upstream => (StatusCode::BAD_GATEWAY, "upstream"),
            FailureKind::Timeout => (StatusCode::BAD_GATEWAY, "timeout"),
            FailureKind::Parse => (StatusCode::BAD_GATEWAY, "parse"),
            FailureKind::Cancelled => (StatusCode::CONFLICT, "cancelled"),
            FailureKind::Storage => (StatusCode::INTERNAL_SERVER_ERROR, "storage"),
        };
        Self::new(status, name, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            log::error!("Request failed ({}): {}", self.kind, self.message);
        }
        let body = Json(json!({
            "error": { "kind": self.kind, "message": self.message }
        }));
        (self.status, body).into_response()
    }
}

impl From<ClipharvestError> for ApiError {
    fn from(e: ClipharvestError) -> Self {
        Self::from_kind(e.kind(), e.to_string())
    }
}

impl From<QueueError> for ApiError {
    fn from(e: QueueError) -> Self {
        Self::from_kind(e.kind(), e.to_string())
    }
}

impl From<SearchError> for ApiError {
    fn from(e: SearchError) -> Self {
        Self::from_kind(e.kind.failure_kind(), e.to_string())
    }
}

impl From<DownloadFailure> for ApiError {
    fn from(e: DownloadFailure) -> Self {
        Self::from_kind(e.kind, e.to_string())
    }
}

impl From<KeywordError> for ApiError {
    fn from(e: KeywordError) -> Self {
        Self::from_kind(e.kind(), e.to_string())
    }
}

/// Failures that stop the server from starting.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("Failed to install logger: {0}")]
    Logging(String),
}
