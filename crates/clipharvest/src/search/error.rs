use thiserror::Error;

use crate::error::FailureKind;

/// What went wrong with a search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchErrorKind {
    /// Connection or protocol failure before a response arrived.
    Transport(String),
    Timeout,
    /// Non-2xx response.
    Status(u16),
    /// The response body didn't match the expected payload.
    Schema(String),
    /// The query itself was rejected before sending.
    Validation(String),
}

impl SearchErrorKind {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            SearchErrorKind::Status(404) => FailureKind::NotFound,
            SearchErrorKind::Status(429) => FailureKind::Upstream,
            // rejected by the platform; resending the same request won't help
            SearchErrorKind::Status(400..=499) => FailureKind::Validation,
            SearchErrorKind::Transport(_) | SearchErrorKind::Status(_) => FailureKind::Upstream,
            SearchErrorKind::Timeout => FailureKind::Timeout,
            SearchErrorKind::Schema(_) => FailureKind::Parse,
            SearchErrorKind::Validation(_) => FailureKind::Validation,
        }
    }
}

impl std::fmt::Display for SearchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchErrorKind::Transport(msg) => write!(f, "transport error: {}", msg),
            SearchErrorKind::Timeout => write!(f, "request timed out"),
            SearchErrorKind::Status(code) => write!(f, "upstream returned HTTP {}", code),
            SearchErrorKind::Schema(msg) => write!(f, "unexpected response payload: {}", msg),
            SearchErrorKind::Validation(msg) => write!(f, "invalid query: {}", msg),
        }
    }
}

/// A failed search, carrying the keyword and cursor so the caller can retry
/// the same page.
#[derive(Error, Debug, Clone)]
#[error("search for '{keyword}' (cursor {}) failed: {kind}", .cursor.as_deref().unwrap_or("-"))]
pub struct SearchError {
    pub keyword: String,
    pub cursor: Option<String>,
    pub kind: SearchErrorKind,
}

impl SearchError {
    pub fn new(keyword: impl Into<String>, cursor: Option<String>, kind: SearchErrorKind) -> Self {
        Self {
            keyword: keyword.into(),
            cursor,
            kind,
        }
    }

    /// Transport failures, timeouts, 429 and 5xx are worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.kind.failure_kind().is_retryable()
    }

    pub(crate) fn from_reqwest(
        keyword: &str,
        cursor: Option<&str>,
        err: &reqwest::Error,
    ) -> Self {
        let kind = if err.is_timeout() {
            SearchErrorKind::Timeout
        } else if let Some(status) = err.status() {
            SearchErrorKind::Status(status.as_u16())
        } else if err.is_decode() {
            SearchErrorKind::Schema(err.to_string())
        } else {
            SearchErrorKind::Transport(err.to_string())
        };
        Self::new(keyword, cursor.map(str::to_string), kind)
    }
}
