//! Backend transport error types and their mapping onto [`ErrorDetail`].

use thiserror::Error;
use ward_core::{ErrorDetail, ErrorKind};

/// PostgreSQL `insufficient_privilege`.
const PG_INSUFFICIENT_PRIVILEGE: &str = "42501";

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP transport error (connect, timeout, body decode).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend returned a non-success status code.
    #[error("API error ({status}) [{code}]: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Machine code from the error body, or `http_{status}` when absent.
        code: String,
        /// Message from the error body, or the raw body.
        message: String,
    },

    /// A success response did not have the expected shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// The HTTP client could not be built.
    #[error("client build error: {0}")]
    Build(String),
}

/// Which API surface produced an error; the same status means different
/// things on the auth and REST endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Auth,
    Rest,
}

impl BackendError {
    /// Classify into the harness error taxonomy, keeping code, message and
    /// status verbatim.
    #[must_use]
    pub fn into_detail(self, endpoint: Endpoint) -> ErrorDetail {
        match self {
            Self::Http(error) => {
                let code = if error.is_timeout() {
                    "timeout"
                } else if error.is_connect() {
                    "connect_error"
                } else if error.is_decode() {
                    "invalid_response"
                } else {
                    "transport_error"
                };
                let detail = ErrorDetail::new(ErrorKind::Transport, code, error.to_string());
                match error.status() {
                    Some(status) => detail.with_status(status.as_u16()),
                    None => detail,
                }
            }
            Self::Api {
                status,
                code,
                message,
            } => {
                let kind = classify_status(endpoint, status, &code);
                ErrorDetail::new(kind, code, message).with_status(status)
            }
            Self::Parse(message) => {
                ErrorDetail::new(ErrorKind::Transport, "invalid_response", message)
            }
            Self::Build(message) => ErrorDetail::configuration(message),
        }
    }
}

fn classify_status(endpoint: Endpoint, status: u16, code: &str) -> ErrorKind {
    match endpoint {
        Endpoint::Auth => match status {
            500.. => ErrorKind::Transport,
            _ => ErrorKind::Authentication,
        },
        Endpoint::Rest => {
            if code == PG_INSUFFICIENT_PRIVILEGE || matches!(status, 401 | 403) {
                ErrorKind::AccessDenied
            } else if status >= 502 && code.starts_with("http_") {
                // Gateway errors carry no database code.
                ErrorKind::Transport
            } else {
                ErrorKind::Query
            }
        }
    }
}
