//! Classified results of a single check.
//!
//! A query has three distinct results that must never be conflated: the
//! backend answered with rows, answered with nothing, or refused/failed.
//! [`Outcome::classify`] is the one place that mapping happens.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A row returned by the backend: field name to scalar or nested value.
pub type Row = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Category of a failed backend interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad credentials, locked or unconfirmed account.
    Authentication,
    /// Network failure, timeout, unreachable host or undecodable response.
    Transport,
    /// A row-level or grant policy blocked the request.
    AccessDenied,
    /// A referenced entity was absent after an authorized query.
    NotFound,
    /// The backend rejected the request for another reason (unknown column,
    /// missing relation or function, malformed filter).
    Query,
    /// A required credential or endpoint is missing.
    Configuration,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Transport => "transport",
            Self::AccessDenied => "access_denied",
            Self::NotFound => "not_found",
            Self::Query => "query",
            Self::Configuration => "configuration",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ErrorDetail
// ---------------------------------------------------------------------------

/// The backend's original error signal, kept verbatim.
///
/// `code` and `message` are copied from the response body without
/// re-interpretation; only `kind` is derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Error)]
#[error("{kind} [{code}]: {message}{}", status_suffix(.status))]
pub struct ErrorDetail {
    pub kind: ErrorKind,
    /// Machine code from the backend (e.g. `invalid_credentials`, `42501`).
    pub code: String,
    /// Human-readable message from the backend.
    pub message: String,
    /// HTTP status, absent when the request never got a response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

#[allow(clippy::ref_option)]
fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl ErrorDetail {
    #[must_use]
    pub fn new(kind: ErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            status: None,
        }
    }

    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, "transport_error", message)
    }

    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, "configuration_error", message)
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of running one check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The query succeeded with at least one row.
    Success(Vec<Row>),
    /// The query succeeded and returned zero rows.
    Empty,
    /// The backend or transport reported an error.
    Failure(ErrorDetail),
    /// Skipped: an upstream dependency did not succeed, or the required
    /// session was not available.
    NotRun(String),
}

impl Outcome {
    /// Classify a raw query result.
    ///
    /// An error always classifies as [`Outcome::Failure`], never as
    /// [`Outcome::Empty`]. Zero rows with no error is [`Outcome::Empty`].
    #[must_use]
    pub fn classify(result: Result<Vec<Row>, ErrorDetail>) -> Self {
        match result {
            Err(error) => Self::Failure(error),
            Ok(rows) if rows.is_empty() => Self::Empty,
            Ok(rows) => Self::Success(rows),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> OutcomeKind {
        match self {
            Self::Success(_) => OutcomeKind::Success,
            Self::Empty => OutcomeKind::Empty,
            Self::Failure(_) => OutcomeKind::Failure,
            Self::NotRun(_) => OutcomeKind::NotRun,
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        match self {
            Self::Success(rows) => rows,
            _ => &[],
        }
    }

    #[must_use]
    pub fn first_row(&self) -> Option<&Row> {
        self.rows().first()
    }

    #[must_use]
    pub const fn error(&self) -> Option<&ErrorDetail> {
        match self {
            Self::Failure(error) => Some(error),
            _ => None,
        }
    }
}

/// Discriminant of [`Outcome`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    Empty,
    Failure,
    NotRun,
}

impl OutcomeKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Empty => "empty",
            Self::Failure => "failure",
            Self::NotRun => "not_run",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
