//! Errors raised while interpreting backend payloads.
//!
//! Failures reported *by* the backend are not errors at this layer; they are
//! carried as [`crate::ErrorDetail`] inside an [`crate::Outcome`].

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A row returned by the backend lacks a field or has the wrong shape.
    #[error("Malformed row: field '{field}' {reason}")]
    MalformedRow { field: String, reason: String },

    /// Input failed validation before any request was made.
    #[error("Validation error: {0}")]
    Validation(String),
}
