//! Harness error types.

use std::path::PathBuf;

use thiserror::Error;
use ward_core::ErrorDetail;

/// Errors that abort a run before any check executes.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// A required credential or endpoint is missing.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The backend refused the service credential.
    #[error("elevated credential rejected: {0}")]
    ElevatedRejected(ErrorDetail),

    /// A plan file could not be loaded.
    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// Errors from loading a TOML plan file.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("failed to read plan {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid plan TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// A check entry is structurally valid TOML but not a usable check.
    #[error("check '{check}': {reason}")]
    Invalid { check: String, reason: String },
}
