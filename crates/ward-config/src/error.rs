//! Errors raised while loading or validating configuration.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A layer could not be read or did not match the expected shape.
    #[error("failed to load configuration: {0}")]
    Figment(#[from] figment::Error),

    /// A field every run needs is empty.
    #[error("'{field}' is not set (env: {env})")]
    Missing {
        field: &'static str,
        env: &'static str,
    },

    /// A field is set to something unusable.
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}
