//! Hosted backend endpoint and credentials.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default HTTP timeout in seconds.
const fn default_timeout_secs() -> u64 {
    15
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Project URL (e.g., `https://abcd1234.supabase.co`).
    #[serde(default)]
    pub url: String,

    /// Public (anonymous) API key sent as `apikey` on every request.
    #[serde(default)]
    pub anon_key: String,

    /// Service credential that bypasses row-level security.
    /// Only needed for elevated checks.
    #[serde(default)]
    pub service_role_key: String,

    /// Per-request timeout, in seconds. A request that exceeds it is
    /// reported as a transport failure.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            service_role_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BackendConfig {
    /// Minimum fields for user-scoped checks.
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() && !self.anon_key.is_empty()
    }

    pub fn has_service_role(&self) -> bool {
        !self.service_role_key.is_empty()
    }

    /// Validate the endpoint fields, returning the URL without a trailing slash.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when the URL or anonymous key is empty
    /// and [`ConfigError::InvalidValue`] when the URL has no `http(s)` scheme
    /// or the timeout is zero.
    pub fn validated_url(&self) -> Result<&str, ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::Missing {
                field: "backend.url",
                env: "WARDEN_BACKEND__URL",
            });
        }
        if self.anon_key.is_empty() {
            return Err(ConfigError::Missing {
                field: "backend.anon_key",
                env: "WARDEN_BACKEND__ANON_KEY",
            });
        }
        if !self.url.starts_with("https://") && !self.url.starts_with("http://") {
            return Err(ConfigError::InvalidValue {
                field: "backend.url".into(),
                reason: format!("'{}' must start with http:// or https://", self.url),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "backend.timeout_secs".into(),
                reason: "must be greater than zero".into(),
            });
        }
        Ok(self.url.trim_end_matches('/'))
    }
}
