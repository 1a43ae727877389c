//! Demo account used by the sign-in and profile checks.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DemoConfig {
    /// Sign-in identifier (usually an email address).
    #[serde(default)]
    pub email: String,

    /// Sign-in secret.
    #[serde(default)]
    pub password: String,
}

impl DemoConfig {
    pub fn is_configured(&self) -> bool {
        !self.email.is_empty() && !self.password.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_not_configured() {
        assert!(!DemoConfig::default().is_configured());
    }

    #[test]
    fn not_configured_without_password() {
        let config = DemoConfig {
            email: "demo@example.com".into(),
            ..Default::default()
        };
        assert!(!config.is_configured());
    }
}
