//! Auth service calls: password sign-in, logout and service-credential check.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use ward_core::AuthGrant;

use crate::HttpBackend;
use crate::error::BackendError;
use crate::http::check_response;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: TokenUser,
}

#[derive(Deserialize)]
struct TokenUser {
    id: String,
}

impl TokenResponse {
    fn into_grant(self, now: DateTime<Utc>) -> AuthGrant {
        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .or_else(|| {
                self.expires_in
                    .map(|secs| now + chrono::TimeDelta::seconds(secs))
            });
        AuthGrant {
            subject_id: self.user.id,
            access_token: self.access_token,
            expires_at,
        }
    }
}

impl HttpBackend {
    /// Exchange email + password for an access token.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Api`] when the credentials are rejected,
    /// [`BackendError::Http`] on transport failure, and
    /// [`BackendError::Parse`] if the token response lacks `access_token` or
    /// `user.id`.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthGrant, BackendError> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);
        tracing::debug!(%url, email, "signing in with password");

        let resp = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        let body = check_response(resp).await?.text().await?;

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| BackendError::Parse(format!("token response: {e}")))?;
        Ok(token.into_grant(Utc::now()))
    }

    /// Revoke the session behind `access_token`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the request fails or the backend rejects it.
    pub async fn logout(&self, access_token: &str) -> Result<(), BackendError> {
        let url = format!("{}/auth/v1/logout", self.base_url);
        tracing::debug!(%url, "signing out");

        let resp = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        check_response(resp).await?;
        Ok(())
    }

    /// Confirm `credential` is a service credential by listing one user
    /// through the admin API, which rejects anything without elevated rights.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Api`] with the backend's status and code when
    /// the credential is rejected.
    pub async fn check_service_credential(&self, credential: &str) -> Result<(), BackendError> {
        let url = format!("{}/auth/v1/admin/users?page=1&per_page=1", self.base_url);
        tracing::debug!(%url, "verifying service credential");

        let resp = self
            .http
            .get(&url)
            .header("apikey", credential)
            .bearer_auth(credential)
            .send()
            .await?;
        check_response(resp).await?;
        Ok(())
    }
}
