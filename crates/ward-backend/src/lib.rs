//! # ward-backend
//!
//! HTTP transport for Warden against a hosted backend that exposes an auth
//! service under `/auth/v1` and a REST layer under `/rest/v1` (the layout
//! Supabase projects use).
//!
//! [`HttpBackend`] implements [`ward_core::Backend`]; every transport or
//! backend error is converted into a [`ward_core::ErrorDetail`] at that
//! boundary, with the backend's code, message and status kept verbatim.

mod auth;
mod error;
mod http;
mod rest;

pub use error::{BackendError, Endpoint};

use std::time::Duration;

use async_trait::async_trait;
use ward_config::BackendConfig;
use ward_core::{AuthGrant, Backend, ErrorDetail, ErrorKind, QueryDescriptor, Row, Session, SessionKind};

use crate::rest::RestAuth;

/// HTTP client for one backend project.
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl HttpBackend {
    /// Create a backend client.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Build`] if the underlying `reqwest::Client`
    /// fails to build.
    pub fn new(
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("warden/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| BackendError::Build(e.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            http,
            base_url,
            anon_key: anon_key.into(),
        })
    }

    /// Create a backend client from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Build`] if the URL or anonymous key is missing
    /// or the client cannot be built.
    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        let url = config
            .validated_url()
            .map_err(|e| BackendError::Build(e.to_string()))?;
        Self::new(url, config.anon_key.clone(), config.timeout_secs)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn sign_in(&self, identifier: &str, secret: &str) -> Result<AuthGrant, ErrorDetail> {
        self.sign_in_with_password(identifier, secret)
            .await
            .map_err(|e| e.into_detail(Endpoint::Auth))
    }

    async fn verify_elevated(&self, credential: &str) -> Result<(), ErrorDetail> {
        self.check_service_credential(credential)
            .await
            .map_err(|e| e.into_detail(Endpoint::Auth))
    }

    async fn query(
        &self,
        session: &Session,
        query: &QueryDescriptor,
    ) -> Result<Vec<Row>, ErrorDetail> {
        let Some(token) = session.token() else {
            return Err(ErrorDetail::new(
                ErrorKind::Authentication,
                "no_session",
                "session holds no credential",
            ));
        };
        // Service credentials go in both headers; newer secret keys are only
        // honoured as `apikey`.
        let auth = match session.kind() {
            SessionKind::Elevated => RestAuth {
                apikey: token,
                bearer: token,
            },
            SessionKind::User | SessionKind::Unauthenticated => RestAuth {
                apikey: &self.anon_key,
                bearer: token,
            },
        };
        self.execute(auth, query)
            .await
            .map_err(|e| e.into_detail(Endpoint::Rest))
    }

    async fn sign_out(&self, token: &str) -> Result<(), ErrorDetail> {
        self.logout(token)
            .await
            .map_err(|e| e.into_detail(Endpoint::Auth))
    }
}
