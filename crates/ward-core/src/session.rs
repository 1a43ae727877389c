use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of credential a [`Session`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// Signed in with an identifier and secret; row-level policies apply.
    User,
    /// Service credential that bypasses row-level policies.
    Elevated,
    /// Sign-in was rejected or never attempted.
    Unauthenticated,
}

impl SessionKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Elevated => "elevated",
            Self::Unauthenticated => "unauthenticated",
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credentials handed back by a successful password sign-in.
#[derive(Clone)]
pub struct AuthGrant {
    /// Backend user id (`user.id` in the token response).
    pub subject_id: String,
    /// Bearer token for subsequent queries.
    pub access_token: String,
    /// Token expiry, when the backend reports `expires_in` or `expires_at`.
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for AuthGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthGrant")
            .field("subject_id", &self.subject_id)
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// A handle to the backend, valid until released.
///
/// Produced by the session establisher. The token is never exposed through
/// `Debug`. Once [`Session::invalidate`] has run the session reports itself
/// unauthenticated and carries neither token nor subject.
#[derive(Clone)]
pub struct Session {
    kind: SessionKind,
    subject_id: Option<String>,
    token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    released: bool,
}

impl Session {
    #[must_use]
    pub fn user(grant: AuthGrant) -> Self {
        Self {
            kind: SessionKind::User,
            subject_id: Some(grant.subject_id),
            token: Some(grant.access_token),
            expires_at: grant.expires_at,
            released: false,
        }
    }

    #[must_use]
    pub fn elevated(credential: impl Into<String>) -> Self {
        Self {
            kind: SessionKind::Elevated,
            subject_id: None,
            token: Some(credential.into()),
            expires_at: None,
            released: false,
        }
    }

    /// A session that never authenticated. Releasing it is a no-op.
    #[must_use]
    pub const fn unauthenticated() -> Self {
        Self {
            kind: SessionKind::Unauthenticated,
            subject_id: None,
            token: None,
            expires_at: None,
            released: false,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> SessionKind {
        self.kind
    }

    #[must_use]
    pub fn subject_id(&self) -> Option<&str> {
        self.subject_id.as_deref()
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    #[must_use]
    pub const fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// True while the session holds a live credential.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        !self.released && self.token.is_some()
    }

    #[must_use]
    pub fn is_elevated(&self) -> bool {
        self.kind == SessionKind::Elevated && self.is_authenticated()
    }

    #[must_use]
    pub const fn is_released(&self) -> bool {
        self.released
    }

    /// Check if the token is expired or expires within `buffer_secs`.
    ///
    /// Sessions without a known expiry never report as near expiry.
    #[must_use]
    pub fn is_near_expiry(&self, buffer_secs: i64) -> bool {
        self.expires_at.is_some_and(|expires_at| {
            expires_at <= Utc::now() + chrono::TimeDelta::seconds(buffer_secs)
        })
    }

    /// Drop the credential and mark the session released.
    ///
    /// Returns the token the first time it is called on a user session so the
    /// caller can revoke it remotely. Returns `None` on every later call and
    /// for elevated or unauthenticated sessions.
    pub fn invalidate(&mut self) -> Option<String> {
        if self.released {
            return None;
        }
        self.released = true;
        self.subject_id = None;
        let token = self.token.take();
        match self.kind {
            SessionKind::User => token,
            SessionKind::Elevated | SessionKind::Unauthenticated => None,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("kind", &self.kind)
            .field("subject_id", &self.subject_id)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .field("released", &self.released)
            .finish()
    }
}
