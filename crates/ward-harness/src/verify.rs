//! A complete verification run: establish sessions, run checks, release.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use ward_core::{AuthState, Backend, Outcome, Report, ReportEntry, Row, Session};

use crate::checks::AUTHENTICATE;
use crate::error::HarnessError;
use crate::establish::{authenticate, authenticate_elevated, release};
use crate::guard::SessionGuard;
use crate::runner::{CheckRunner, CheckSpec, Scope, Sessions};

/// Identifier and secret for the user session.
#[derive(Clone)]
pub struct Credentials {
    pub identifier: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// What to run and with which credentials.
#[derive(Debug, Default)]
pub struct RunPlan {
    /// Sign in as this user before the checks. `None` leaves user-scoped
    /// checks un-run.
    pub credentials: Option<Credentials>,
    /// Service credential; required only when a check is elevated.
    pub service_credential: Option<String>,
    pub checks: Vec<CheckSpec>,
}

impl RunPlan {
    #[must_use]
    pub fn needs_elevated(&self) -> bool {
        self.checks.iter().any(|c| c.scope == Scope::Elevated)
    }
}

/// Run a plan end to end.
///
/// The elevated session is established first so a bad service credential
/// aborts before anything else happens. A rejected user sign-in is recorded
/// as the `authenticate` entry and stands in for every user-scoped check:
/// those are left out of the report while elevated checks still run. Both
/// sessions are released on every path out of this function.
///
/// # Errors
///
/// Returns [`HarnessError`] when the plan needs an elevated session and the
/// service credential is missing or rejected.
pub async fn verify(backend: Arc<dyn Backend>, plan: &RunPlan) -> Result<Report, HarnessError> {
    let mut elevated = if plan.needs_elevated() {
        Some(authenticate_elevated(backend.as_ref(), plan.service_credential.as_deref()).await?)
    } else {
        None
    };

    let mut report = Report::new();
    let user = match &plan.credentials {
        None => Session::unauthenticated(),
        Some(credentials) => {
            match authenticate(backend.as_ref(), &credentials.identifier, &credentials.secret).await
            {
                Ok(session) => {
                    report.record(ReportEntry::new(
                        AUTHENTICATE,
                        Outcome::Success(vec![subject_row(&session)]),
                    ));
                    report.set_auth(AuthState::Authenticated);
                    session
                }
                Err(detail) => {
                    tracing::warn!(%detail, "user authentication failed");
                    report.record(ReportEntry::new(AUTHENTICATE, Outcome::Failure(detail)));
                    report.set_auth(AuthState::Rejected);
                    Session::unauthenticated()
                }
            }
        }
    };

    let guard = SessionGuard::new(Arc::clone(&backend), user);
    let runner = CheckRunner::new(Arc::clone(&backend));
    let sessions = Sessions {
        user: guard.session(),
        elevated: elevated.as_ref(),
    };
    let rejected = report.auth() == AuthState::Rejected;
    let checks = plan
        .checks
        .iter()
        .filter(|check| !rejected || check.scope == Scope::Elevated);
    runner.run_into(&mut report, sessions, checks).await;

    guard.release().await;
    if let Some(session) = elevated.as_mut() {
        release(backend.as_ref(), session).await;
    }
    Ok(report)
}

fn subject_row(session: &Session) -> Row {
    let mut row = Row::new();
    if let Some(subject) = session.subject_id() {
        row.insert("subject_id".into(), Value::String(subject.to_string()));
    }
    if let Some(expires_at) = session.expires_at() {
        row.insert("expires_at".into(), Value::String(expires_at.to_rfc3339()));
    }
    row
}

#[cfg(test)]
#[path = "verify_tests.rs"]
mod tests;
