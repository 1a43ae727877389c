//! Session establishment and release.
//!
//! The backend is always an explicit parameter; nothing here holds a
//! process-wide client.

use ward_core::{Backend, ErrorDetail, ErrorKind, Session};

use crate::error::HarnessError;

/// Sign in with an identifier and secret.
///
/// Empty inputs are rejected without contacting the backend. Every backend or
/// transport error comes back as an [`ErrorDetail`] with the backend's code,
/// message and status intact.
///
/// # Errors
///
/// Returns the [`ErrorDetail`] describing why the session was not
/// established.
pub async fn authenticate(
    backend: &dyn Backend,
    identifier: &str,
    secret: &str,
) -> Result<Session, ErrorDetail> {
    if identifier.trim().is_empty() || secret.is_empty() {
        return Err(ErrorDetail::new(
            ErrorKind::Authentication,
            "missing_credentials",
            "identifier and secret must both be non-empty",
        ));
    }

    let grant = backend.sign_in(identifier, secret).await?;
    tracing::debug!(subject = %grant.subject_id, "user session established");
    Ok(Session::user(grant))
}

/// Establish an elevated session from a service credential.
///
/// # Errors
///
/// Returns [`HarnessError::Configuration`] when no credential is supplied and
/// [`HarnessError::ElevatedRejected`] when the backend refuses it. Both are
/// fatal: no check should run afterwards.
pub async fn authenticate_elevated(
    backend: &dyn Backend,
    service_credential: Option<&str>,
) -> Result<Session, HarnessError> {
    let credential = service_credential
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| {
            HarnessError::Configuration(
                "elevated checks need a service credential (WARDEN_BACKEND__SERVICE_ROLE_KEY)"
                    .into(),
            )
        })?;

    backend
        .verify_elevated(credential)
        .await
        .map_err(HarnessError::ElevatedRejected)?;
    tracing::debug!("elevated session established");
    Ok(Session::elevated(credential))
}

/// Release a session.
///
/// Safe to call any number of times and on sessions that never
/// authenticated. Only user tokens are revoked; a logout failure is logged
/// and otherwise ignored.
pub async fn release(backend: &dyn Backend, session: &mut Session) {
    let Some(token) = session.invalidate() else {
        return;
    };
    match backend.sign_out(&token).await {
        Ok(()) => tracing::debug!("session released"),
        Err(error) => tracing::warn!(%error, "failed to revoke session token"),
    }
}
