//! Scoped ownership of a user session.

use std::sync::Arc;

use ward_core::{Backend, Session};

use crate::establish;

/// Owns a session for the duration of a run and guarantees its release.
///
/// Call [`SessionGuard::release`] on the normal path. The drop path is a
/// backstop only: if the guard is dropped while the session is still live
/// (early return, `?`, panic unwind), the logout is spawned onto the current
/// tokio runtime and is lost if the process exits before it completes. The
/// token is always invalidated locally either way.
pub struct SessionGuard {
    backend: Arc<dyn Backend>,
    session: Session,
}

impl SessionGuard {
    pub fn new(backend: Arc<dyn Backend>, session: Session) -> Self {
        Self { backend, session }
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Revoke the session and wait for the backend to answer.
    pub async fn release(mut self) {
        establish::release(self.backend.as_ref(), &mut self.session).await;
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(token) = self.session.invalidate() else {
            return;
        };
        tracing::warn!("session dropped without release; best-effort revoke in background");

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no async runtime available; session token left to expire");
            return;
        };
        let backend = Arc::clone(&self.backend);
        handle.spawn(async move {
            if let Err(error) = backend.sign_out(&token).await {
                tracing::warn!(%error, "failed to revoke session token");
            }
        });
    }
}
