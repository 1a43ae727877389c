//! The seam between the harness and a concrete backend transport.

use async_trait::async_trait;

use crate::outcome::{ErrorDetail, Row};
use crate::query::QueryDescriptor;
use crate::session::{AuthGrant, Session};

/// A hosted backend exposing authentication and row queries.
///
/// Implementations convert every transport or backend error into an
/// [`ErrorDetail`], preserving the backend's code, message and status. The
/// harness receives the backend as an explicit `Arc<dyn Backend>` so tests
/// can substitute a scripted one.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Exchange an identifier and secret for a user session.
    async fn sign_in(&self, identifier: &str, secret: &str) -> Result<AuthGrant, ErrorDetail>;

    /// Confirm a service credential is accepted with elevated privileges.
    async fn verify_elevated(&self, credential: &str) -> Result<(), ErrorDetail>;

    /// Run a query under a session's credential.
    ///
    /// User sessions are subject to row-level policies; elevated sessions
    /// bypass them.
    async fn query(
        &self,
        session: &Session,
        query: &QueryDescriptor,
    ) -> Result<Vec<Row>, ErrorDetail>;

    /// Revoke a user token.
    async fn sign_out(&self, token: &str) -> Result<(), ErrorDetail>;
}
