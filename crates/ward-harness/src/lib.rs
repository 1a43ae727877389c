//! # ward-harness
//!
//! The verification workflow: establish sessions, run checks in order,
//! collect outcomes into a [`ward_core::Report`].
//!
//! - [`establish`]: sign-in, elevated sign-in and idempotent release
//! - [`guard`]: scoped ownership that releases the user session on every exit path
//! - [`runner`]: single-check classification and dependency-aware sequencing
//! - [`checks`]: built-in probes (profile, organization, RLS, policies) and
//!   the visibility diagnosis
//! - [`plan`]: TOML plan files
//! - [`verify`]: the end-to-end run used by the CLI
//!
//! The backend is always passed in explicitly as an `Arc<dyn Backend>`.

pub mod checks;
pub mod error;
pub mod establish;
pub mod guard;
pub mod plan;
pub mod runner;
pub mod verify;

#[cfg(test)]
mod test_support;

pub use error::{HarnessError, PlanError};
pub use establish::{authenticate, authenticate_elevated, release};
pub use guard::SessionGuard;
pub use plan::{load_plan, parse_plan};
pub use runner::{CheckRunner, CheckSpec, QuerySource, Scope, Sessions};
pub use verify::{Credentials, RunPlan, verify};
