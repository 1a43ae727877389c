//! # ward-core
//!
//! Core types for the Warden backend verification harness.
//!
//! - [`Session`] handles produced by authentication
//! - [`QueryDescriptor`] describing what a check asks the backend
//! - [`Outcome`] with the three-way classification of query results
//! - [`Report`] and the pure [`derive_verdict`] over it
//! - the [`Backend`] trait every transport implements

pub mod backend;
pub mod errors;
pub mod outcome;
pub mod policy;
pub mod query;
pub mod report;
pub mod session;

pub use backend::Backend;
pub use errors::CoreError;
pub use outcome::{ErrorDetail, ErrorKind, Outcome, OutcomeKind, Row};
pub use policy::{CommandKind, PolicyDescriptor};
pub use query::{Direction, Filter, FilterOp, Order, QueryDescriptor, Target};
pub use report::{
    AuthState, RenderedEntry, RenderedReport, Report, ReportEntry, Verdict, derive_verdict,
};
pub use session::{AuthGrant, Session, SessionKind};
