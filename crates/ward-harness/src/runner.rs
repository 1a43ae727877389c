//! Check execution and sequencing.

use std::fmt;
use std::sync::Arc;

use ward_core::{
    AuthState, Backend, ErrorDetail, Outcome, QueryDescriptor, Report, ReportEntry, Row, Session,
};

/// Which session a check runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The signed-in user; row-level policies apply.
    User,
    /// The service credential; row-level policies are bypassed.
    Elevated,
}

/// Builds a query from the report so far and the session the check runs
/// under. An `Err` skips the check with the given reason.
pub type DeriveQuery =
    Box<dyn Fn(&Report, &Session) -> Result<QueryDescriptor, String> + Send + Sync>;

/// Post-condition on the rows of a successful query. An `Err` turns the
/// outcome into a failure.
pub type RowCheck = fn(&[Row]) -> Result<(), ErrorDetail>;

pub enum QuerySource {
    Static(QueryDescriptor),
    Derived(DeriveQuery),
}

/// A named probe and how to run it.
pub struct CheckSpec {
    pub name: String,
    pub scope: Scope,
    /// Zero rows counts as a pass.
    pub expect_empty: bool,
    /// Name of an earlier check that must have succeeded.
    pub depends_on: Option<String>,
    pub query: QuerySource,
    pub verify: Option<RowCheck>,
}

impl CheckSpec {
    /// A user-scoped check with a fixed query.
    pub fn new(name: impl Into<String>, query: QueryDescriptor) -> Self {
        Self::with_source(name, QuerySource::Static(query))
    }

    /// A user-scoped check whose query depends on earlier results.
    pub fn derived<F>(name: impl Into<String>, derive: F) -> Self
    where
        F: Fn(&Report, &Session) -> Result<QueryDescriptor, String> + Send + Sync + 'static,
    {
        Self::with_source(name, QuerySource::Derived(Box::new(derive)))
    }

    fn with_source(name: impl Into<String>, query: QuerySource) -> Self {
        Self {
            name: name.into(),
            scope: Scope::User,
            expect_empty: false,
            depends_on: None,
            query,
            verify: None,
        }
    }

    #[must_use]
    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub fn expect_empty(mut self, expect_empty: bool) -> Self {
        self.expect_empty = expect_empty;
        self
    }

    #[must_use]
    pub fn depends_on(mut self, upstream: impl Into<String>) -> Self {
        self.depends_on = Some(upstream.into());
        self
    }

    #[must_use]
    pub fn verify(mut self, check: RowCheck) -> Self {
        self.verify = Some(check);
        self
    }
}

impl fmt::Debug for CheckSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let query = match &self.query {
            QuerySource::Static(query) => query.to_string(),
            QuerySource::Derived(_) => "<derived>".to_string(),
        };
        f.debug_struct("CheckSpec")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("expect_empty", &self.expect_empty)
            .field("depends_on", &self.depends_on)
            .field("query", &query)
            .finish_non_exhaustive()
    }
}

/// The sessions available to a sequence.
#[derive(Debug, Clone, Copy)]
pub struct Sessions<'a> {
    pub user: &'a Session,
    pub elevated: Option<&'a Session>,
}

/// Runs checks against a backend.
pub struct CheckRunner {
    backend: Arc<dyn Backend>,
}

impl CheckRunner {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Run one query and classify the result.
    pub async fn run(&self, session: &Session, query: &QueryDescriptor) -> Outcome {
        tracing::debug!(%query, session = %session.kind(), "running check query");
        Outcome::classify(self.backend.query(session, query).await)
    }

    /// Run `checks` in order into a fresh report.
    ///
    /// The report's authentication state reflects whether the user session is
    /// live.
    pub async fn run_sequence(&self, sessions: Sessions<'_>, checks: &[CheckSpec]) -> Report {
        let mut report = Report::new();
        if sessions.user.is_authenticated() {
            report.set_auth(AuthState::Authenticated);
        }
        self.run_into(&mut report, sessions, checks).await;
        report
    }

    /// Run `checks` in order, appending one entry per check to `report`.
    ///
    /// A check whose session is unavailable, whose upstream did not succeed,
    /// or whose query cannot be derived is recorded as `NotRun`; the
    /// remaining checks still run.
    pub async fn run_into<'c>(
        &self,
        report: &mut Report,
        sessions: Sessions<'_>,
        checks: impl IntoIterator<Item = &'c CheckSpec>,
    ) {
        for check in checks {
            let outcome = match prepare(report, sessions, check) {
                Err(reason) => Outcome::NotRun(reason),
                Ok((session, query)) => {
                    let outcome = self.run(session, &query).await;
                    apply_verify(outcome, check.verify)
                }
            };
            tracing::debug!(check = %check.name, outcome = %outcome.kind(), "check finished");
            report.record(
                ReportEntry::new(check.name.clone(), outcome)
                    .elevated(check.scope == Scope::Elevated)
                    .expect_empty(check.expect_empty),
            );
        }
    }
}

fn prepare<'s>(
    report: &Report,
    sessions: Sessions<'s>,
    check: &CheckSpec,
) -> Result<(&'s Session, QueryDescriptor), String> {
    let session = match check.scope {
        Scope::User if sessions.user.is_authenticated() => sessions.user,
        Scope::User => return Err("user session is not authenticated".into()),
        Scope::Elevated => sessions
            .elevated
            .filter(|s| s.is_authenticated())
            .ok_or_else(|| "no elevated session".to_string())?,
    };

    if let Some(upstream) = &check.depends_on {
        match report.outcome(upstream) {
            None => return Err(format!("upstream check '{upstream}' has not run")),
            Some(outcome) if !outcome.is_success() => {
                return Err(format!("upstream check '{upstream}' was {}", outcome.kind()));
            }
            Some(_) => {}
        }
    }

    let query = match &check.query {
        QuerySource::Static(query) => query.clone(),
        QuerySource::Derived(derive) => derive(report, session)?,
    };
    Ok((session, query))
}

fn apply_verify(outcome: Outcome, verify: Option<RowCheck>) -> Outcome {
    match (outcome, verify) {
        (Outcome::Success(rows), Some(verify)) => match verify(&rows) {
            Ok(()) => Outcome::Success(rows),
            Err(detail) => Outcome::Failure(detail),
        },
        (outcome, _) => outcome,
    }
}
