//! Reports: the ordered record of a verification run and its verdict.
//!
//! Construction ([`Report::record`]) and rendering ([`Report::render`]) are
//! separate steps. [`derive_verdict`] is a pure function of the report so it
//! can be exercised without a backend or console.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::outcome::{ErrorDetail, ErrorKind, Outcome, OutcomeKind, Row};

// ---------------------------------------------------------------------------
// AuthState
// ---------------------------------------------------------------------------

/// Whether the run's user session authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    /// No user sign-in was part of this run (elevated-only runs).
    #[default]
    NotAttempted,
    Authenticated,
    Rejected,
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// Overall result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    AllPassed,
    PartialFailure,
    TotalFailure,
}

impl Verdict {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AllPassed => "all_passed",
            Self::PartialFailure => "partial_failure",
            Self::TotalFailure => "total_failure",
        }
    }

    /// Process exit code: zero only for [`Verdict::AllPassed`].
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::AllPassed => 0,
            Self::PartialFailure => 1,
            Self::TotalFailure => 2,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntry {
    pub check: String,
    pub outcome: Outcome,
    /// Ran with the elevated credential, bypassing row-level policies.
    pub elevated: bool,
    /// An `Empty` outcome counts as a pass for this check.
    pub expect_empty: bool,
}

impl ReportEntry {
    #[must_use]
    pub fn new(check: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            check: check.into(),
            outcome,
            elevated: false,
            expect_empty: false,
        }
    }

    #[must_use]
    pub const fn elevated(mut self, elevated: bool) -> Self {
        self.elevated = elevated;
        self
    }

    #[must_use]
    pub const fn expect_empty(mut self, expect_empty: bool) -> Self {
        self.expect_empty = expect_empty;
        self
    }

    #[must_use]
    pub const fn is_unexpected_empty(&self) -> bool {
        matches!(self.outcome, Outcome::Empty) && !self.expect_empty
    }

    /// A failure or unexpected empty result.
    #[must_use]
    pub const fn is_problem(&self) -> bool {
        matches!(self.outcome, Outcome::Failure(_)) || self.is_unexpected_empty()
    }
}

/// Append-only record of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    auth: AuthState,
    entries: Vec<ReportEntry>,
}

impl Report {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: ReportEntry) {
        self.entries.push(entry);
    }

    pub const fn set_auth(&mut self, auth: AuthState) {
        self.auth = auth;
    }

    #[must_use]
    pub const fn auth(&self) -> AuthState {
        self.auth
    }

    #[must_use]
    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    /// The most recent entry recorded under `check`.
    #[must_use]
    pub fn entry(&self, check: &str) -> Option<&ReportEntry> {
        self.entries.iter().rev().find(|entry| entry.check == check)
    }

    #[must_use]
    pub fn outcome(&self, check: &str) -> Option<&Outcome> {
        self.entry(check).map(|entry| &entry.outcome)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn verdict(&self) -> Verdict {
        derive_verdict(self)
    }

    /// Translate into the serializable, re-parseable form.
    #[must_use]
    pub fn render(&self) -> RenderedReport {
        RenderedReport {
            verdict: self.verdict(),
            authentication: self.auth,
            entries: self.entries.iter().map(RenderedEntry::from).collect(),
        }
    }
}

/// Derive the overall verdict of a report.
///
/// - [`Verdict::TotalFailure`] when the user session was rejected.
/// - [`Verdict::PartialFailure`] when an entry failed, an entry was
///   unexpectedly empty, or there were entries but none of them ran.
/// - [`Verdict::AllPassed`] otherwise.
#[must_use]
pub fn derive_verdict(report: &Report) -> Verdict {
    if report.auth == AuthState::Rejected {
        return Verdict::TotalFailure;
    }
    let nothing_ran = !report.entries.is_empty()
        && report
            .entries
            .iter()
            .all(|entry| matches!(entry.outcome, Outcome::NotRun(_)));
    if nothing_ran || report.entries.iter().any(ReportEntry::is_problem) {
        Verdict::PartialFailure
    } else {
        Verdict::AllPassed
    }
}

// ---------------------------------------------------------------------------
// Rendered form
// ---------------------------------------------------------------------------

/// One line of a rendered report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderedEntry {
    pub check: String,
    pub outcome: OutcomeKind,
    pub elevated: bool,
    pub expect_empty: bool,
    /// Number of rows for `success`, zero for `empty`, absent otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<Row>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    /// Why the check did not run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<&ReportEntry> for RenderedEntry {
    fn from(entry: &ReportEntry) -> Self {
        let mut rendered = Self {
            check: entry.check.clone(),
            outcome: entry.outcome.kind(),
            elevated: entry.elevated,
            expect_empty: entry.expect_empty,
            row_count: None,
            rows: Vec::new(),
            error: None,
            reason: None,
        };
        match &entry.outcome {
            Outcome::Success(rows) => {
                rendered.row_count = Some(rows.len());
                rendered.rows.clone_from(rows);
            }
            Outcome::Empty => {
                rendered.row_count = Some(0);
                if !entry.expect_empty {
                    rendered.error = Some(ErrorDetail::new(
                        ErrorKind::NotFound,
                        "no_rows",
                        "no rows visible to this session",
                    ));
                }
            }
            Outcome::Failure(error) => rendered.error = Some(error.clone()),
            Outcome::NotRun(reason) => rendered.reason = Some(reason.clone()),
        }
        rendered
    }
}

/// The structured artifact printed by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderedReport {
    pub verdict: Verdict,
    pub authentication: AuthState,
    pub entries: Vec<RenderedEntry>,
}
