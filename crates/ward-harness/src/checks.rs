//! Built-in checks and the diagnoses drawn from them.
//!
//! Table-specific checks are named `<check>:<table>` so several tables can be
//! probed in one report.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ward_config::ChecksConfig;
use ward_core::{
    CoreError, ErrorDetail, ErrorKind, Outcome, PolicyDescriptor, QueryDescriptor, Report, Row,
};

use crate::runner::{CheckSpec, Scope};

/// Report entry recording the user sign-in.
pub const AUTHENTICATE: &str = "authenticate";
pub const PROFILE: &str = "profile";
pub const ORGANIZATION: &str = "organization";

const RLS_FLAG_FIELDS: [&str; 4] = ["rls_enabled", "enabled", "relrowsecurity", "rowsecurity"];

#[must_use]
pub fn policies_name(table: &str) -> String {
    format!("policies:{table}")
}

#[must_use]
pub fn rls_status_name(table: &str) -> String {
    format!("rls_status:{table}")
}

#[must_use]
pub fn ground_truth_name(table: &str) -> String {
    format!("ground_truth:{table}")
}

#[must_use]
pub fn visible_rows_name(table: &str) -> String {
    format!("visible_rows:{table}")
}

fn table_args(table: &str) -> Map<String, Value> {
    let mut args = Map::new();
    args.insert("table_name".into(), Value::String(table.to_string()));
    args
}

/// Elevated policy introspection. Fails if any returned row is not a policy.
#[must_use]
pub fn policies(config: &ChecksConfig, table: &str) -> CheckSpec {
    CheckSpec::new(
        policies_name(table),
        QueryDescriptor::procedure(&config.policy_function, table_args(table)),
    )
    .scope(Scope::Elevated)
    .verify(verify_policies)
}

/// Elevated lookup of the table's row-level security flag. Fails when RLS is
/// off.
#[must_use]
pub fn rls_status(config: &ChecksConfig, table: &str) -> CheckSpec {
    CheckSpec::new(
        rls_status_name(table),
        QueryDescriptor::procedure(&config.rls_function, table_args(table)),
    )
    .scope(Scope::Elevated)
    .verify(verify_rls_enabled)
}

/// Elevated probe for any row in the table, regardless of policies.
#[must_use]
pub fn ground_truth(table: &str) -> CheckSpec {
    CheckSpec::new(ground_truth_name(table), QueryDescriptor::table(table).limit(1))
        .scope(Scope::Elevated)
}

/// The same probe under the user session.
#[must_use]
pub fn visible_rows(table: &str) -> CheckSpec {
    CheckSpec::new(visible_rows_name(table), QueryDescriptor::table(table).limit(1))
}

/// The profile row keyed by the authenticated subject.
#[must_use]
pub fn profile(config: &ChecksConfig) -> CheckSpec {
    let table = config.profile_table.clone();
    let key = config.profile_key.clone();
    CheckSpec::derived(PROFILE, move |_, session| {
        let subject = session
            .subject_id()
            .ok_or_else(|| "session has no subject".to_string())?;
        Ok(QueryDescriptor::table(&table).eq(&key, subject).limit(1))
    })
    .depends_on(AUTHENTICATE)
}

/// The organization row referenced by the profile.
#[must_use]
pub fn organization(config: &ChecksConfig) -> CheckSpec {
    let table = config.organization_table.clone();
    let key = config.organization_key.clone();
    let reference = config.organization_ref.clone();
    CheckSpec::derived(ORGANIZATION, move |report, _| {
        let value = upstream_field(report, PROFILE, &reference)?;
        Ok(QueryDescriptor::table(&table).eq(&key, value).limit(1))
    })
    .depends_on(PROFILE)
}

/// Profile then organization.
#[must_use]
pub fn account_checks(config: &ChecksConfig) -> Vec<CheckSpec> {
    vec![profile(config), organization(config)]
}

/// Everything needed to tell policy blocking from missing data on `table`.
#[must_use]
pub fn rls_checks(config: &ChecksConfig, table: &str) -> Vec<CheckSpec> {
    vec![
        rls_status(config, table),
        policies(config, table),
        ground_truth(table).expect_empty(true),
        visible_rows(table).expect_empty(true),
    ]
}

/// Read a non-null field from the first row of an upstream check.
///
/// # Errors
///
/// Returns the skip reason when the upstream has no row or the field is
/// missing or null.
pub fn upstream_field(report: &Report, upstream: &str, field: &str) -> Result<Value, String> {
    let row = report
        .outcome(upstream)
        .and_then(Outcome::first_row)
        .ok_or_else(|| format!("{upstream} returned no row"))?;
    match row.get(field) {
        Some(Value::Null) | None => Err(format!("{upstream} has no {field}")),
        Some(value) => Ok(value.clone()),
    }
}

/// Parse the policy rows of a successful introspection check.
///
/// # Errors
///
/// Returns [`CoreError::MalformedRow`] for the first row that is not a
/// policy.
pub fn policies_from_outcome(outcome: &Outcome) -> Result<Vec<PolicyDescriptor>, CoreError> {
    PolicyDescriptor::from_rows(outcome.rows())
}

fn verify_policies(rows: &[Row]) -> Result<(), ErrorDetail> {
    PolicyDescriptor::from_rows(rows)
        .map(|_| ())
        .map_err(|e| ErrorDetail::new(ErrorKind::Query, "malformed_policy", e.to_string()))
}

fn verify_rls_enabled(rows: &[Row]) -> Result<(), ErrorDetail> {
    let row = rows.first().ok_or_else(|| {
        ErrorDetail::new(ErrorKind::Query, "malformed_rls_status", "no status row")
    })?;
    let flag = RLS_FLAG_FIELDS
        .iter()
        .find_map(|field| row.get(*field).and_then(Value::as_bool))
        .or_else(|| match row.values().collect::<Vec<_>>().as_slice() {
            [single] => single.as_bool(),
            _ => None,
        });

    match flag {
        Some(true) => Ok(()),
        Some(false) => Err(ErrorDetail::new(
            ErrorKind::Query,
            "rls_disabled",
            "row level security is disabled",
        )),
        None => Err(ErrorDetail::new(
            ErrorKind::Query,
            "malformed_rls_status",
            "status row has no boolean RLS flag",
        )),
    }
}

// ---------------------------------------------------------------------------
// Visibility diagnosis
// ---------------------------------------------------------------------------

/// What an elevated probe and a user probe of the same table reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Rows exist but policies hide them from the user.
    Hidden,
    /// The user sees rows.
    Visible,
    /// The table has no rows at all.
    Absent,
    /// A probe failed or did not run.
    Inconclusive,
}

impl Visibility {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hidden => "hidden",
            Self::Visible => "visible",
            Self::Absent => "absent",
            Self::Inconclusive => "inconclusive",
        }
    }

    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Hidden => "rows exist but row-level policies hide them from this user",
            Self::Visible => "rows exist and are visible to this user",
            Self::Absent => "the table is empty; nothing to see",
            Self::Inconclusive => "a probe failed or did not run",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compare the elevated `ground` probe with the user `visible` probe.
#[must_use]
pub fn diagnose_visibility(report: &Report, ground: &str, visible: &str) -> Visibility {
    match (report.outcome(ground), report.outcome(visible)) {
        (Some(Outcome::Success(_)), Some(Outcome::Empty)) => Visibility::Hidden,
        (Some(Outcome::Success(_)), Some(Outcome::Success(_))) => Visibility::Visible,
        (Some(Outcome::Empty), Some(Outcome::Empty)) => Visibility::Absent,
        _ => Visibility::Inconclusive,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;
    use ward_core::{CommandKind, ReportEntry};

    use super::*;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn report_of(entries: Vec<(&str, Outcome)>) -> Report {
        let mut report = Report::new();
        for (name, outcome) in entries {
            report.record(ReportEntry::new(name, outcome));
        }
        report
    }

    #[rstest]
    #[case::hidden(Outcome::Success(vec![row(json!({"id": 1}))]), Outcome::Empty, Visibility::Hidden)]
    #[case::visible(Outcome::Success(vec![row(json!({"id": 1}))]), Outcome::Success(vec![row(json!({"id": 1}))]), Visibility::Visible)]
    #[case::absent(Outcome::Empty, Outcome::Empty, Visibility::Absent)]
    #[case::user_denied(Outcome::Success(vec![row(json!({"id": 1}))]), Outcome::Failure(ErrorDetail::transport("reset")), Visibility::Inconclusive)]
    #[case::not_run(Outcome::NotRun("no elevated session".into()), Outcome::Empty, Visibility::Inconclusive)]
    fn visibility_table(#[case] ground: Outcome, #[case] visible: Outcome, #[case] expected: Visibility) {
        let report = report_of(vec![("ground", ground), ("visible", visible)]);
        assert_eq!(diagnose_visibility(&report, "ground", "visible"), expected);
    }

    #[test]
    fn visibility_of_missing_entries_is_inconclusive() {
        assert_eq!(
            diagnose_visibility(&Report::new(), "ground", "visible"),
            Visibility::Inconclusive
        );
    }

    #[test]
    fn rls_flag_is_read_from_known_fields_or_single_scalar() {
        assert!(verify_rls_enabled(&[row(json!({"rls_enabled": true}))]).is_ok());
        assert!(verify_rls_enabled(&[row(json!({"relname": "profiles", "relrowsecurity": true}))]).is_ok());
        assert!(verify_rls_enabled(&[row(json!({"check_rls": true}))]).is_ok());

        let off = verify_rls_enabled(&[row(json!({"enabled": false}))]).unwrap_err();
        assert_eq!(off.code, "rls_disabled");

        let odd = verify_rls_enabled(&[row(json!({"a": 1, "b": 2}))]).unwrap_err();
        assert_eq!(odd.code, "malformed_rls_status");
    }

    #[test]
    fn malformed_policy_row_fails_verification() {
        let err = verify_policies(&[row(json!({"policyname": "", "cmd": "SELECT"}))]).unwrap_err();
        assert_eq!(err.code, "malformed_policy");
    }

    #[test]
    fn policies_are_parsed_from_success_rows() {
        let outcome = Outcome::Success(vec![
            row(json!({"policyname": "own rows", "cmd": "SELECT", "qual": "(auth.uid() = id)"})),
            row(json!({"policyname": "own insert", "cmd": "INSERT", "with_check": "(auth.uid() = id)"})),
        ]);
        let policies = policies_from_outcome(&outcome).unwrap();
        assert_eq!(policies.len(), 2);
        assert_eq!(policies[1].applies_to, CommandKind::Insert);
        assert!(policies_from_outcome(&Outcome::Empty).unwrap().is_empty());
    }

    #[test]
    fn upstream_field_rejects_null() {
        let report = report_of(vec![(
            PROFILE,
            Outcome::Success(vec![row(json!({"organization_id": null}))]),
        )]);
        assert_eq!(
            upstream_field(&report, PROFILE, "organization_id"),
            Err("profile has no organization_id".to_string())
        );
        assert_eq!(
            upstream_field(&Report::new(), PROFILE, "organization_id"),
            Err("profile returned no row".to_string())
        );
    }

    #[test]
    fn rls_checks_use_configured_procedures() {
        let config = ChecksConfig {
            rls_function: "table_rls".into(),
            ..ChecksConfig::default()
        };
        let checks = rls_checks(&config, "invites");
        let names: Vec<&str> = checks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "rls_status:invites",
                "policies:invites",
                "ground_truth:invites",
                "visible_rows:invites"
            ]
        );
        assert_eq!(checks[0].scope, Scope::Elevated);
        assert_eq!(checks[3].scope, Scope::User);
        match &checks[0].query {
            crate::runner::QuerySource::Static(query) => {
                assert_eq!(query.to_string(), "rpc/table_rls");
            }
            crate::runner::QuerySource::Derived(_) => panic!("expected a static query"),
        }
    }
}
