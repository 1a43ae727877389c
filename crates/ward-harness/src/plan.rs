//! TOML plan files: an ordered list of checks to run.
//!
//! ```toml
//! [[check]]
//! name = "profile"
//! table = "profiles"
//! select = "id,role,organization_id"
//! limit = 1
//! bind = [{ field = "id", from = "session.subject_id" }]
//!
//! [[check]]
//! name = "organization"
//! table = "organizations"
//! bind = [{ field = "id", from = "profile.organization_id" }]
//!
//! [[check]]
//! name = "policies"
//! rpc = "list_policies"
//! args = { table_name = "profiles" }
//! elevated = true
//! ```
//!
//! A `bind` fills an equality filter (or, for `rpc` checks, a named argument)
//! at run time, either from the session subject or from a field of an earlier
//! check's first row. Binding to an earlier check implies `depends_on` it.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};
use ward_core::{Direction, FilterOp, QueryDescriptor, Report, Session, Target};

use crate::checks::{AUTHENTICATE, upstream_field};
use crate::error::PlanError;
use crate::runner::{CheckSpec, Scope};

const SUBJECT_SOURCE: &str = "session.subject_id";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlanFile {
    #[serde(default, rename = "check")]
    checks: Vec<CheckEntry>,
}

/// One `[[check]]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckEntry {
    pub name: String,
    pub table: Option<String>,
    pub rpc: Option<String>,
    #[serde(default)]
    pub args: Map<String, Value>,
    pub select: Option<String>,
    #[serde(default)]
    pub filter: Vec<FilterEntry>,
    /// `"column"` or `"column.asc"` / `"column.desc"`.
    #[serde(default)]
    pub order: Vec<String>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub elevated: bool,
    #[serde(default)]
    pub expect_empty: bool,
    pub depends_on: Option<String>,
    #[serde(default)]
    pub bind: Vec<BindEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterEntry {
    pub field: String,
    #[serde(default = "default_op")]
    pub op: FilterOp,
    pub value: Value,
}

const fn default_op() -> FilterOp {
    FilterOp::Eq
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindEntry {
    pub field: String,
    /// `session.subject_id` or `<check>.<column>`.
    pub from: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BindSource {
    Subject,
    Upstream { check: String, field: String },
}

#[derive(Debug, Clone)]
struct Binding {
    field: String,
    source: BindSource,
}

/// Load and validate a plan file.
///
/// # Errors
///
/// Returns [`PlanError::Io`] if the file cannot be read, [`PlanError::Toml`]
/// on syntax errors, and [`PlanError::Invalid`] for checks that cannot run.
pub fn load_plan(path: &Path) -> Result<Vec<CheckSpec>, PlanError> {
    let text = std::fs::read_to_string(path).map_err(|source| PlanError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_plan(&text)
}

/// Parse and validate plan TOML.
///
/// # Errors
///
/// See [`load_plan`].
pub fn parse_plan(text: &str) -> Result<Vec<CheckSpec>, PlanError> {
    let plan: PlanFile = toml::from_str(text)?;
    let mut seen: HashSet<String> = HashSet::from([AUTHENTICATE.to_string()]);
    let mut specs = Vec::with_capacity(plan.checks.len());

    for entry in plan.checks {
        let spec = entry.into_spec(&seen)?;
        seen.insert(spec.name.clone());
        specs.push(spec);
    }
    Ok(specs)
}

impl CheckEntry {
    fn invalid(&self, reason: impl Into<String>) -> PlanError {
        PlanError::Invalid {
            check: self.name.clone(),
            reason: reason.into(),
        }
    }

    /// Validate against the names of earlier checks and build the [`CheckSpec`].
    fn into_spec(self, earlier: &HashSet<String>) -> Result<CheckSpec, PlanError> {
        if self.name.trim().is_empty() {
            return Err(self.invalid("name must not be empty"));
        }
        if earlier.contains(&self.name) {
            return Err(self.invalid("name is already used by an earlier check"));
        }

        let base = self.base_query()?;
        let bindings = self
            .bind
            .iter()
            .map(|bind| {
                parse_source(&bind.from)
                    .map(|source| Binding {
                        field: bind.field.clone(),
                        source,
                    })
                    .ok_or_else(|| {
                        self.invalid(format!(
                            "bind source '{}' must be '{SUBJECT_SOURCE}' or '<check>.<field>'",
                            bind.from
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let bound_upstream = bindings.iter().find_map(|b| match &b.source {
            BindSource::Upstream { check, .. } => Some(check.clone()),
            BindSource::Subject => None,
        });
        let unknown_bind = bindings.iter().find_map(|b| match &b.source {
            BindSource::Upstream { check, .. } if !earlier.contains(check) => Some(check),
            _ => None,
        });
        if let Some(check) = unknown_bind {
            return Err(self.invalid(format!("binds to unknown check '{check}'")));
        }

        let depends_on = self.depends_on.clone().or(bound_upstream);
        if let Some(upstream) = depends_on.as_ref().filter(|u| !earlier.contains(*u)) {
            return Err(self.invalid(format!("depends on unknown check '{upstream}'")));
        }

        let mut spec = if bindings.is_empty() {
            CheckSpec::new(self.name, base)
        } else {
            CheckSpec::derived(self.name, move |report, session| {
                bind_query(&base, &bindings, report, session)
            })
        };
        spec = spec
            .scope(if self.elevated {
                Scope::Elevated
            } else {
                Scope::User
            })
            .expect_empty(self.expect_empty);
        if let Some(upstream) = depends_on {
            spec = spec.depends_on(upstream);
        }
        Ok(spec)
    }

    fn base_query(&self) -> Result<QueryDescriptor, PlanError> {
        let mut query = match (&self.table, &self.rpc) {
            (Some(table), None) => {
                if !self.args.is_empty() {
                    return Err(self.invalid("'args' is only valid for rpc checks"));
                }
                QueryDescriptor::table(table)
            }
            (None, Some(rpc)) => {
                if !self.filter.is_empty() || !self.order.is_empty() {
                    return Err(self.invalid("'filter' and 'order' are only valid for table checks"));
                }
                QueryDescriptor::procedure(rpc, self.args.clone())
            }
            _ => return Err(self.invalid("exactly one of 'table' or 'rpc' is required")),
        };

        if let Some(select) = &self.select {
            query = query.select(select);
        }
        for filter in &self.filter {
            query = query.filter(&filter.field, filter.op, filter.value.clone());
        }
        for order in &self.order {
            let (field, direction) = parse_order(order);
            query = query.order_by(field, direction);
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }
        Ok(query)
    }
}

fn parse_source(from: &str) -> Option<BindSource> {
    if from == SUBJECT_SOURCE {
        return Some(BindSource::Subject);
    }
    let (check, field) = from.split_once('.')?;
    if check.is_empty() || field.is_empty() || check == "session" {
        return None;
    }
    Some(BindSource::Upstream {
        check: check.to_string(),
        field: field.to_string(),
    })
}

fn parse_order(order: &str) -> (&str, Direction) {
    match order.rsplit_once('.') {
        Some((field, "desc")) => (field, Direction::Desc),
        Some((field, "asc")) => (field, Direction::Asc),
        _ => (order, Direction::Asc),
    }
}

fn bind_query(
    base: &QueryDescriptor,
    bindings: &[Binding],
    report: &Report,
    session: &Session,
) -> Result<QueryDescriptor, String> {
    let mut query = base.clone();
    for binding in bindings {
        let value = match &binding.source {
            // Elevated sessions carry no subject; fall back to the sign-in entry.
            BindSource::Subject => session
                .subject_id()
                .map(|s| Value::String(s.to_string()))
                .map_or_else(|| upstream_field(report, AUTHENTICATE, "subject_id"), Ok)?,
            BindSource::Upstream { check, field } => upstream_field(report, check, field)?,
        };
        if query.is_procedure() {
            if let Target::Procedure { args, .. } = &mut query.target {
                args.insert(binding.field.clone(), value);
            }
        } else {
            query = query.eq(&binding.field, value);
        }
    }
    Ok(query)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use ward_core::{AuthGrant, Outcome, ReportEntry};

    use super::*;
    use crate::runner::QuerySource;

    fn user() -> Session {
        Session::user(AuthGrant {
            subject_id: "user-1".into(),
            access_token: "t".into(),
            expires_at: None,
        })
    }

    fn static_query(spec: &CheckSpec) -> String {
        match &spec.query {
            QuerySource::Static(query) => query.to_string(),
            QuerySource::Derived(_) => panic!("expected static query for {}", spec.name),
        }
    }

    fn derived_query(spec: &CheckSpec, report: &Report, session: &Session) -> Result<String, String> {
        match &spec.query {
            QuerySource::Derived(derive) => derive(report, session).map(|q| q.to_string()),
            QuerySource::Static(_) => panic!("expected derived query for {}", spec.name),
        }
    }

    fn invalid_reason(text: &str) -> String {
        match parse_plan(text) {
            Err(PlanError::Invalid { reason, .. }) => reason,
            other => panic!("expected invalid plan, got {other:?}"),
        }
    }

    #[test]
    fn parses_static_table_check() {
        let specs = parse_plan(
            r#"
            [[check]]
            name = "recent invites"
            table = "invites"
            select = "id,email"
            order = ["created_at.desc"]
            limit = 5
            expect_empty = true

              [[check.filter]]
              field = "expires_at"
              op = "gt"
              value = "2025-01-01"
            "#,
        )
        .unwrap();

        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].scope, Scope::User);
        assert!(specs[0].expect_empty);
        assert_eq!(
            static_query(&specs[0]),
            "invites?select=id,email&expires_at=gt.2025-01-01&order=created_at.desc&limit=5"
        );
    }

    #[test]
    fn parses_elevated_rpc_check() {
        let specs = parse_plan(
            r#"
            [[check]]
            name = "policies"
            rpc = "list_policies"
            args = { table_name = "profiles" }
            elevated = true
            "#,
        )
        .unwrap();

        assert_eq!(specs[0].scope, Scope::Elevated);
        match &specs[0].query {
            QuerySource::Static(query) => {
                assert!(query.is_procedure());
                assert_eq!(query.target, Target::Procedure {
                    name: "list_policies".into(),
                    args: json!({"table_name": "profiles"}).as_object().cloned().unwrap(),
                });
            }
            QuerySource::Derived(_) => panic!("expected static query"),
        }
    }

    #[test]
    fn subject_bind_uses_session() {
        let specs = parse_plan(
            r#"
            [[check]]
            name = "profile"
            table = "profiles"
            limit = 1
            bind = [{ field = "id", from = "session.subject_id" }]
            "#,
        )
        .unwrap();

        assert!(specs[0].depends_on.is_none());
        assert_eq!(
            derived_query(&specs[0], &Report::new(), &user()).unwrap(),
            "profiles?id=eq.user-1&limit=1"
        );
    }

    #[test]
    fn subject_bind_on_elevated_check_reads_authenticate_entry() {
        let specs = parse_plan(
            r#"
            [[check]]
            name = "profile_ground_truth"
            table = "profiles"
            elevated = true
            bind = [{ field = "id", from = "session.subject_id" }]
            "#,
        )
        .unwrap();

        let mut report = Report::new();
        report.record(ReportEntry::new(
            AUTHENTICATE,
            Outcome::Success(vec![json!({"subject_id": "user-1"}).as_object().cloned().unwrap()]),
        ));
        assert_eq!(
            derived_query(&specs[0], &report, &Session::elevated("service")).unwrap(),
            "profiles?id=eq.user-1"
        );
    }

    #[test]
    fn upstream_bind_implies_dependency() {
        let specs = parse_plan(
            r#"
            [[check]]
            name = "profile"
            table = "profiles"

            [[check]]
            name = "organization"
            table = "organizations"
            bind = [{ field = "id", from = "profile.organization_id" }]

            [[check]]
            name = "members"
            rpc = "organization_members"
            bind = [{ field = "org", from = "profile.organization_id" }]
            "#,
        )
        .unwrap();

        assert_eq!(specs[1].depends_on.as_deref(), Some("profile"));

        let mut report = Report::new();
        report.record(ReportEntry::new(
            "profile",
            Outcome::Success(vec![json!({"organization_id": 42}).as_object().cloned().unwrap()]),
        ));
        assert_eq!(
            derived_query(&specs[1], &report, &user()).unwrap(),
            "organizations?id=eq.42"
        );

        match &specs[2].query {
            QuerySource::Derived(derive) => {
                let query = derive(&report, &user()).unwrap();
                assert_eq!(query.target, Target::Procedure {
                    name: "organization_members".into(),
                    args: json!({"org": 42}).as_object().cloned().unwrap(),
                });
            }
            QuerySource::Static(_) => panic!("expected derived query"),
        }
    }

    #[test]
    fn rejects_structural_mistakes() {
        assert!(
            invalid_reason("[[check]]\nname = \"x\"\n").contains("exactly one of 'table' or 'rpc'")
        );
        assert!(
            invalid_reason("[[check]]\nname = \"x\"\ntable = \"a\"\nrpc = \"b\"\n")
                .contains("exactly one")
        );
        assert!(
            invalid_reason("[[check]]\nname = \"x\"\ntable = \"a\"\nargs = { a = 1 }\n")
                .contains("only valid for rpc")
        );
        assert!(
            invalid_reason("[[check]]\nname = \"x\"\nrpc = \"f\"\norder = [\"id\"]\n")
                .contains("only valid for table")
        );
    }

    #[test]
    fn rejects_unknown_references_and_duplicates() {
        assert!(
            invalid_reason("[[check]]\nname = \"x\"\ntable = \"a\"\ndepends_on = \"later\"\n")
                .contains("unknown check 'later'")
        );
        assert!(
            invalid_reason(
                "[[check]]\nname = \"x\"\ntable = \"a\"\nbind = [{ field = \"id\", from = \"y.id\" }]\n"
            )
            .contains("unknown check 'y'")
        );
        assert!(
            invalid_reason(
                "[[check]]\nname = \"x\"\ntable = \"a\"\nbind = [{ field = \"id\", from = \"nodot\" }]\n"
            )
            .contains("bind source")
        );
        assert!(
            invalid_reason("[[check]]\nname = \"x\"\ntable = \"a\"\n\n[[check]]\nname = \"x\"\ntable = \"b\"\n")
                .contains("already used")
        );
        assert!(
            invalid_reason("[[check]]\nname = \"authenticate\"\ntable = \"a\"\n").contains("already used")
        );
    }

    #[test]
    fn depends_on_authenticate_is_allowed() {
        let specs = parse_plan(
            "[[check]]\nname = \"x\"\ntable = \"a\"\ndepends_on = \"authenticate\"\n",
        )
        .unwrap();
        assert_eq!(specs[0].depends_on.as_deref(), Some(AUTHENTICATE));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse_plan("[[check]]\nname = \"x\"\ntable = \"a\"\nlimt = 1\n").unwrap_err();
        assert!(matches!(err, PlanError::Toml(_)));
    }

    #[test]
    fn order_parsing() {
        assert_eq!(parse_order("created_at.desc"), ("created_at", Direction::Desc));
        assert_eq!(parse_order("name.asc"), ("name", Direction::Asc));
        assert_eq!(parse_order("name"), ("name", Direction::Asc));
        assert_eq!(parse_order("meta.version"), ("meta.version", Direction::Asc));
    }

    #[test]
    fn load_plan_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.toml");
        std::fs::write(&path, "[[check]]\nname = \"profiles\"\ntable = \"profiles\"\n").unwrap();

        let specs = load_plan(&path).unwrap();
        assert_eq!(specs[0].name, "profiles");

        let missing = load_plan(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, PlanError::Io { .. }));
    }
}
