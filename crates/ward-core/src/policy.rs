//! Row-level-security policy descriptors returned by policy introspection.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::outcome::Row;

/// The SQL command a policy applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    All,
    Select,
    Insert,
    Update,
    Delete,
}

impl CommandKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts both the `pg_policies.cmd` spelling (`SELECT`) and the
/// single-letter `pg_policy.polcmd` code (`r`, `a`, `w`, `d`, `*`).
impl FromStr for CommandKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALL" | "*" => Ok(Self::All),
            "SELECT" | "R" => Ok(Self::Select),
            "INSERT" | "A" => Ok(Self::Insert),
            "UPDATE" | "W" => Ok(Self::Update),
            "DELETE" | "D" => Ok(Self::Delete),
            other => Err(CoreError::MalformedRow {
                field: "cmd".into(),
                reason: format!("has unknown command '{other}'"),
            }),
        }
    }
}

/// One policy attached to a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PolicyDescriptor {
    pub name: String,
    pub applies_to: CommandKind,
    pub using_expression: Option<String>,
    pub with_check_expression: Option<String>,
}

impl PolicyDescriptor {
    /// Parse a policy row.
    ///
    /// Column names from `pg_policies` (`policyname`, `cmd`, `qual`,
    /// `with_check`) and the descriptor's own field names are both accepted,
    /// so a procedure may return either shape.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MalformedRow`] if the name or command is missing,
    /// empty, or not a string.
    pub fn from_row(row: &Row) -> Result<Self, CoreError> {
        let name = required_text(row, &["policyname", "name"])?;
        let applies_to = required_text(row, &["cmd", "applies_to"])?.parse()?;
        Ok(Self {
            name,
            applies_to,
            using_expression: optional_text(row, &["qual", "using_expression"]),
            with_check_expression: optional_text(row, &["with_check", "with_check_expression"]),
        })
    }

    /// Parse every row, failing on the first malformed one.
    ///
    /// # Errors
    ///
    /// Returns the first [`CoreError::MalformedRow`] encountered.
    pub fn from_rows(rows: &[Row]) -> Result<Vec<Self>, CoreError> {
        rows.iter().map(Self::from_row).collect()
    }
}

fn required_text(row: &Row, keys: &[&str]) -> Result<String, CoreError> {
    let Some((key, value)) = keys
        .iter()
        .find_map(|key| row.get(*key).map(|value| (*key, value)))
    else {
        return Err(CoreError::MalformedRow {
            field: keys[0].to_string(),
            reason: "is missing".into(),
        });
    };

    match value.as_str() {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        Some(_) => Err(CoreError::MalformedRow {
            field: key.to_string(),
            reason: "is empty".into(),
        }),
        None => Err(CoreError::MalformedRow {
            field: key.to_string(),
            reason: "is not a string".into(),
        }),
    }
}

fn optional_text(row: &Row, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| row.get(*key))
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn row(value: serde_json::Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn parses_pg_policies_shape() {
        let policy = PolicyDescriptor::from_row(&row(json!({
            "policyname": "Users can view own profile",
            "cmd": "SELECT",
            "qual": "(auth.uid() = id)",
            "with_check": null
        })))
        .unwrap();

        assert_eq!(policy.name, "Users can view own profile");
        assert_eq!(policy.applies_to, CommandKind::Select);
        assert_eq!(policy.using_expression.as_deref(), Some("(auth.uid() = id)"));
        assert!(policy.with_check_expression.is_none());
    }

    #[test]
    fn parses_descriptor_shape() {
        let policy = PolicyDescriptor::from_row(&row(json!({
            "name": "members insert",
            "applies_to": "insert",
            "with_check_expression": "(organization_id = current_org())"
        })))
        .unwrap();

        assert_eq!(policy.applies_to, CommandKind::Insert);
        assert!(policy.using_expression.is_none());
    }

    #[test]
    fn polcmd_letters_map_to_commands() {
        assert_eq!("r".parse::<CommandKind>().unwrap(), CommandKind::Select);
        assert_eq!("a".parse::<CommandKind>().unwrap(), CommandKind::Insert);
        assert_eq!("w".parse::<CommandKind>().unwrap(), CommandKind::Update);
        assert_eq!("d".parse::<CommandKind>().unwrap(), CommandKind::Delete);
        assert_eq!("*".parse::<CommandKind>().unwrap(), CommandKind::All);
    }

    #[test]
    fn missing_name_is_malformed() {
        let err = PolicyDescriptor::from_row(&row(json!({"cmd": "ALL"}))).unwrap_err();
        assert_eq!(
            err,
            CoreError::MalformedRow {
                field: "policyname".into(),
                reason: "is missing".into()
            }
        );
    }

    #[test]
    fn empty_name_is_malformed() {
        let err =
            PolicyDescriptor::from_row(&row(json!({"policyname": "  ", "cmd": "ALL"}))).unwrap_err();
        assert!(err.to_string().contains("is empty"));
    }

    #[test]
    fn unknown_command_is_malformed() {
        let err = PolicyDescriptor::from_row(&row(json!({"policyname": "p", "cmd": "TRUNCATE"})))
            .unwrap_err();
        assert!(err.to_string().contains("TRUNCATE"));
    }
}
