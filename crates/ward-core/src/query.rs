//! Query descriptors: what a check asks the backend for.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The collection or remote procedure a query targets.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// A table or view.
    Table(String),
    /// A remote procedure called with named JSON arguments.
    Procedure {
        name: String,
        args: serde_json::Map<String, Value>,
    },
}

impl Target {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Table(name) | Self::Procedure { name, .. } => name,
        }
    }
}

/// Comparison used by a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    Is,
}

impl FilterOp {
    /// Operator token in the REST query string (`field=eq.value`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Like => "like",
            Self::Is => "is",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An equality or range predicate on a named field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    /// Render the value as it appears after the operator.
    ///
    /// Strings are used unquoted; `null` and booleans use their literal.
    #[must_use]
    pub fn value_text(&self) -> String {
        match &self.value {
            Value::String(text) => text.clone(),
            Value::Null => "null".to_string(),
            Value::Bool(flag) => flag.to_string(),
            Value::Number(number) => number.to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub field: String,
    pub direction: Direction,
}

/// Target, filter, projection, ordering and limit of one backend query.
///
/// ```
/// use ward_core::{Direction, QueryDescriptor};
///
/// let query = QueryDescriptor::table("profiles")
///     .select("id,role,organization_id")
///     .eq("id", "4f6c")
///     .order_by("created_at", Direction::Desc)
///     .limit(1);
/// assert_eq!(query.to_string(), "profiles?select=id,role,organization_id&id=eq.4f6c&order=created_at.desc&limit=1");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    pub target: Target,
    pub select: Option<String>,
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<u32>,
}

impl QueryDescriptor {
    #[must_use]
    pub fn table(name: impl Into<String>) -> Self {
        Self::new(Target::Table(name.into()))
    }

    #[must_use]
    pub fn procedure(name: impl Into<String>, args: serde_json::Map<String, Value>) -> Self {
        Self::new(Target::Procedure {
            name: name.into(),
            args,
        })
    }

    const fn new(target: Target) -> Self {
        Self {
            target,
            select: None,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    #[must_use]
    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.select = Some(columns.into());
        self
    }

    #[must_use]
    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Eq, value)
    }

    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order.push(Order {
            field: field.into(),
            direction,
        });
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn is_procedure(&self) -> bool {
        matches!(self.target, Target::Procedure { .. })
    }
}

/// Compact form used in logs: `table?field=op.value&order=..&limit=n`.
impl fmt::Display for QueryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Target::Table(name) => write!(f, "{name}")?,
            Target::Procedure { name, .. } => write!(f, "rpc/{name}")?,
        }

        let mut params = Vec::new();
        if let Some(select) = &self.select {
            params.push(format!("select={select}"));
        }
        for filter in &self.filters {
            params.push(format!("{}={}.{}", filter.field, filter.op, filter.value_text()));
        }
        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|o| format!("{}.{}", o.field, o.direction.as_str()))
                .collect::<Vec<_>>()
                .join(",");
            params.push(format!("order={order}"));
        }
        if let Some(limit) = self.limit {
            params.push(format!("limit={limit}"));
        }

        if !params.is_empty() {
            write!(f, "?{}", params.join("&"))?;
        }
        Ok(())
    }
}
