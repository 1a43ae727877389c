//! REST layer: table queries and remote procedure calls.

use serde_json::Value;
use ward_core::{QueryDescriptor, Row, Target};

use crate::HttpBackend;
use crate::error::BackendError;
use crate::http::check_response;

/// Credential headers for one REST request.
pub(crate) struct RestAuth<'a> {
    /// Value of the `apikey` header.
    pub apikey: &'a str,
    /// Value of the `Authorization: Bearer` header.
    pub bearer: &'a str,
}

impl HttpBackend {
    /// Build the full request URL for `query`.
    #[must_use]
    pub fn rest_url(&self, query: &QueryDescriptor) -> String {
        let path = match &query.target {
            Target::Table(name) => format!("{}/rest/v1/{}", self.base_url, urlencoding::encode(name)),
            Target::Procedure { name, .. } => {
                format!("{}/rest/v1/rpc/{}", self.base_url, urlencoding::encode(name))
            }
        };

        let params = query_params(query);
        if params.is_empty() {
            path
        } else {
            format!("{path}?{}", params.join("&"))
        }
    }

    /// Execute `query` and normalize the response into rows.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] on transport failure, a non-success status,
    /// or a body that is not JSON.
    pub(crate) async fn execute(
        &self,
        auth: RestAuth<'_>,
        query: &QueryDescriptor,
    ) -> Result<Vec<Row>, BackendError> {
        let url = self.rest_url(query);
        tracing::debug!(%url, "querying backend");

        let request = match &query.target {
            Target::Table(_) => self.http.get(&url),
            Target::Procedure { args, .. } => self.http.post(&url).json(args),
        };
        let resp = request
            .header("apikey", auth.apikey)
            .bearer_auth(auth.bearer)
            .send()
            .await?;
        let body = check_response(resp).await?.text().await?;

        let value: Value = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&body)
                .map_err(|e| BackendError::Parse(format!("response from {}: {e}", query.target.name())))?
        };
        Ok(into_rows(value, query.target.name()))
    }
}

fn query_params(query: &QueryDescriptor) -> Vec<String> {
    let mut params = Vec::new();
    if let Some(select) = &query.select {
        params.push(format!("select={}", urlencoding::encode(select)));
    }
    for filter in &query.filters {
        params.push(format!(
            "{}={}.{}",
            urlencoding::encode(&filter.field),
            filter.op,
            urlencoding::encode(&filter.value_text())
        ));
    }
    if !query.order.is_empty() {
        let order = query
            .order
            .iter()
            .map(|o| format!("{}.{}", o.field, o.direction.as_str()))
            .collect::<Vec<_>>()
            .join(",");
        params.push(format!("order={}", urlencoding::encode(&order)));
    }
    if let Some(limit) = query.limit {
        params.push(format!("limit={limit}"));
    }
    params
}

/// Normalize a response body into rows.
///
/// Tables always return arrays of objects. Procedures may also return a
/// single object, an array of scalars, or a bare scalar; scalars are wrapped
/// as `{<procedure name>: value}`. `null` is zero rows.
fn into_rows(value: Value, name: &str) -> Vec<Row> {
    let wrap = |value: Value| -> Row {
        match value {
            Value::Object(map) => map,
            scalar => {
                let mut row = Row::new();
                row.insert(name.to_string(), scalar);
                row
            }
        }
    };

    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.into_iter().map(wrap).collect(),
        other => vec![wrap(other)],
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use ward_core::{Direction, FilterOp};

    use super::*;

    fn backend() -> HttpBackend {
        HttpBackend::new("https://abcd1234.supabase.co", "anon", 5).unwrap()
    }

    #[test]
    fn table_url_with_filters_order_and_limit() {
        let query = QueryDescriptor::table("profiles")
            .select("id,role")
            .eq("id", "5b6f0c9e")
            .order_by("created_at", Direction::Desc)
            .limit(1);
        assert_eq!(
            backend().rest_url(&query),
            "https://abcd1234.supabase.co/rest/v1/profiles?select=id%2Crole&id=eq.5b6f0c9e&order=created_at.desc&limit=1"
        );
    }

    #[test]
    fn filter_values_are_encoded() {
        let query = QueryDescriptor::table("profiles").eq("email", "demo+1@example.com");
        assert_eq!(
            backend().rest_url(&query),
            "https://abcd1234.supabase.co/rest/v1/profiles?email=eq.demo%2B1%40example.com"
        );
    }

    #[test]
    fn range_and_null_filters() {
        let query = QueryDescriptor::table("invites")
            .filter("expires_at", FilterOp::Gt, "2025-01-01")
            .filter("accepted_at", FilterOp::Is, Value::Null);
        assert_eq!(
            backend().rest_url(&query),
            "https://abcd1234.supabase.co/rest/v1/invites?expires_at=gt.2025-01-01&accepted_at=is.null"
        );
    }

    #[test]
    fn procedure_url_has_rpc_prefix() {
        let mut args = serde_json::Map::new();
        args.insert("table_name".into(), json!("profiles"));
        let query = QueryDescriptor::procedure("list_policies", args);
        assert_eq!(
            backend().rest_url(&query),
            "https://abcd1234.supabase.co/rest/v1/rpc/list_policies"
        );
    }

    #[test]
    fn array_of_objects_maps_to_rows() {
        let rows = into_rows(json!([{"id": 1}, {"id": 2}]), "profiles");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("id"), Some(&json!(2)));
    }

    #[test]
    fn scalar_procedure_result_is_wrapped() {
        let rows = into_rows(json!(true), "rls_status");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("rls_status"), Some(&json!(true)));
    }

    #[test]
    fn single_object_is_one_row() {
        let rows = into_rows(json!({"enabled": false}), "rls_status");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("enabled"), Some(&json!(false)));
    }

    #[test]
    fn null_and_empty_array_are_zero_rows() {
        assert!(into_rows(Value::Null, "f").is_empty());
        assert!(into_rows(json!([]), "profiles").is_empty());
    }
}
