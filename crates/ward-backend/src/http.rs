//! Shared HTTP response helpers.
//!
//! Centralizes status-code checks and error-body parsing so the auth and
//! REST modules stay focused on request construction and response mapping.
//! Both the auth service and the REST layer answer errors with JSON, but
//! with different field names:
//!
//! - auth: `{"code": 400, "error_code": "invalid_credentials", "msg": "..."}`
//!   or the older `{"error": "invalid_grant", "error_description": "..."}`
//! - REST: `{"code": "42501", "message": "...", "details": null, "hint": null}`

use serde::Deserialize;
use serde_json::Value;

use crate::error::BackendError;

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Return the response unchanged on success, otherwise a
/// [`BackendError::Api`] carrying the body's code and message.
pub async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(api_error(status.as_u16(), &body))
}

/// Build an API error from a status and raw body.
pub(crate) fn api_error(status: u16, body: &str) -> BackendError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

    let code = parsed
        .error_code
        .filter(|c| !c.is_empty())
        .or_else(|| match parsed.code {
            Some(Value::String(code)) if !code.is_empty() => Some(code),
            _ => None,
        })
        .or(parsed.error)
        .unwrap_or_else(|| format!("http_{status}"));

    let message = parsed
        .msg
        .or(parsed.message)
        .or(parsed.error_description)
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("HTTP {status} with empty body")
            } else {
                trimmed.to_string()
            }
        });

    BackendError::Api {
        status,
        code,
        message,
    }
}
