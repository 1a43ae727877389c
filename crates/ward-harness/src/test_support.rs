//! Scripted backend used by harness tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use ward_core::{
    AuthGrant, Backend, ErrorDetail, ErrorKind, FilterOp, QueryDescriptor, Row, Session,
    SessionKind,
};

type Scripted = Result<Vec<Row>, ErrorDetail>;

/// In-memory backend. Users and a service key are registered up front;
/// query results are scripted per target and session kind, and equality
/// filters are applied to scripted rows.
#[derive(Default)]
pub struct MockBackend {
    users: Vec<(String, String, String)>,
    service_key: Option<String>,
    responses: HashMap<(String, SessionKind), Scripted>,
    fail_sign_out: bool,
    sign_in_calls: AtomicUsize,
    sign_out_calls: AtomicUsize,
    queries: Mutex<Vec<(SessionKind, String)>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, email: &str, password: &str, subject_id: &str) -> Self {
        self.users
            .push((email.into(), password.into(), subject_id.into()));
        self
    }

    pub fn with_service_key(mut self, key: &str) -> Self {
        self.service_key = Some(key.into());
        self
    }

    /// Script rows for `target` as seen by both user and elevated sessions.
    pub fn with_rows(self, target: &str, rows: Vec<Value>) -> Self {
        self.with_rows_for(SessionKind::User, target, rows.clone())
            .with_rows_for(SessionKind::Elevated, target, rows)
    }

    pub fn with_rows_for(mut self, kind: SessionKind, target: &str, rows: Vec<Value>) -> Self {
        let rows = rows
            .into_iter()
            .map(|v| match v {
                Value::Object(map) => map,
                other => panic!("scripted row must be an object, got {other}"),
            })
            .collect();
        self.responses.insert((target.into(), kind), Ok(rows));
        self
    }

    pub fn with_error(mut self, target: &str, detail: ErrorDetail) -> Self {
        self.responses
            .insert((target.into(), SessionKind::User), Err(detail.clone()));
        self.responses
            .insert((target.into(), SessionKind::Elevated), Err(detail));
        self
    }

    pub fn failing_sign_out(mut self) -> Self {
        self.fail_sign_out = true;
        self
    }

    pub fn sign_in_calls(&self) -> usize {
        self.sign_in_calls.load(Ordering::SeqCst)
    }

    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }

    /// Every query issued, as `(session kind, descriptor)`.
    pub fn queries(&self) -> Vec<(SessionKind, String)> {
        self.queries.lock().unwrap().clone()
    }
}

pub fn denied() -> ErrorDetail {
    ErrorDetail::new(
        ErrorKind::AccessDenied,
        "42501",
        "permission denied for table profiles",
    )
    .with_status(403)
}

fn matches_filters(row: &Row, query: &QueryDescriptor) -> bool {
    query.filters.iter().all(|filter| {
        filter.op != FilterOp::Eq
            || row.get(&filter.field).is_some_and(|value| {
                let text = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                text == filter.value_text()
            })
    })
}

#[async_trait]
impl Backend for MockBackend {
    async fn sign_in(&self, identifier: &str, secret: &str) -> Result<AuthGrant, ErrorDetail> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        self.users
            .iter()
            .find(|(email, password, _)| email == identifier && password == secret)
            .map(|(_, _, subject)| AuthGrant {
                subject_id: subject.clone(),
                access_token: format!("token-{subject}"),
                expires_at: None,
            })
            .ok_or_else(|| {
                ErrorDetail::new(
                    ErrorKind::Authentication,
                    "invalid_credentials",
                    "Invalid login credentials",
                )
                .with_status(400)
            })
    }

    async fn verify_elevated(&self, credential: &str) -> Result<(), ErrorDetail> {
        if self.service_key.as_deref() == Some(credential) {
            Ok(())
        } else {
            Err(
                ErrorDetail::new(ErrorKind::Authentication, "not_admin", "User not allowed")
                    .with_status(401),
            )
        }
    }

    async fn query(
        &self,
        session: &Session,
        query: &QueryDescriptor,
    ) -> Result<Vec<Row>, ErrorDetail> {
        if session.token().is_none() {
            return Err(ErrorDetail::new(
                ErrorKind::Authentication,
                "no_session",
                "session holds no credential",
            ));
        }
        self.queries
            .lock()
            .unwrap()
            .push((session.kind(), query.to_string()));

        match self
            .responses
            .get(&(query.target.name().to_string(), session.kind()))
        {
            Some(Ok(rows)) => Ok(rows
                .iter()
                .filter(|row| matches_filters(row, query))
                .take(query.limit.map_or(usize::MAX, |l| l as usize))
                .cloned()
                .collect()),
            Some(Err(detail)) => Err(detail.clone()),
            None => Err(ErrorDetail::new(
                ErrorKind::Query,
                "PGRST205",
                format!(
                    "Could not find the table 'public.{}' in the schema cache",
                    query.target.name()
                ),
            )
            .with_status(404)),
        }
    }

    async fn sign_out(&self, _token: &str) -> Result<(), ErrorDetail> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sign_out {
            Err(ErrorDetail::transport("connection reset"))
        } else {
            Ok(())
        }
    }
}
