use ward_config::WardenConfig;
use ward_core::Report;
use ward_harness::{Credentials, RunPlan};

use crate::bootstrap;
use crate::cli::CredentialArgs;

/// Resolve user credentials: flags win over the `demo` config section.
///
/// Returns `None` only when neither an identifier nor a secret is available;
/// a half-filled pair is passed on so the sign-in records it as rejected.
pub fn credentials(args: &CredentialArgs, config: &WardenConfig) -> Option<Credentials> {
    let identifier = args
        .email
        .clone()
        .unwrap_or_else(|| config.demo.email.clone());
    let secret = args
        .password
        .clone()
        .unwrap_or_else(|| config.demo.password.clone());

    if identifier.trim().is_empty() && secret.is_empty() {
        return None;
    }
    Some(Credentials::new(identifier, secret))
}

/// Like [`credentials`], for commands that cannot run without a user.
pub fn require_credentials(
    args: &CredentialArgs,
    config: &WardenConfig,
) -> anyhow::Result<Credentials> {
    credentials(args, config).ok_or_else(|| {
        anyhow::anyhow!(
            "no user credentials; pass --email/--password or set WARDEN_DEMO__EMAIL and WARDEN_DEMO__PASSWORD"
        )
    })
}

/// The configured service credential, if any.
pub fn service_credential(config: &WardenConfig) -> Option<String> {
    config
        .backend
        .has_service_role()
        .then(|| config.backend.service_role_key.clone())
}

/// Run `plan` against the configured backend.
pub async fn execute(config: &WardenConfig, plan: &RunPlan) -> anyhow::Result<Report> {
    let backend = bootstrap::backend(config)?;
    tracing::debug!(
        checks = plan.checks.len(),
        user = plan.credentials.is_some(),
        elevated = plan.needs_elevated(),
        "starting verification run"
    );
    let report = ward_harness::verify(backend, plan).await?;
    tracing::info!(verdict = %report.verdict(), entries = report.len(), "verification finished");
    Ok(report)
}

pub fn exit_code(report: &Report) -> i32 {
    i32::from(report.verdict().exit_code())
}
