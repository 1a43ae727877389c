use serde::Serialize;
use ward_config::WardenConfig;
use ward_core::RenderedReport;
use ward_harness::RunPlan;

use crate::cli::{CredentialArgs, GlobalFlags};
use crate::commands::shared;
use crate::output::output;

#[derive(Serialize)]
struct AuthResponse {
    identifier: String,
    #[serde(flatten)]
    report: RenderedReport,
}

/// Handle `ward auth`: sign in, record the session, sign out.
pub async fn handle(
    args: &CredentialArgs,
    flags: &GlobalFlags,
    config: &WardenConfig,
) -> anyhow::Result<i32> {
    let credentials = shared::require_credentials(args, config)?;
    let identifier = credentials.identifier.clone();
    let plan = RunPlan {
        credentials: Some(credentials),
        ..RunPlan::default()
    };

    let report = shared::execute(config, &plan).await?;
    let response = AuthResponse {
        identifier: identifier.clone(),
        report: report.render(),
    };
    output(
        &response,
        &response.report,
        &[("identifier", identifier)],
        flags.format,
    )?;
    Ok(shared::exit_code(&report))
}
