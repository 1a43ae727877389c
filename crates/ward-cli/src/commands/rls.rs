use serde::Serialize;
use ward_config::WardenConfig;
use ward_core::RenderedReport;
use ward_harness::RunPlan;
use ward_harness::checks::{
    Visibility, diagnose_visibility, ground_truth_name, rls_checks, visible_rows_name,
};

use crate::cli::{GlobalFlags, RlsArgs};
use crate::commands::shared;
use crate::output::output;

#[derive(Serialize)]
struct RlsResponse {
    table: String,
    visibility: Visibility,
    diagnosis: String,
    #[serde(flatten)]
    report: RenderedReport,
}

/// Handle `ward rls <table>`.
///
/// Runs the RLS status and policy listing with the elevated session, then
/// compares what the elevated session and the user session can see.
pub async fn handle(
    args: &RlsArgs,
    flags: &GlobalFlags,
    config: &WardenConfig,
) -> anyhow::Result<i32> {
    let table = args.table.trim();
    if table.is_empty() {
        anyhow::bail!("table name must not be empty");
    }

    let credentials = if args.elevated_only {
        None
    } else {
        Some(shared::require_credentials(&args.credentials, config)?)
    };
    let plan = RunPlan {
        credentials,
        service_credential: shared::service_credential(config),
        checks: rls_checks(&config.checks, table),
    };

    let report = shared::execute(config, &plan).await?;
    let visibility = diagnose_visibility(&report, &ground_truth_name(table), &visible_rows_name(table));
    tracing::info!(table, visibility = visibility.as_str(), "rls diagnosis");

    let response = RlsResponse {
        table: table.to_string(),
        visibility,
        diagnosis: visibility.describe().to_string(),
        report: report.render(),
    };
    output(
        &response,
        &response.report,
        &[
            ("table", response.table.clone()),
            ("visibility", visibility.as_str().to_string()),
            ("diagnosis", response.diagnosis.clone()),
        ],
        flags.format,
    )?;
    Ok(shared::exit_code(&report))
}
