use ward_config::WardenConfig;
use ward_harness::RunPlan;
use ward_harness::checks::account_checks;

use crate::cli::{CredentialArgs, GlobalFlags};
use crate::commands::shared;
use crate::output::output;

/// Handle `ward profile`: the signed-in user's profile and organization rows.
pub async fn handle(
    args: &CredentialArgs,
    flags: &GlobalFlags,
    config: &WardenConfig,
) -> anyhow::Result<i32> {
    let plan = RunPlan {
        credentials: Some(shared::require_credentials(args, config)?),
        service_credential: None,
        checks: account_checks(&config.checks),
    };

    let report = shared::execute(config, &plan).await?;
    let rendered = report.render();
    output(&rendered, &rendered, &[], flags.format)?;
    Ok(shared::exit_code(&report))
}
