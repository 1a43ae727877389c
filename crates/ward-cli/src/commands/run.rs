use anyhow::Context;
use ward_config::WardenConfig;
use ward_harness::{RunPlan, load_plan};

use crate::cli::{GlobalFlags, RunArgs};
use crate::commands::shared;
use crate::output::output;

/// Handle `ward run <plan>`.
pub async fn handle(args: &RunArgs, flags: &GlobalFlags, config: &WardenConfig) -> anyhow::Result<i32> {
    let checks = load_plan(&args.plan)
        .with_context(|| format!("failed to load plan {}", args.plan.display()))?;

    let credentials = if args.anonymous {
        None
    } else {
        shared::credentials(&args.credentials, config)
    };
    if credentials.is_none() {
        tracing::warn!("no user credentials; user-scoped checks will not run");
    }

    let plan = RunPlan {
        credentials,
        service_credential: shared::service_credential(config),
        checks,
    };

    let report = shared::execute(config, &plan).await?;
    let rendered = report.render();
    output(
        &rendered,
        &rendered,
        &[("plan", args.plan.display().to_string())],
        flags.format,
    )?;
    Ok(shared::exit_code(&report))
}
