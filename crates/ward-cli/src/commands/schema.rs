use ward_core::RenderedReport;

use crate::cli::GlobalFlags;

/// Handle `ward schema`: print the JSON Schema of the rendered report.
pub fn handle(_flags: &GlobalFlags) -> anyhow::Result<()> {
    println!("{}", report_schema()?);
    Ok(())
}

fn report_schema() -> anyhow::Result<String> {
    let schema = schemars::schema_for!(RenderedReport);
    Ok(serde_json::to_string_pretty(&schema)?)
}
