use serde::Serialize;
use ward_core::{OutcomeKind, RenderedEntry, RenderedReport};

use crate::cli::OutputFormat;
use crate::ui;

pub mod table;

/// Render a command response.
///
/// `json` and `raw` serialize `value` as-is; `table` lays out the report
/// entries followed by `notes` and the verdict.
pub fn render<T: Serialize>(
    value: &T,
    report: &RenderedReport,
    notes: &[(&str, String)],
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Raw => Ok(serde_json::to_string(value)?),
        OutputFormat::Table => {
            let prefs = ui::prefs();
            let options = table::TableOptions {
                max_width: prefs.term_width,
                color: prefs.table_color,
            };
            Ok(render_report_table(report, notes, options))
        }
    }
}

/// Print a command response to stdout.
pub fn output<T: Serialize>(
    value: &T,
    report: &RenderedReport,
    notes: &[(&str, String)],
    format: OutputFormat,
) -> anyhow::Result<()> {
    let rendered = render(value, report, notes, format)?;
    println!("{rendered}");
    Ok(())
}

fn render_report_table(
    report: &RenderedReport,
    notes: &[(&str, String)],
    options: table::TableOptions,
) -> String {
    let headers = ["check", "scope", "outcome", "rows", "detail"];
    let rows = report.entries.iter().map(entry_cells).collect::<Vec<_>>();

    let mut out = if rows.is_empty() {
        String::from("(no checks)")
    } else {
        table::render_table(&headers, &rows, options)
    };
    out.push('\n');
    for (key, value) in notes {
        out.push_str(&format!("\n{key}: {value}"));
    }
    out.push_str(&format!("\nverdict: {}", report.verdict.as_str()));
    out
}

fn entry_cells(entry: &RenderedEntry) -> Vec<String> {
    let scope = if entry.elevated { "elevated" } else { "user" };
    let rows = entry
        .row_count
        .map_or_else(|| String::from("-"), |count| count.to_string());
    let detail = match (&entry.error, &entry.reason) {
        (Some(error), _) if entry.outcome == OutcomeKind::Failure => error.to_string(),
        (_, Some(reason)) => reason.clone(),
        _ if entry.outcome == OutcomeKind::Empty && entry.expect_empty => {
            String::from("empty as expected")
        }
        (Some(error), _) => error.to_string(),
        _ => String::new(),
    };
    vec![
        entry.check.clone(),
        scope.to_string(),
        entry.outcome.as_str().to_string(),
        rows,
        detail,
    ]
}
