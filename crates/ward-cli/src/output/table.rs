#[derive(Clone, Copy, Debug)]
pub struct TableOptions {
    pub max_width: Option<usize>,
    pub color: bool,
}

/// Render an aligned table of string rows.
#[must_use]
pub fn render_table(headers: &[&str], rows: &[Vec<String>], options: TableOptions) -> String {
    let mut widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(index, header)| {
            rows.iter()
                .filter_map(|row| row.get(index))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
                .max(header.len())
        })
        .collect();

    fit_widths(&mut widths, headers, options.max_width);

    let header_line = headers
        .iter()
        .zip(widths.iter())
        .map(|(header, width)| pad(&truncate_text(header, *width), *width))
        .collect::<Vec<_>>()
        .join("  ");
    let divider = "-".repeat(header_line.chars().count());

    let row_lines = rows.iter().map(|row| {
        widths
            .iter()
            .enumerate()
            .map(|(index, width)| {
                let value = row.get(index).map_or("-", String::as_str);
                let cell = pad(&truncate_text(value, *width), *width);
                if options.color {
                    colorize_outcome(&cell)
                } else {
                    cell
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    });

    let mut lines = Vec::with_capacity(2 + rows.len());
    lines.push(header_line.trim_end().to_string());
    lines.push(divider);
    lines.extend(row_lines);
    lines.join("\n")
}

/// Shrink the widest columns until the table fits `max_width`.
fn fit_widths(widths: &mut [usize], headers: &[&str], max_width: Option<usize>) {
    let Some(max_width) = max_width else {
        return;
    };

    let separators = widths.len().saturating_sub(1) * 2;
    let mut total = widths.iter().sum::<usize>() + separators;

    while total > max_width {
        let candidate = widths
            .iter()
            .enumerate()
            .filter(|(idx, width)| **width > headers[*idx].len().max(6))
            .max_by_key(|(_, width)| **width)
            .map(|(idx, _)| idx);
        let Some(idx) = candidate else {
            break;
        };
        widths[idx] -= 1;
        total -= 1;
    }
}

fn truncate_text(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    if width <= 1 {
        return "…".to_string();
    }

    let mut out: String = value.chars().take(width - 1).collect();
    out.push('…');
    out
}

fn pad(value: &str, width: usize) -> String {
    let len = value.chars().count();
    format!("{value}{}", " ".repeat(width.saturating_sub(len)))
}

/// Color a padded cell by the outcome or verdict it names.
fn colorize_outcome(cell: &str) -> String {
    let code = match cell.trim_end() {
        "success" | "all_passed" | "visible" => Some("32"),
        "empty" | "not_run" | "partial_failure" | "absent" | "inconclusive" => Some("33"),
        "failure" | "total_failure" | "hidden" => Some("31"),
        _ => None,
    };

    match code {
        Some(code) => format!("\u{1b}[{code}m{cell}\u{1b}[0m"),
        None => cell.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const PLAIN: TableOptions = TableOptions {
        max_width: None,
        color: false,
    };

    #[test]
    fn columns_are_aligned() {
        let rows = vec![
            vec!["authenticate".to_string(), "success".to_string()],
            vec!["profile".to_string(), "empty".to_string()],
        ];
        let table = render_table(&["check", "outcome"], &rows, PLAIN);
        assert_eq!(
            table,
            "check         outcome\n\
             ---------------------\n\
             authenticate  success\n\
             profile       empty"
        );
    }

    #[test]
    fn narrow_terminal_truncates_widest_column() {
        let rows = vec![vec![
            "visible_rows:organization_memberships".to_string(),
            "not_run".to_string(),
        ]];
        let options = TableOptions {
            max_width: Some(30),
            color: false,
        };
        let table = render_table(&["check", "outcome"], &rows, options);
        let row = table.lines().nth(2).unwrap();
        assert!(row.contains('…'));
        assert!(row.chars().count() <= 30);
    }

    #[test]
    fn outcomes_are_colored() {
        assert_eq!(colorize_outcome("failure "), "\u{1b}[31mfailure \u{1b}[0m");
        assert_eq!(colorize_outcome("profiles"), "profiles");
    }
}
