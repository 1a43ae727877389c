//! Terminal preferences for table output, resolved once at startup.

use std::io::IsTerminal;
use std::sync::OnceLock;

use crate::cli::{ColorMode, GlobalFlags, OutputFormat};

/// `COLUMNS` values below this are ignored.
const MIN_TERM_WIDTH: usize = 40;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UiPrefs {
    pub table_color: bool,
    pub term_width: Option<usize>,
}

impl UiPrefs {
    fn resolve(flags: &GlobalFlags, stdout_tty: bool, no_color: bool, columns: Option<&str>) -> Self {
        let wants_color = match flags.color {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => stdout_tty && !no_color,
        };
        Self {
            table_color: wants_color && flags.format == OutputFormat::Table,
            term_width: columns
                .and_then(|value| value.trim().parse::<usize>().ok())
                .filter(|width| *width >= MIN_TERM_WIDTH),
        }
    }
}

static PREFS: OnceLock<UiPrefs> = OnceLock::new();

pub fn init(flags: &GlobalFlags) {
    let columns = std::env::var("COLUMNS").ok();
    let prefs = UiPrefs::resolve(
        flags,
        std::io::stdout().is_terminal(),
        std::env::var_os("NO_COLOR").is_some(),
        columns.as_deref(),
    );
    if PREFS.set(prefs).is_err() {
        tracing::debug!("ui preferences already initialized");
    }
}

#[must_use]
pub fn prefs() -> UiPrefs {
    PREFS.get().copied().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn flags(format: OutputFormat, color: ColorMode) -> GlobalFlags {
        GlobalFlags {
            format,
            color,
            quiet: false,
            verbose: false,
            project: None,
        }
    }

    #[test]
    fn color_only_applies_to_tables() {
        let json = UiPrefs::resolve(&flags(OutputFormat::Json, ColorMode::Always), true, false, None);
        assert!(!json.table_color);

        let table = UiPrefs::resolve(&flags(OutputFormat::Table, ColorMode::Always), false, true, None);
        assert!(table.table_color);
    }

    #[test]
    fn auto_color_needs_a_terminal_and_no_no_color() {
        let auto = flags(OutputFormat::Table, ColorMode::Auto);
        assert!(UiPrefs::resolve(&auto, true, false, None).table_color);
        assert!(!UiPrefs::resolve(&auto, false, false, None).table_color);
        assert!(!UiPrefs::resolve(&auto, true, true, None).table_color);
    }

    #[test]
    fn narrow_or_invalid_columns_are_ignored() {
        let table = flags(OutputFormat::Table, ColorMode::Never);
        assert_eq!(UiPrefs::resolve(&table, true, false, Some("120")).term_width, Some(120));
        assert_eq!(UiPrefs::resolve(&table, true, false, Some("20")).term_width, None);
        assert_eq!(UiPrefs::resolve(&table, true, false, Some("wide")).term_width, None);
    }
}
