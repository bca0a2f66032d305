//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one line per item.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use evcnet_core::ChannelState;

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Channel state label, colored by severity when `color` is set.
pub fn state_label(state: Option<ChannelState>, color: bool) -> String {
    let Some(state) = state else {
        return "unknown".into();
    };
    let label = state.to_string();
    if !color {
        return label;
    }
    match state {
        ChannelState::Charging => label.green().bold().to_string(),
        ChannelState::Available => label.green().to_string(),
        ChannelState::Reserved | ChannelState::Full => label.yellow().to_string(),
        ChannelState::Blocked => label.magenta().to_string(),
        ChannelState::Fault | ChannelState::NoCommunication => label.red().bold().to_string(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via `serde_yaml`
/// - `plain`: calls `line_fn` on each item
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    line_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => data.iter().map(&line_fn).collect::<Vec<_>>().join("\n"),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, since detail views are free-form text.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => id_fn(data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.unwrap_or_else(|e| format!("{{\"error\": \"serialization failed: {e}\"}}"))
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).unwrap_or_else(|e| format!("error: serialization failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Serialize)]
    struct Item {
        id: &'static str,
    }

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "ID")]
        id: &'static str,
    }

    fn items() -> Vec<Item> {
        vec![Item { id: "5" }, Item { id: "9" }]
    }

    #[test]
    fn list_formats() {
        let data = items();
        let row = |i: &Item| Row { id: i.id };
        let line = |i: &Item| i.id.to_string();

        let table = render_list(&OutputFormat::Table, &data, row, line);
        assert!(table.contains("ID") && table.contains('9'));

        let compact = render_list(&OutputFormat::JsonCompact, &data, row, line);
        assert_eq!(compact, r#"[{"id":"5"},{"id":"9"}]"#);

        let plain = render_list(&OutputFormat::Plain, &data, row, line);
        assert_eq!(plain, "5\n9");

        let yaml = render_list(&OutputFormat::Yaml, &data, row, line);
        assert!(yaml.contains("id: '5'") || yaml.contains("id: \"5\""));
    }

    #[test]
    fn state_labels_without_color() {
        assert_eq!(state_label(Some(ChannelState::Charging), false), "charging");
        assert_eq!(
            state_label(Some(ChannelState::NoCommunication), false),
            "no-communication"
        );
        assert_eq!(state_label(None, false), "unknown");
        assert!(state_label(Some(ChannelState::Fault), true).contains("fault"));
    }
}
