//! Shared helpers for command handlers.

use std::io::IsTerminal;

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal to ask on, `--yes` is required.
pub fn confirm(action: &str, message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(prompt_err)
}

/// Map a dialoguer / interactive I/O failure into `CliError`.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// `7.4 kW`, or `-` when unknown.
pub fn fmt_quantity(value: Option<f64>, unit: &str) -> String {
    value.map_or_else(|| "-".into(), |v| format!("{v:.1} {unit}"))
}

/// Decimal hours as `H:MM`.
pub fn fmt_hours(hours: f64) -> String {
    if hours <= 0.0 {
        return "-".into();
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let minutes = (hours * 60.0).round() as u64;
    format!("{}:{:02}", minutes / 60, minutes % 60)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn formats_quantities() {
        assert_eq!(fmt_quantity(Some(7.36), "kW"), "7.4 kW");
        assert_eq!(fmt_quantity(None, "kWh"), "-");
    }

    #[test]
    fn formats_hours() {
        assert_eq!(fmt_hours(2.5), "2:30");
        assert_eq!(fmt_hours(0.0), "-");
        assert_eq!(fmt_hours(1.0 / 60.0), "0:01");
    }

    #[test]
    fn yes_flag_skips_prompt() {
        assert!(confirm("hard-reset", "Really?", true).unwrap());
    }
}
