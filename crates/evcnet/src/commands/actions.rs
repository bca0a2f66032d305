//! Spot commands: refresh, start, stop, resets, unlock, block.

use evcnet_core::{Command as CoreCommand, CommandResult, Coordinator, SpotId};

use crate::cli::{GlobalOpts, SpotTarget};
use crate::error::CliError;
use crate::output;

use super::util;

/// Run `command` against the targeted spot and report the outcome.
pub async fn run(
    coordinator: &Coordinator,
    target: SpotTarget,
    command: CoreCommand,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if needs_confirmation(&command) {
        let action: &'static str = (&command).into();
        let prompt = format!("Send {command} to spot {}?", target.spot);
        if !util::confirm(action, &prompt, global.yes)? {
            return Ok(());
        }
    }

    let spot = SpotId::from(target.spot);
    let result = coordinator
        .execute(&spot, target.channel.as_deref(), command)
        .await?;

    let out = output::render_single(&global.output, &result, summary, |r| r.spot.to_string());
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Commands that interrupt a running session or lock users out.
fn needs_confirmation(command: &CoreCommand) -> bool {
    matches!(command, CoreCommand::HardReset | CoreCommand::Block)
}

fn summary(result: &CommandResult) -> String {
    format!(
        "✓ {} sent to spot {} (channel {})",
        result.command, result.spot, result.channel
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn destructive_commands_ask_first() {
        assert!(needs_confirmation(&CoreCommand::HardReset));
        assert!(needs_confirmation(&CoreCommand::Block));
        assert!(!needs_confirmation(&CoreCommand::SoftReset));
        assert!(!needs_confirmation(&CoreCommand::StartCharging { card_id: None }));
    }

    #[test]
    fn summary_names_spot_and_channel() {
        let result = CommandResult {
            spot: SpotId::from("5"),
            channel: "2".into(),
            command: CoreCommand::StopCharging,
            response: json!([]),
        };
        assert_eq!(summary(&result), "✓ stop-charging sent to spot 5 (channel 2)");
    }
}
