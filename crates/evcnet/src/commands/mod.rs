//! Command dispatch: bridges CLI args -> coordinator calls -> output formatting.

pub mod actions;
pub mod config_cmd;
pub mod spots;
pub mod status;
pub mod util;
pub mod watch;

use evcnet_core::{Command as CoreCommand, Coordinator};

use crate::cli::{Command, GlobalOpts, StartArgs};
use crate::error::CliError;

/// Dispatch a portal-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    coordinator: &Coordinator,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Spots => spots::handle(coordinator, global).await,
        Command::Status(args) => status::handle(coordinator, args, global).await,
        Command::Watch => watch::handle(coordinator, global).await,

        Command::Refresh(target) => {
            actions::run(coordinator, target, CoreCommand::RefreshStatus, global).await
        }
        Command::Start(StartArgs { target, card }) => {
            let command = CoreCommand::StartCharging { card_id: card };
            actions::run(coordinator, target, command, global).await
        }
        Command::Stop(target) => {
            actions::run(coordinator, target, CoreCommand::StopCharging, global).await
        }
        Command::SoftReset(target) => {
            actions::run(coordinator, target, CoreCommand::SoftReset, global).await
        }
        Command::HardReset(target) => {
            actions::run(coordinator, target, CoreCommand::HardReset, global).await
        }
        Command::Unlock(target) => {
            actions::run(coordinator, target, CoreCommand::UnlockConnector, global).await
        }
        Command::Block(target) => {
            actions::run(coordinator, target, CoreCommand::Block, global).await
        }
        Command::Unblock(target) => {
            actions::run(coordinator, target, CoreCommand::Unblock, global).await
        }

        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
