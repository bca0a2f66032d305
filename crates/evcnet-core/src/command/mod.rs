// ── Command API ──
//
// Every mutating operation against a spot flows through `Command`. The
// coordinator maps each variant to one portal action, waits for the
// charger to settle, then refreshes.

use serde::Serialize;
use serde_json::Value;
use strum::{Display, IntoStaticStr};

use crate::model::SpotId;

/// Operations that can be run against one channel of a spot.
#[derive(Debug, Clone, PartialEq, Eq, Display, IntoStaticStr, Serialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum Command {
    /// Re-read the spot overview.
    RefreshStatus,
    /// Start a session. Without a card id, the configured one is used,
    /// then the card reported by the charger.
    StartCharging { card_id: Option<String> },
    StopCharging,
    SoftReset,
    HardReset,
    UnlockConnector,
    Block,
    Unblock,
}

/// What a command did.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
    pub spot: SpotId,
    pub channel: String,
    pub command: Command,
    /// Raw portal response.
    pub response: Value,
}
