//! Polling and command layer between `evcnet-api` and its consumers.
//!
//! - **[`Coordinator`]**: discovers the fleet once, refreshes every spot on
//!   a fixed period, and runs commands followed by a settle delay and a
//!   forced refresh. Partial failures keep the last known data.
//!
//! - **[`SnapshotStore`]**: the latest [`Snapshot`] behind a `watch`
//!   channel, replaced atomically per cycle.
//!
//! - **[`Command`]**: the mutating operations a spot accepts.
//!
//! - **[`EvcNetConfig`]**: validated runtime configuration. Built by the
//!   CLI; this crate never reads config files.

pub mod command;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandResult};
pub use config::{DEFAULT_BASE_URL, EvcNetConfig, TlsVerification};
pub use coordinator::{Coordinator, effective_channel_count};
pub use error::CoreError;
pub use model::{
    ChannelData, ChannelState, ChannelStatus, Snapshot, SpotData, SpotId, SpotRecord, StatusBits,
};
pub use store::{SnapshotStore, UpdateStatus};
