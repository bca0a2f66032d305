// ── Domain model ──

pub mod snapshot;

pub use snapshot::{ChannelData, Snapshot, SpotData};

pub use evcnet_api::{ChannelState, ChannelStatus, SpotId, SpotRecord, StatusBits};
