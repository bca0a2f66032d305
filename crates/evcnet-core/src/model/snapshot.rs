// ── Fleet snapshot ──
//
// Raw portal payloads per spot, kept verbatim so nothing the portal adds
// is lost between refreshes. Typed views decode on demand.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use evcnet_api::{ChannelStatus, SpotId, SpotRecord, decode_overview, decode_total_usage};

/// Every polled spot, in fleet order.
pub type Snapshot = IndexMap<SpotId, SpotData>;

/// Per-channel payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelData {
    pub log: Value,
}

impl Default for ChannelData {
    fn default() -> Self {
        Self {
            log: Value::Array(Vec::new()),
        }
    }
}

/// Everything known about one spot after a refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpotData {
    pub info: SpotRecord,
    /// Raw `overview` response.
    pub status: Value,
    /// Raw `totalUsage` response.
    pub total_energy_usage: Value,
    /// Keyed by channel id (`"1"`, `"2"`, ...).
    pub channels: IndexMap<String, ChannelData>,
}

impl SpotData {
    /// Stand-in for a spot whose first fetch failed.
    pub fn placeholder(info: SpotRecord) -> Self {
        Self {
            info,
            status: Value::Array(Vec::new()),
            total_energy_usage: Value::Array(Vec::new()),
            channels: IndexMap::new(),
        }
    }

    /// Decoded channel entries; empty when the payload is missing or odd.
    pub fn channel_statuses(&self) -> Vec<ChannelStatus> {
        decode_overview(&self.status).unwrap_or_default()
    }

    /// Status entry for `channel`.
    ///
    /// Entries are matched on their `CHANNEL` field; when the portal omits
    /// it, the position in the list is used instead.
    pub fn channel_status(&self, channel: &str) -> Option<ChannelStatus> {
        let statuses = self.channel_statuses();
        if let Some(found) = statuses
            .iter()
            .find(|s| s.channel.as_deref() == Some(channel))
        {
            return Some(found.clone());
        }
        let index = channel.parse::<usize>().ok()?.checked_sub(1)?;
        statuses
            .into_iter()
            .nth(index)
            .filter(|s| s.channel.is_none())
    }

    /// Lifetime energy in kWh, if the usage payload decodes.
    pub fn total_energy_kwh(&self) -> Option<f64> {
        decode_total_usage(&self.total_energy_usage).ok()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spot(status: Value) -> SpotData {
        SpotData {
            status,
            ..SpotData::placeholder(SpotRecord::default())
        }
    }

    #[test]
    fn placeholder_has_empty_payloads() {
        let data = SpotData::placeholder(SpotRecord::default());
        assert_eq!(data.status, json!([]));
        assert_eq!(data.total_energy_usage, json!([]));
        assert!(data.channels.is_empty());
        assert!(data.channel_statuses().is_empty());
        assert_eq!(data.total_energy_kwh(), None);
    }

    #[test]
    fn channel_status_matches_on_channel_field() {
        let data = spot(json!([[
            {"CHANNEL": "1", "NOTIFICATION": "Available"},
            {"CHANNEL": "2", "NOTIFICATION": "Charging"}
        ]]));
        let ch = data.channel_status("2").unwrap();
        assert_eq!(ch.notification.as_deref(), Some("Charging"));
        assert!(data.channel_status("3").is_none());
    }

    #[test]
    fn channel_status_falls_back_to_position() {
        let data = spot(json!([[{"NOTIFICATION": "Available"}]]));
        assert!(data.channel_status("1").is_some());
        assert!(data.channel_status("2").is_none());
        assert!(data.channel_status("0").is_none());
    }
}
