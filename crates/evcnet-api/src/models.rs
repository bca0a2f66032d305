// ── Portal response models ──
//
// The backend speaks loosely-typed JSON: ids come back as numbers on one
// deployment and strings on another, numeric readings are sometimes
// quoted, and each operation wraps its payload in a different amount of
// list nesting. Everything here is lenient on scalars and strict on shape.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString, IntoStaticStr};

use crate::error::Error;

// ── SpotId ──────────────────────────────────────────────────────────

/// Identifier of a charging spot (the `IDX` field).
///
/// Always held as text; numeric ids are normalized on decode.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpotId(String);

impl SpotId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SpotId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().to_owned()))
    }
}

impl From<&str> for SpotId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for SpotId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ── SpotRecord ──────────────────────────────────────────────────────

/// One entry of the fleet listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpotRecord {
    #[serde(
        rename = "IDX",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub idx: Option<String>,
    #[serde(
        rename = "NAME",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        rename = "ADDRESS",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub address: Option<String>,
    #[serde(
        rename = "SOFTWARE_VERSION",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub software_version: Option<String>,
    /// Declared channels: absent, a single value, or a delimited list.
    #[serde(rename = "CHANNEL", default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<Value>,
    /// Everything else (`REFERENCE`, `COST_CENTER_NUMBER`, `NETWORK_TYPE`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SpotRecord {
    /// The spot id, or `None` for records the portal returned without one.
    pub fn id(&self) -> Option<SpotId> {
        self.idx.clone().map(SpotId)
    }

    /// Display name, falling back to the id.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.idx.clone())
            .unwrap_or_else(|| "unknown".into())
    }

    /// Channel ids named by the `CHANNEL` descriptor, in declared order.
    ///
    /// Lists may be delimited by `,`, `;`, `|` or whitespace, or arrive as
    /// a JSON array.
    pub fn channel_ids(&self) -> Vec<String> {
        let Some(channel) = &self.channel else {
            return Vec::new();
        };
        match channel {
            Value::Array(items) => items.iter().filter_map(value_text).collect(),
            Value::String(s) => s
                .split(|c: char| matches!(c, ',' | ';' | '|') || c.is_whitespace())
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_owned)
                .collect(),
            other => value_text(other).into_iter().collect(),
        }
    }

    /// Extra field rendered as text, if present.
    pub fn extra_text(&self, key: &str) -> Option<String> {
        self.extra.get(key).and_then(value_text)
    }
}

// ── Status bitfield ─────────────────────────────────────────────────

/// A channel's 64-bit `STATUS` value split into its two 32-bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusBits {
    pub status1: u32,
    pub status2: u32,
}

impl StatusBits {
    pub const S1_NO_COMMUNICATION: u32 = 0x3000_0000;
    pub const S1_FAULT: u32 = 0x4000_002F;

    pub const S2_BLOCKED: u32 = 0x0002_0000;
    pub const S2_OCCUPIED: u32 = 0x0001_0000;
    pub const S2_FULL: u32 = 0x0004_0000;
    pub const S2_RESERVED: u32 = 0x0000_0400;
    pub const S2_FAULT: u32 = 0xD840_7940;

    const S2_ANY: u32 = Self::S2_BLOCKED
        | Self::S2_OCCUPIED
        | Self::S2_FULL
        | Self::S2_RESERVED
        | Self::S2_FAULT;

    /// Parse the hex text of a status value.
    ///
    /// An optional `0x` prefix is stripped and the rest left-padded with
    /// zeros to 16 digits. Returns `None` for anything that isn't at most
    /// 16 hex digits.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let hex = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
            .unwrap_or(raw);
        if hex.is_empty() || hex.len() > 16 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let padded = format!("{hex:0>16}");
        let (high, low) = padded.split_at(8);
        Some(Self {
            status1: u32::from_str_radix(high, 16).ok()?,
            status2: u32::from_str_radix(low, 16).ok()?,
        })
    }

    /// Parse a raw JSON `STATUS` value. Numbers are read through their
    /// decimal text, as the portal does.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Self::parse(s),
            Value::Number(n) => Self::parse(&n.to_string()),
            _ => None,
        }
    }

    pub fn no_communication(self) -> bool {
        self.status1 & Self::S1_NO_COMMUNICATION != 0
    }

    pub fn fault(self) -> bool {
        self.status1 & Self::S1_FAULT != 0 || self.status2 & Self::S2_FAULT != 0
    }

    pub fn blocked(self) -> bool {
        self.status2 & Self::S2_BLOCKED != 0
    }

    pub fn occupied(self) -> bool {
        self.status2 & Self::S2_OCCUPIED != 0
    }

    pub fn full(self) -> bool {
        self.status2 & Self::S2_FULL != 0
    }

    pub fn reserved(self) -> bool {
        self.status2 & Self::S2_RESERVED != 0
    }

    pub fn available(self) -> bool {
        self.status2 & Self::S2_ANY == 0
    }

    /// Anything that prevents charging.
    pub fn has_error(self) -> bool {
        self.no_communication() || self.blocked() || self.fault()
    }

    pub fn is_charging(self) -> bool {
        !self.has_error() && self.occupied()
    }

    /// The single most relevant state, by priority.
    pub fn state(self) -> ChannelState {
        if self.no_communication() {
            ChannelState::NoCommunication
        } else if self.fault() {
            ChannelState::Fault
        } else if self.blocked() {
            ChannelState::Blocked
        } else if self.full() {
            ChannelState::Full
        } else if self.occupied() {
            ChannelState::Charging
        } else if self.reserved() {
            ChannelState::Reserved
        } else {
            ChannelState::Available
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ChannelState {
    NoCommunication,
    Fault,
    Blocked,
    Full,
    Charging,
    Reserved,
    Available,
}

// ── ChannelStatus ───────────────────────────────────────────────────

/// One channel entry of a spot overview.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelStatus {
    #[serde(rename = "CHANNEL", default, deserialize_with = "lenient_text")]
    pub channel: Option<String>,
    #[serde(rename = "STATUS", default)]
    pub status: Option<Value>,
    #[serde(rename = "NOTIFICATION", default, deserialize_with = "lenient_text")]
    pub notification: Option<String>,
    #[serde(rename = "MOM_POWER_KW", default, deserialize_with = "lenient_number")]
    pub power_kw: Option<f64>,
    #[serde(
        rename = "TRANS_ENERGY_DELIVERED_KWH",
        default,
        deserialize_with = "lenient_number"
    )]
    pub session_energy_kwh: Option<f64>,
    #[serde(rename = "TRANSACTION_TIME_H_M", default, deserialize_with = "lenient_text")]
    pub transaction_time: Option<String>,
    #[serde(rename = "CARDID", default, deserialize_with = "lenient_text")]
    pub card_id: Option<String>,
    #[serde(rename = "CUSTOMERS_IDX", default, deserialize_with = "lenient_text")]
    pub customer_id: Option<String>,
    #[serde(rename = "CUSTOMER_NAME", default, deserialize_with = "lenient_text")]
    pub customer_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChannelStatus {
    pub fn status_bits(&self) -> Option<StatusBits> {
        self.status.as_ref().and_then(StatusBits::from_value)
    }

    /// `None` when the portal sent no usable status.
    pub fn state(&self) -> Option<ChannelState> {
        self.status_bits().map(StatusBits::state)
    }

    pub fn is_charging(&self) -> bool {
        self.status_bits().is_some_and(StatusBits::is_charging)
    }

    /// Raw status text, as shown by the portal.
    pub fn status_text(&self) -> Option<String> {
        self.status.as_ref().and_then(value_text)
    }

    /// Duration of the running session in decimal hours.
    pub fn session_hours(&self) -> f64 {
        self.transaction_time.as_deref().map_or(0.0, hours_from_h_m)
    }
}

/// Convert an `H:MM` duration to decimal hours (`"2:30"` is 2.5).
///
/// Anything unparseable yields 0.0.
pub fn hours_from_h_m(raw: &str) -> f64 {
    let Some((hours, minutes)) = raw.trim().split_once(':') else {
        return 0.0;
    };
    match (hours.trim().parse::<u32>(), minutes.trim().parse::<u32>()) {
        (Ok(h), Ok(m)) => f64::from(h) + f64::from(m) / 60.0,
        _ => 0.0,
    }
}

// ── Decoders ────────────────────────────────────────────────────────

/// Fleet listing: `[[{spot}, ...]]`.
pub fn decode_fleet(response: &Value) -> Result<Vec<SpotRecord>, Error> {
    let spots = first_list(response, "fleet listing")?;
    spots
        .iter()
        .map(|spot| {
            SpotRecord::deserialize(spot).map_err(|e| {
                Error::malformed(format!("invalid spot record: {e}"), &response.to_string())
            })
        })
        .collect()
}

/// Spot overview: the first element is the list of channel entries.
pub fn decode_overview(response: &Value) -> Result<Vec<ChannelStatus>, Error> {
    let channels = first_list(response, "spot overview")?;
    channels
        .iter()
        .map(|entry| {
            ChannelStatus::deserialize(entry).map_err(|e| {
                Error::malformed(format!("invalid channel entry: {e}"), &response.to_string())
            })
        })
        .collect()
}

/// Total usage in kWh: the `number` field of the first entry, which may
/// itself be wrapped in a list.
pub fn decode_total_usage(response: &Value) -> Result<f64, Error> {
    let malformed = |what: &str| Error::malformed(what.to_owned(), &response.to_string());

    let first = response
        .as_array()
        .and_then(|items| items.first())
        .ok_or_else(|| malformed("total usage: expected a non-empty list"))?;
    let entry = match first {
        Value::Array(inner) => inner
            .first()
            .ok_or_else(|| malformed("total usage: empty inner list"))?,
        other => other,
    };
    entry
        .get("number")
        .and_then(value_number)
        .ok_or_else(|| malformed("total usage: missing or non-numeric `number`"))
}

fn first_list<'a>(response: &'a Value, what: &str) -> Result<&'a Vec<Value>, Error> {
    response
        .as_array()
        .and_then(|outer| outer.first())
        .and_then(Value::as_array)
        .ok_or_else(|| {
            Error::malformed(
                format!("{what}: expected a list whose first element is a list"),
                &response.to_string(),
            )
        })
}

// ── Lenient scalars ─────────────────────────────────────────────────

/// Render a scalar as text; empty strings and non-scalars are `None`.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_owned())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Read a number that may be quoted (`"12.5"`, `"12,5"`).
pub fn value_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(value_text))
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(value_number))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn bits(raw: &str) -> StatusBits {
        StatusBits::parse(raw).unwrap()
    }

    #[test]
    fn status_splits_into_high_and_low_words() {
        let b = bits("0x0000000100010000");
        assert_eq!(b.status1, 0x0000_0001);
        assert_eq!(b.status2, 0x0001_0000);
    }

    #[test]
    fn short_status_is_left_padded() {
        let b = bits("10000");
        assert_eq!(b.status1, 0);
        assert_eq!(b.status2, 0x0001_0000);
        assert!(b.is_charging());
    }

    #[test]
    fn numeric_status_reads_its_decimal_text_as_hex() {
        let b = StatusBits::from_value(&json!(20000)).unwrap();
        assert_eq!(b.status2, 0x0002_0000);
        assert!(b.blocked());
    }

    #[test]
    fn invalid_status_is_rejected() {
        assert_eq!(StatusBits::parse(""), None);
        assert_eq!(StatusBits::parse("0x"), None);
        assert_eq!(StatusBits::parse("xyz"), None);
        assert_eq!(StatusBits::parse("00000000000000000"), None);
        assert_eq!(StatusBits::from_value(&json!(null)), None);
    }

    #[test]
    fn occupied_without_errors_is_charging() {
        let b = bits("0000000000010000");
        assert!(b.occupied());
        assert!(!b.has_error());
        assert!(b.is_charging());
        assert_eq!(b.state(), ChannelState::Charging);
    }

    #[test]
    fn no_communication_masks_everything_else() {
        let b = bits("1000000000010000");
        assert!(b.has_error());
        assert!(!b.is_charging());
        assert_eq!(b.state(), ChannelState::NoCommunication);
    }

    #[test]
    fn blocked_is_an_error() {
        let b = bits("0000000000030000");
        assert!(b.blocked());
        assert!(b.has_error());
        assert!(!b.is_charging());
        assert_eq!(b.state(), ChannelState::Blocked);
    }

    #[test]
    fn no_communication_and_blocked_together() {
        let b = bits("0x3000000000020000");
        assert_eq!(b.status1, 0x3000_0000);
        assert_eq!(b.status2, 0x0002_0000);
        assert!(b.no_communication());
        assert!(b.blocked());
        assert!(!b.is_charging());
        assert_eq!(b.state(), ChannelState::NoCommunication);
    }

    #[test]
    fn prefixed_occupied_status_is_charging() {
        let b = bits("0x0000000000010000");
        assert_eq!(b.status1, 0);
        assert_eq!(b.status2, 0x0001_0000);
        assert!(b.is_charging());
    }

    #[test]
    fn fault_bits_in_either_word() {
        assert_eq!(bits("0000000100000000").state(), ChannelState::Fault);
        assert_eq!(bits("0000000000000040").state(), ChannelState::Fault);
    }

    #[test]
    fn full_reserved_and_available() {
        assert_eq!(bits("0000000000040000").state(), ChannelState::Full);
        assert_eq!(bits("0000000000000400").state(), ChannelState::Reserved);
        let idle = bits("0");
        assert!(idle.available());
        assert_eq!(idle.state(), ChannelState::Available);
    }

    #[test]
    fn channel_state_renders_kebab_case() {
        assert_eq!(ChannelState::NoCommunication.to_string(), "no-communication");
        assert_eq!(
            "charging".parse::<ChannelState>().unwrap(),
            ChannelState::Charging
        );
    }

    #[test]
    fn transaction_time_converts_to_hours() {
        assert_eq!(hours_from_h_m("2:30"), 2.5);
        assert_eq!(hours_from_h_m("0:15"), 0.25);
        assert_eq!(hours_from_h_m("bad"), 0.0);
        assert_eq!(hours_from_h_m("1:xx"), 0.0);
        assert_eq!(hours_from_h_m(""), 0.0);
    }

    #[test]
    fn spot_record_accepts_numeric_and_string_ids() {
        let a: SpotRecord = serde_json::from_value(json!({"IDX": 12345, "NAME": "Drive"})).unwrap();
        let b: SpotRecord = serde_json::from_value(json!({"IDX": "12345"})).unwrap();
        assert_eq!(a.id(), Some(SpotId::from("12345")));
        assert_eq!(a.id(), b.id());
        assert_eq!(b.display_name(), "12345");
    }

    #[test]
    fn spot_record_keeps_unknown_fields() {
        let spot: SpotRecord = serde_json::from_value(json!({
            "IDX": "1",
            "REFERENCE": "EVB-P123",
            "NETWORK_TYPE": "GPRS",
        }))
        .unwrap();
        assert_eq!(spot.extra_text("REFERENCE").as_deref(), Some("EVB-P123"));
        assert_eq!(spot.extra.len(), 2);
    }

    #[test]
    fn channel_descriptor_variants() {
        let parse = |v: Value| {
            serde_json::from_value::<SpotRecord>(json!({"IDX": "1", "CHANNEL": v}))
                .unwrap()
                .channel_ids()
        };
        assert_eq!(parse(json!("1")), vec!["1"]);
        assert_eq!(parse(json!(2)), vec!["2"]);
        assert_eq!(parse(json!("1,2")), vec!["1", "2"]);
        assert_eq!(parse(json!("1; 2 |3")), vec!["1", "2", "3"]);
        assert_eq!(parse(json!(["1", 2])), vec!["1", "2"]);
        assert!(SpotRecord::default().channel_ids().is_empty());
    }

    #[test]
    fn decode_fleet_unwraps_nested_list() {
        let spots =
            decode_fleet(&json!([[{"IDX": "5", "NAME": "Lot A", "CHANNEL": "1"}]])).unwrap();
        assert_eq!(spots.len(), 1);
        assert_eq!(spots[0].name.as_deref(), Some("Lot A"));
    }

    #[test]
    fn decode_fleet_rejects_flat_shapes() {
        assert!(matches!(
            decode_fleet(&json!({"IDX": "5"})),
            Err(Error::MalformedResponse { .. })
        ));
        assert!(decode_fleet(&json!([])).is_err());
        assert!(decode_fleet(&json!([{"IDX": "5"}])).is_err());
        assert!(decode_fleet(&json!([[]])).unwrap().is_empty());
    }

    #[test]
    fn decode_overview_reads_channel_entries() {
        let channels = decode_overview(&json!([[
            {
                "CHANNEL": 1,
                "STATUS": "0000000000010000",
                "NOTIFICATION": "Charging",
                "MOM_POWER_KW": "7.2",
                "TRANS_ENERGY_DELIVERED_KWH": 3.5,
                "TRANSACTION_TIME_H_M": "1:30",
                "CARDID": "CARD-1",
                "CUSTOMERS_IDX": 42
            }
        ]]))
        .unwrap();

        let ch = &channels[0];
        assert_eq!(ch.channel.as_deref(), Some("1"));
        assert_eq!(ch.power_kw, Some(7.2));
        assert_eq!(ch.session_energy_kwh, Some(3.5));
        assert_eq!(ch.session_hours(), 1.5);
        assert_eq!(ch.card_id.as_deref(), Some("CARD-1"));
        assert_eq!(ch.customer_id.as_deref(), Some("42"));
        assert_eq!(ch.state(), Some(ChannelState::Charging));
        assert!(ch.is_charging());
    }

    #[test]
    fn decode_total_usage_handles_both_wrappings() {
        assert_eq!(decode_total_usage(&json!([{"number": 123.4}])).unwrap(), 123.4);
        assert_eq!(decode_total_usage(&json!([[{"number": "56"}]])).unwrap(), 56.0);
        assert!(decode_total_usage(&json!([{"value": 1}])).is_err());
        assert!(decode_total_usage(&json!([])).is_err());
    }
}
