//! `evcnet spots`: one row per channel across the fleet.

use serde::Serialize;
use tabled::Tabled;

use evcnet_core::{ChannelState, Coordinator, SpotData, SpotId};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util::{fmt_hours, fmt_quantity};

/// Flattened view of one channel of one spot.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelView {
    pub spot: String,
    pub name: String,
    pub channel: String,
    pub state: Option<ChannelState>,
    /// Raw status word as reported.
    pub status: Option<String>,
    pub notification: Option<String>,
    pub power_kw: Option<f64>,
    pub session_energy_kwh: Option<f64>,
    pub session_hours: f64,
}

#[derive(Tabled)]
struct ChannelRow {
    #[tabled(rename = "SPOT")]
    spot: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "CH")]
    channel: String,
    #[tabled(rename = "STATE")]
    state: String,
    #[tabled(rename = "POWER")]
    power: String,
    #[tabled(rename = "SESSION")]
    energy: String,
    #[tabled(rename = "TIME")]
    time: String,
}

fn to_row(v: &ChannelView) -> ChannelRow {
    ChannelRow {
        spot: v.spot.clone(),
        name: v.name.clone(),
        channel: v.channel.clone(),
        state: output::state_label(v.state, false),
        power: fmt_quantity(v.power_kw, "kW"),
        energy: fmt_quantity(v.session_energy_kwh, "kWh"),
        time: fmt_hours(v.session_hours),
    }
}

/// Views for every channel the overview reports. A spot without channel
/// data still gets one row so it shows up in listings.
pub fn channel_views(id: &SpotId, data: &SpotData) -> Vec<ChannelView> {
    let name = data.info.display_name();
    let statuses = data.channel_statuses();
    if statuses.is_empty() {
        return vec![ChannelView {
            spot: id.to_string(),
            name,
            channel: "-".into(),
            state: None,
            status: None,
            notification: None,
            power_kw: None,
            session_energy_kwh: None,
            session_hours: 0.0,
        }];
    }

    statuses
        .iter()
        .enumerate()
        .map(|(i, status)| ChannelView {
            spot: id.to_string(),
            name: name.clone(),
            channel: status.channel.clone().unwrap_or_else(|| (i + 1).to_string()),
            state: status.state(),
            status: status.status_text(),
            notification: status.notification.clone(),
            power_kw: status.power_kw,
            session_energy_kwh: status.session_energy_kwh,
            session_hours: status.session_hours(),
        })
        .collect()
}

/// Tab-separated `spot channel state` line for plain output.
pub fn plain_line(v: &ChannelView) -> String {
    format!(
        "{}\t{}\t{}",
        v.spot,
        v.channel,
        output::state_label(v.state, false)
    )
}

pub async fn handle(coordinator: &Coordinator, global: &GlobalOpts) -> Result<(), CliError> {
    coordinator.refresh().await?;

    let snapshot = coordinator.snapshot();
    let views: Vec<ChannelView> = snapshot
        .iter()
        .flat_map(|(id, data)| channel_views(id, data))
        .collect();

    if views.is_empty() && !global.quiet {
        eprintln!("No charging spots found for this account");
    }

    let out = output::render_list(&global.output, &views, to_row, plain_line);
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use serde_json::json;

    use super::*;
    use evcnet_core::SpotRecord;

    fn spot(status: serde_json::Value) -> SpotData {
        let info: SpotRecord =
            serde_json::from_value(json!({ "IDX": "5", "NAME": "Lot A" })).unwrap();
        SpotData {
            status,
            ..SpotData::placeholder(info)
        }
    }

    #[test]
    fn one_view_per_reported_channel() {
        let data = spot(json!([[
            { "CHANNEL": "1", "STATUS": "0000000000010000", "MOM_POWER_KW": "7.4",
              "TRANSACTION_TIME_H_M": "1:15" },
            { "STATUS": "0" }
        ]]));

        let views = channel_views(&SpotId::from("5"), &data);

        assert_eq!(views.len(), 2);
        assert_eq!(views[0].state, Some(ChannelState::Charging));
        assert_eq!(views[0].power_kw, Some(7.4));
        assert_eq!(views[0].session_hours, 1.25);
        assert_eq!(views[1].channel, "2");
        assert_eq!(views[1].state, Some(ChannelState::Available));
        assert_eq!(plain_line(&views[0]), "5\t1\tcharging");
    }

    #[test]
    fn spot_without_status_gets_a_row() {
        let views = channel_views(&SpotId::from("5"), &spot(json!([])));
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].name, "Lot A");
        assert_eq!(views[0].state, None);
    }
}
