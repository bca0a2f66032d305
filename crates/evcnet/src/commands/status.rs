//! `evcnet status <SPOT>`: detail view of one spot.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;

use evcnet_core::{Coordinator, SpotId};

use crate::cli::{GlobalOpts, StatusArgs};
use crate::error::CliError;
use crate::output;

use super::spots::{ChannelView, channel_views};
use super::util::{fmt_hours, fmt_quantity};

#[derive(Debug, Serialize)]
struct SpotDetail {
    spot: String,
    name: String,
    address: Option<String>,
    software_version: Option<String>,
    total_energy_kwh: Option<f64>,
    last_update: Option<DateTime<Utc>>,
    channels: Vec<ChannelView>,
}

pub async fn handle(
    coordinator: &Coordinator,
    args: StatusArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    coordinator.refresh().await?;

    let id = SpotId::from(args.spot);
    let snapshot = coordinator.snapshot();
    let data = snapshot.get(&id).ok_or_else(|| CliError::SpotNotFound {
        identifier: id.to_string(),
    })?;

    let detail = SpotDetail {
        spot: id.to_string(),
        name: data.info.display_name(),
        address: data.info.address.clone(),
        software_version: data.info.software_version.clone(),
        total_energy_kwh: data.total_energy_kwh(),
        last_update: coordinator.status().last_success_at,
        channels: channel_views(&id, data),
    };

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &detail,
        |d| render_detail(d, color),
        |d| {
            d.channels
                .iter()
                .map(super::spots::plain_line)
                .collect::<Vec<_>>()
                .join("\n")
        },
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

fn render_detail(d: &SpotDetail, color: bool) -> String {
    let mut out = format!("{} ({})\n", d.name, d.spot);
    if let Some(ref address) = d.address {
        let _ = writeln!(out, "  Address:   {address}");
    }
    if let Some(ref version) = d.software_version {
        let _ = writeln!(out, "  Software:  {version}");
    }
    let _ = writeln!(out, "  Total:     {}", fmt_quantity(d.total_energy_kwh, "kWh"));

    for ch in &d.channels {
        let _ = write!(
            out,
            "\n  Channel {}: {}\n    Power:    {}\n    Session:  {} in {}",
            ch.channel,
            output::state_label(ch.state, color),
            fmt_quantity(ch.power_kw, "kW"),
            fmt_quantity(ch.session_energy_kwh, "kWh"),
            fmt_hours(ch.session_hours),
        );
        if let Some(ref note) = ch.notification {
            let _ = write!(out, "\n    Note:     {note}");
        }
        if let Some(ref raw) = ch.status {
            let _ = write!(out, "\n    Status:   {raw}");
        }
        out.push('\n');
    }
    out.trim_end().to_owned()
}
