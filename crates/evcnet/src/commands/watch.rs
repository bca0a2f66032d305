//! `evcnet watch`: run the periodic poller and print every update.

use chrono::Local;

use evcnet_core::{Coordinator, Snapshot};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::spots::{ChannelView, channel_views, plain_line};
use super::util::fmt_quantity;

pub async fn handle(coordinator: &Coordinator, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let mut snapshots = coordinator.store().subscribe();
    let mut status = coordinator.store().subscribe_status();

    coordinator.start().await?;
    snapshots.mark_unchanged();
    status.mark_unchanged();
    print_update(&coordinator.snapshot(), global, color);

    if !global.quiet {
        eprintln!(
            "Polling every {}s, press Ctrl-C to stop",
            coordinator.config().poll_interval.as_secs()
        );
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                print_update(&snapshot, global, color);
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *status.borrow_and_update();
                if !current.last_update_success {
                    eprintln!("{} refresh failed, keeping last known data", timestamp());
                }
            }
        }
    }

    coordinator.shutdown().await;
    Ok(())
}

fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

fn print_update(snapshot: &Snapshot, global: &GlobalOpts, color: bool) {
    let views: Vec<ChannelView> = snapshot
        .iter()
        .flat_map(|(id, data)| channel_views(id, data))
        .collect();

    let out = match global.output {
        OutputFormat::Table => {
            let now = timestamp();
            views
                .iter()
                .map(|v| update_line(&now, v, color))
                .collect::<Vec<_>>()
                .join("\n")
        }
        OutputFormat::Plain => views.iter().map(plain_line).collect::<Vec<_>>().join("\n"),
        // One compact document per update keeps the stream line-oriented.
        OutputFormat::Json | OutputFormat::JsonCompact => output::render_single(
            &OutputFormat::JsonCompact,
            &views,
            |_| String::new(),
            |_| String::new(),
        ),
        OutputFormat::Yaml => {
            let doc = output::render_single(
                &OutputFormat::Yaml,
                &views,
                |_| String::new(),
                |_| String::new(),
            );
            format!("---\n{doc}")
        }
    };
    output::print_output(&out, global.quiet);
}

fn update_line(now: &str, v: &ChannelView, color: bool) -> String {
    format!(
        "{now}  {} ({}) ch {}: {}  {}",
        v.name,
        v.spot,
        v.channel,
        output::state_label(v.state, color),
        fmt_quantity(v.power_kw, "kW"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use evcnet_core::ChannelState;

    #[test]
    fn update_line_shows_state_and_power() {
        let view = ChannelView {
            spot: "5".into(),
            name: "Lot A".into(),
            channel: "2".into(),
            state: Some(ChannelState::Blocked),
            status: None,
            notification: None,
            power_kw: None,
            session_energy_kwh: None,
            session_hours: 0.0,
        };
        assert_eq!(
            update_line("12:00:00", &view, false),
            "12:00:00  Lot A (5) ch 2: blocked  -"
        );
    }
}
