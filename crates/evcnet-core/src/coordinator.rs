// ── Polling coordinator ──
//
// Owns the portal client and the snapshot store. One refresh cycle walks
// every discovered spot in order; a spot that fails keeps its previous
// data, a channel log that fails keeps its previous log. Only a failed
// fleet listing fails the whole cycle.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use evcnet_api::{AjaxClient, EvcNetClient, decode_fleet, decode_overview, decode_total_usage};

use crate::command::{Command, CommandResult};
use crate::config::{EvcNetConfig, non_blank};
use crate::error::CoreError;
use crate::model::{ChannelData, ChannelStatus, Snapshot, SpotData, SpotId, SpotRecord};
use crate::store::{SnapshotStore, UpdateStatus};

/// Drives polling and commands for one portal account.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. Refresh cycles never
/// overlap: periodic, forced and post-command refreshes queue on the
/// same lock.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    config: EvcNetConfig,
    client: EvcNetClient,
    store: Arc<SnapshotStore>,
    /// Fleet listing, fetched once.
    spots: Mutex<Option<Arc<Vec<SpotRecord>>>>,
    refresh_lock: Mutex<()>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Coordinator {
    /// Validate `config` and build the portal client. No network traffic
    /// happens until the first refresh.
    pub fn new(config: EvcNetConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let ajax = AjaxClient::new(
            config.base_url.clone(),
            config.credentials(),
            &config.transport(),
        )?
        .with_auth_backoff(config.auth_backoff);
        Ok(Self::with_client(config, EvcNetClient::new(ajax)))
    }

    /// Build around an existing client.
    pub fn with_client(config: EvcNetConfig, client: EvcNetClient) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                config,
                client,
                store: Arc::new(SnapshotStore::new()),
                spots: Mutex::new(None),
                refresh_lock: Mutex::new(()),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &EvcNetConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &EvcNetClient {
        &self.inner.client
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.inner.store
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.store.snapshot()
    }

    pub fn status(&self) -> UpdateStatus {
        self.inner.store.status()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Run a first refresh, then poll every `poll_interval` in the
    /// background until [`shutdown`](Self::shutdown).
    pub async fn start(&self) -> Result<(), CoreError> {
        self.refresh().await?;

        let ctrl = self.clone();
        let period = self.inner.config.poll_interval;
        let cancel = self.inner.cancel.clone();
        self.inner
            .task_handles
            .lock()
            .await
            .push(tokio::spawn(refresh_task(ctrl, period, cancel)));
        debug!(?period, "periodic refresh started");
        Ok(())
    }

    /// Stop background polling and wait for it to finish.
    ///
    /// A cycle in progress is dropped without publishing.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("coordinator stopped");
    }

    // ── Refresh ──────────────────────────────────────────────────────

    /// Run one refresh cycle and publish the result.
    ///
    /// On failure the previous snapshot stays in place and
    /// `last_update_success` turns `false`.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let _cycle = self.inner.refresh_lock.lock().await;
        match self.collect().await {
            Ok(snapshot) => {
                debug!(spots = snapshot.len(), "publishing snapshot");
                self.inner.store.publish(snapshot);
                Ok(())
            }
            Err(e) => {
                self.inner.store.mark_failed();
                Err(CoreError::UpdateFailed(Box::new(e)))
            }
        }
    }

    /// Out-of-band refresh; failures are logged, not returned.
    pub async fn request_refresh(&self) {
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "refresh failed");
        }
    }

    /// The discovered fleet (fetching it if needed).
    pub async fn spots(&self) -> Result<Arc<Vec<SpotRecord>>, CoreError> {
        let mut cached = self.inner.spots.lock().await;
        if let Some(spots) = cached.as_ref() {
            return Ok(Arc::clone(spots));
        }

        let response = self.inner.client.list_spots().await?;
        let spots: Vec<SpotRecord> = match decode_fleet(&response) {
            Ok(spots) => spots,
            Err(e) => {
                warn!(error = %e, "unexpected charging spot listing shape");
                Vec::new()
            }
        };
        let total = spots.len();
        let spots: Vec<SpotRecord> = spots.into_iter().filter(|s| s.id().is_some()).collect();
        if spots.len() < total {
            debug!(skipped = total - spots.len(), "ignoring spots without IDX");
        }
        info!(count = spots.len(), "found charging spots");

        let spots = Arc::new(spots);
        // An empty listing is retried next cycle.
        if spots.is_empty() {
            warn!("no charging spots found");
        } else {
            *cached = Some(Arc::clone(&spots));
        }
        Ok(spots)
    }

    async fn collect(&self) -> Result<Snapshot, CoreError> {
        let spots = self.spots().await?;
        let previous = self.inner.store.snapshot();
        let mut next = Snapshot::with_capacity(spots.len());

        for info in spots.iter() {
            let Some(id) = info.id() else { continue };
            let data = match self.fetch_spot(&id, info, previous.get(&id)).await {
                Ok(data) => data,
                Err(e) => {
                    warn!(spot_id = %id, error = %e, "spot update failed, keeping previous data");
                    previous
                        .get(&id)
                        .cloned()
                        .unwrap_or_else(|| SpotData::placeholder(info.clone()))
                }
            };
            next.insert(id, data);
        }
        Ok(next)
    }

    async fn fetch_spot(
        &self,
        id: &SpotId,
        info: &SpotRecord,
        previous: Option<&SpotData>,
    ) -> Result<SpotData, CoreError> {
        let client = &self.inner.client;
        let status = client.spot_overview(id).await?;
        let total_energy_usage = client.spot_total_usage(id).await?;

        // Payloads are kept verbatim; readers fall back on missing fields.
        let statuses = decode_overview(&status).unwrap_or_else(|e| {
            debug!(spot_id = %id, error = %e, "overview without channel entries");
            Vec::new()
        });
        if let Err(e) = decode_total_usage(&total_energy_usage) {
            debug!(spot_id = %id, error = %e, "total usage without a number");
        }

        let count = effective_channel_count(self.inner.config.max_channels, &statuses, info);
        let mut channels = IndexMap::with_capacity(count);
        for n in 1..=count {
            let channel = n.to_string();
            let log = match client.spot_log(id, &channel).await {
                Ok(log) => log,
                Err(e) => {
                    debug!(spot_id = %id, %channel, error = %e, "log fetch failed, carrying over");
                    previous
                        .and_then(|p| p.channels.get(&channel))
                        .map_or_else(|| Value::Array(Vec::new()), |c| c.log.clone())
                }
            };
            channels.insert(channel, ChannelData { log });
        }

        Ok(SpotData {
            info: info.clone(),
            status,
            total_energy_usage,
            channels,
        })
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Run `command` against one channel of `spot`, then refresh.
    ///
    /// Without an explicit channel the spot's first declared channel is
    /// used, else `"1"`. A successful command waits `settle_delay` before
    /// refreshing; a failed one (an unknown spot included) refreshes
    /// immediately and returns the error.
    pub async fn execute(
        &self,
        spot: &SpotId,
        channel: Option<&str>,
        command: Command,
    ) -> Result<CommandResult, CoreError> {
        let info = match self.spot_info(spot).await {
            Ok(info) => info,
            Err(e) => {
                error!(spot_id = %spot, %command, error = %e, "command failed");
                self.request_refresh().await;
                return Err(e);
            }
        };
        let channel = non_blank(channel)
            .map(str::to_owned)
            .or_else(|| info.channel_ids().into_iter().next())
            .unwrap_or_else(|| "1".into());

        match self.dispatch(spot, &channel, &command).await {
            Ok(response) => {
                info!(spot_id = %spot, %channel, %command, "command sent");
                tokio::time::sleep(self.inner.config.settle_delay).await;
                self.request_refresh().await;
                Ok(CommandResult {
                    spot: spot.clone(),
                    channel,
                    command,
                    response,
                })
            }
            Err(e) => {
                error!(spot_id = %spot, %channel, %command, error = %e, "command failed");
                self.request_refresh().await;
                Err(e)
            }
        }
    }

    async fn spot_info(&self, spot: &SpotId) -> Result<SpotRecord, CoreError> {
        self.spots()
            .await?
            .iter()
            .find(|s| s.id().as_ref() == Some(spot))
            .cloned()
            .ok_or_else(|| CoreError::SpotNotFound {
                identifier: spot.to_string(),
            })
    }

    async fn dispatch(
        &self,
        spot: &SpotId,
        channel: &str,
        command: &Command,
    ) -> Result<Value, CoreError> {
        let client = &self.inner.client;
        let response = match command {
            Command::RefreshStatus => client.spot_overview(spot).await?,
            Command::StartCharging { card_id } => {
                let (customer, card) = self
                    .resolve_start_ids(spot, channel, card_id.as_deref())
                    .await?;
                client.start_charging(spot, &customer, &card, channel).await?
            }
            Command::StopCharging => client.stop_charging(spot, channel).await?,
            Command::SoftReset => client.soft_reset(spot, channel).await?,
            Command::HardReset => client.hard_reset(spot, channel).await?,
            Command::UnlockConnector => client.unlock_connector(spot, channel).await?,
            Command::Block => client.block(spot, channel).await?,
            Command::Unblock => client.unblock(spot, channel).await?,
        };
        Ok(response)
    }

    /// Pick the `(customer, card)` pair for a start.
    ///
    /// Card: argument, then config, then the `CARDID` the charger reports.
    /// Customer: config, then `CUSTOMERS_IDX`, then empty.
    async fn resolve_start_ids(
        &self,
        spot: &SpotId,
        channel: &str,
        card_arg: Option<&str>,
    ) -> Result<(String, String), CoreError> {
        let config = &self.inner.config;
        let explicit_card = non_blank(card_arg).or_else(|| config.configured_card());
        let explicit_customer = config.configured_customer();

        let reported = if explicit_card.is_some() && explicit_customer.is_some() {
            None
        } else {
            self.reported_status(spot, channel).await?
        };

        let card = explicit_card
            .map(str::to_owned)
            .or_else(|| reported.as_ref().and_then(|s| s.card_id.clone()))
            .ok_or_else(|| CoreError::MissingCardId { spot: spot.clone() })?;
        let customer = explicit_customer
            .map(str::to_owned)
            .or_else(|| reported.as_ref().and_then(|s| s.customer_id.clone()))
            .unwrap_or_default();

        debug!(spot_id = %spot, channel, "resolved start ids");
        Ok((customer, card))
    }

    /// The charger's own view of `channel`, from the snapshot or, before
    /// the first refresh, straight from the portal.
    async fn reported_status(
        &self,
        spot: &SpotId,
        channel: &str,
    ) -> Result<Option<ChannelStatus>, CoreError> {
        let statuses = match self.inner.store.spot(spot) {
            Some(data) => {
                if let Some(status) = data.channel_status(channel) {
                    return Ok(Some(status));
                }
                data.channel_statuses()
            }
            None => decode_overview(&self.inner.client.spot_overview(spot).await?)?,
        };
        Ok(statuses
            .iter()
            .find(|s| s.channel.as_deref() == Some(channel))
            .or_else(|| statuses.first())
            .cloned())
    }
}

/// Channels to poll for a spot.
///
/// The larger of the configured minimum and what the spot reports: the
/// distinct `CHANNEL` values in its overview, else the length of its
/// declared channel list, else one.
pub fn effective_channel_count(
    max_channels: usize,
    statuses: &[ChannelStatus],
    info: &SpotRecord,
) -> usize {
    let from_overview = statuses
        .iter()
        .filter_map(|s| s.channel.as_deref())
        .collect::<HashSet<_>>()
        .len();
    let detected = if from_overview > 0 {
        from_overview
    } else {
        info.channel_ids().len().max(1)
    };
    max_channels.max(detected)
}

/// Periodic refresh until cancelled.
async fn refresh_task(coordinator: Coordinator, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // the first tick fires immediately

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = coordinator.request_refresh() => {}
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn statuses(value: serde_json::Value) -> Vec<ChannelStatus> {
        decode_overview(&value).unwrap()
    }

    fn spot(channel: Option<&str>) -> SpotRecord {
        SpotRecord {
            idx: Some("1".into()),
            channel: channel.map(|c| json!(c)),
            ..SpotRecord::default()
        }
    }

    #[test]
    fn overview_channels_win_over_declared_list() {
        let s = statuses(json!([[{"CHANNEL": "1"}, {"CHANNEL": "2"}, {"CHANNEL": "2"}]]));
        assert_eq!(effective_channel_count(1, &s, &spot(Some("1"))), 2);
    }

    #[test]
    fn declared_list_used_without_overview_channels() {
        let s = statuses(json!([[{"STATUS": "0"}]]));
        assert_eq!(effective_channel_count(1, &s, &spot(Some("1,2,3"))), 3);
    }

    #[test]
    fn configured_minimum_is_respected() {
        let s = statuses(json!([[{"CHANNEL": "1"}]]));
        assert_eq!(effective_channel_count(4, &s, &spot(None)), 4);
    }

    #[test]
    fn defaults_to_one_channel() {
        assert_eq!(effective_channel_count(1, &[], &spot(None)), 1);
    }
}
