// Portal operations
//
// One method per backend procedure. Each builds a fixed single-call batch
// and hands it to the AJAX engine; responses come back as raw JSON and
// are decoded by the caller with the helpers in `models`.

use std::sync::Arc;

use serde_json::{Value, json};
use strum::{Display, IntoStaticStr};
use tracing::debug;

use crate::ajax::{AjaxBatch, AjaxCall, AjaxClient};
use crate::error::Error;
use crate::models::SpotId;

pub const DASHBOARD_SERVICE: &str = r"\LMS\EV\AsyncServices\DashboardAsyncService";
pub const RECHARGE_SPOTS_SERVICE: &str = r"\LMS\EV\AsyncServices\RechargeSpotsAsyncService";

/// Usage figures older than this many seconds may be recomputed by the portal.
const USAGE_MAX_CACHE_SECS: u64 = 3600;

/// Remote actions accepted by `RechargeSpotsAsyncService::action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum SpotAction {
    StartTransaction,
    StopTransaction,
    SoftReset,
    HardReset,
    UnlockConnector,
    Block,
    Unblock,
}

/// Typed entry point to the EVC-net portal.
///
/// Cheap to clone; clones share the session.
#[derive(Clone)]
pub struct EvcNetClient {
    ajax: Arc<AjaxClient>,
}

impl EvcNetClient {
    pub fn new(ajax: AjaxClient) -> Self {
        Self {
            ajax: Arc::new(ajax),
        }
    }

    pub fn ajax(&self) -> &AjaxClient {
        &self.ajax
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// List every charging spot visible to the account.
    ///
    /// `DashboardAsyncService::networkOverview` with `{"mode": "id"}`.
    /// Response shape: `[[{spot}, ...]]`.
    pub async fn list_spots(&self) -> Result<Value, Error> {
        debug!("listing charging spots");
        self.call(DASHBOARD_SERVICE, "networkOverview", json!({ "mode": "id" }))
            .await
    }

    /// Live per-channel status of a spot.
    pub async fn spot_overview(&self, spot: &SpotId) -> Result<Value, Error> {
        debug!(spot_id = %spot, "fetching spot overview");
        self.call(
            RECHARGE_SPOTS_SERVICE,
            "overview",
            json!({ "rechargeSpotId": spot.as_str() }),
        )
        .await
    }

    /// Lifetime energy delivered by a spot.
    pub async fn spot_total_usage(&self, spot: &SpotId) -> Result<Value, Error> {
        debug!(spot_id = %spot, "fetching total usage");
        self.call(
            DASHBOARD_SERVICE,
            "totalUsage",
            json!({
                "mode": "rechargeSpot",
                "rechargeSpotIds": [spot.as_str()],
                "maxCache": USAGE_MAX_CACHE_SECS,
            }),
        )
        .await
    }

    /// Event log of one channel.
    pub async fn spot_log(&self, spot: &SpotId, channel: &str) -> Result<Value, Error> {
        debug!(spot_id = %spot, channel, "fetching channel log");
        self.call(
            RECHARGE_SPOTS_SERVICE,
            "log",
            json!({
                "rechargeSpotId": spot.as_str(),
                "channel": channel,
            }),
        )
        .await
    }

    // ── Actions ──────────────────────────────────────────────────────

    /// Start a charging session on behalf of `customer` with `card`.
    pub async fn start_charging(
        &self,
        spot: &SpotId,
        customer: &str,
        card: &str,
        channel: &str,
    ) -> Result<Value, Error> {
        let mut params = action_params(SpotAction::StartTransaction, spot, channel);
        params["customer"] = Value::String(customer.to_owned());
        params["card"] = Value::String(card.to_owned());
        debug!(spot_id = %spot, channel, "starting charging session");
        self.call(RECHARGE_SPOTS_SERVICE, "action", params).await
    }

    pub async fn stop_charging(&self, spot: &SpotId, channel: &str) -> Result<Value, Error> {
        self.action(SpotAction::StopTransaction, spot, channel).await
    }

    pub async fn soft_reset(&self, spot: &SpotId, channel: &str) -> Result<Value, Error> {
        self.action(SpotAction::SoftReset, spot, channel).await
    }

    pub async fn hard_reset(&self, spot: &SpotId, channel: &str) -> Result<Value, Error> {
        self.action(SpotAction::HardReset, spot, channel).await
    }

    pub async fn unlock_connector(&self, spot: &SpotId, channel: &str) -> Result<Value, Error> {
        self.action(SpotAction::UnlockConnector, spot, channel).await
    }

    pub async fn block(&self, spot: &SpotId, channel: &str) -> Result<Value, Error> {
        self.action(SpotAction::Block, spot, channel).await
    }

    pub async fn unblock(&self, spot: &SpotId, channel: &str) -> Result<Value, Error> {
        self.action(SpotAction::Unblock, spot, channel).await
    }

    /// Run an action that needs no parameters beyond spot and channel.
    ///
    /// `StartTransaction` goes through [`start_charging`](Self::start_charging).
    pub async fn action(
        &self,
        action: SpotAction,
        spot: &SpotId,
        channel: &str,
    ) -> Result<Value, Error> {
        debug!(spot_id = %spot, channel, %action, "sending spot action");
        self.call(
            RECHARGE_SPOTS_SERVICE,
            "action",
            action_params(action, spot, channel),
        )
        .await
    }

    async fn call(&self, handler: &str, method: &str, params: Value) -> Result<Value, Error> {
        let batch = AjaxBatch::single(AjaxCall::new(handler, method, params));
        self.ajax.request(&batch).await
    }
}

fn action_params(action: SpotAction, spot: &SpotId, channel: &str) -> Value {
    let name: &'static str = action.into();
    json!({
        "action": name,
        "rechargeSpotId": spot.as_str(),
        "clickedButtonId": 0,
        "channel": channel,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn action_params_carry_fixed_fields() {
        let params = action_params(SpotAction::StopTransaction, &SpotId::from("77"), "2");
        assert_eq!(
            params,
            json!({
                "action": "StopTransaction",
                "rechargeSpotId": "77",
                "clickedButtonId": 0,
                "channel": "2",
            })
        );
    }

    #[test]
    fn action_names_match_portal_vocabulary() {
        assert_eq!(SpotAction::UnlockConnector.to_string(), "UnlockConnector");
        assert_eq!(SpotAction::HardReset.to_string(), "HardReset");
    }
}
