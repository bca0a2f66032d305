// evcnet-api: Async Rust client for the EVC-net charging portal
//
// Layers, leaves first:
// - `session`: cookie-session login with backoff and a single-flight lock
// - `ajax`: batched `/api/ajax` calls with expiry detection and one retry
// - `client`: typed wrappers, one per backend operation
// - `models`: response decoders and the channel status bitfield

pub mod ajax;
pub mod client;
pub mod error;
pub mod models;
pub mod session;
pub mod transport;

pub use ajax::{AjaxBatch, AjaxCall, AjaxClient};
pub use client::{EvcNetClient, SpotAction};
pub use error::Error;
pub use models::{
    ChannelState, ChannelStatus, SpotId, SpotRecord, StatusBits, decode_fleet, decode_overview,
    decode_total_usage, hours_from_h_m,
};
pub use session::{Authenticator, Credentials, SessionToken};
pub use transport::{TlsMode, TransportConfig};
