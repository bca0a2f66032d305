// ── Core error types ──
//
// User-facing errors from evcnet-core. Callers never see raw HTTP
// statuses or cookie problems; `From<evcnet_api::Error>` folds them into
// domain variants.

use thiserror::Error;

use evcnet_api::SpotId;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to EVC-net at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("EVC-net request timed out")]
    Timeout,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Charging spot not found: {identifier}")]
    SpotNotFound { identifier: String },

    #[error("No card id available to start charging on spot {spot}")]
    MissingCardId { spot: SpotId },

    #[error("Unexpected data from EVC-net: {message}")]
    MalformedResponse { message: String },

    // ── Operation errors ─────────────────────────────────────────────
    /// A whole refresh cycle failed; the previous snapshot is kept.
    #[error("Error communicating with EVC-net: {0}")]
    UpdateFailed(#[source] Box<CoreError>),

    #[error("EVC-net API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// The innermost error, looking through `UpdateFailed`.
    pub fn root(&self) -> &CoreError {
        match self {
            Self::UpdateFailed(inner) => inner.root(),
            other => other,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<evcnet_api::Error> for CoreError {
    fn from(err: evcnet_api::Error) -> Self {
        match err {
            evcnet_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            evcnet_api::Error::SessionExpired => CoreError::AuthenticationFailed {
                message: "session expired and re-authentication did not help".into(),
            },
            evcnet_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(ToString::to_string)
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            evcnet_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            evcnet_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            evcnet_api::Error::Api { status, body } => CoreError::Api {
                message: format!("HTTP {status}: {body}"),
                status: Some(status),
            },
            evcnet_api::Error::MalformedResponse { message, body: _ } => {
                CoreError::MalformedResponse { message }
            }
        }
    }
}
