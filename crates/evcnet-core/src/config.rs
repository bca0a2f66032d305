// ── Runtime connection configuration ──
//
// Describes how to reach one EVC-net account and how often to poll it.
// Never touches disk: the CLI resolves profiles and credentials and hands
// a finished `EvcNetConfig` in.

use std::path::PathBuf;
use std::time::Duration;

use evcnet_api::session::DEFAULT_AUTH_BACKOFF;
use evcnet_api::{Credentials, TlsMode, TransportConfig};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::CoreError;

pub const DEFAULT_BASE_URL: &str = "https://50five-sbelux.evc-net.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(3);

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification.
    DangerAcceptInvalid,
}

/// Configuration for one portal account.
#[derive(Debug, Clone)]
pub struct EvcNetConfig {
    /// Portal base URL, e.g. `https://50five-sbelux.evc-net.com`.
    pub base_url: Url,
    pub username: String,
    pub password: SecretString,
    /// Card used to start sessions when none is given explicitly.
    pub card_id: Option<String>,
    /// Customer the sessions are billed to.
    pub customer_id: Option<String>,
    /// Lower bound on channels polled per spot.
    pub max_channels: usize,
    pub tls: TlsVerification,
    pub timeout: Duration,
    /// Period of the background refresh task.
    pub poll_interval: Duration,
    /// Minimum spacing between logins while the session is believed valid.
    pub auth_backoff: Duration,
    /// Wait between a command and the refresh that follows it.
    pub settle_delay: Duration,
}

impl EvcNetConfig {
    pub fn new(base_url: Url, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            base_url,
            username: username.into(),
            password,
            card_id: None,
            customer_id: None,
            max_channels: 1,
            tls: TlsVerification::default(),
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            auth_backoff: DEFAULT_AUTH_BACKOFF,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    /// Reject configurations the coordinator cannot run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        let invalid = |message: &str| {
            Err(CoreError::Config {
                message: message.to_owned(),
            })
        };

        if !matches!(self.base_url.scheme(), "http" | "https") {
            return invalid("base URL must use http or https");
        }
        if self.base_url.host_str().is_none_or(str::is_empty) {
            return invalid("base URL has no host");
        }
        if self.username.trim().is_empty() {
            return invalid("username must not be empty");
        }
        if self.password.expose_secret().is_empty() {
            return invalid("password must not be empty");
        }
        if self.max_channels == 0 {
            return invalid("max_channels must be at least 1");
        }
        if self.poll_interval.is_zero() {
            return invalid("poll interval must be greater than zero");
        }
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
            cookie_jar: None,
        }
        .with_cookie_jar()
    }

    /// Card id from config, ignoring blanks.
    pub(crate) fn configured_card(&self) -> Option<&str> {
        non_blank(self.card_id.as_deref())
    }

    pub(crate) fn configured_customer(&self) -> Option<&str> {
        non_blank(self.customer_id.as_deref())
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> EvcNetConfig {
        EvcNetConfig::new(
            Url::parse(DEFAULT_BASE_URL).unwrap(),
            "driver@example.com",
            SecretString::from("hunter2"),
        )
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = config();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.max_channels, 1);
        assert_eq!(cfg.poll_interval, Duration::from_secs(30));
        assert_eq!(cfg.settle_delay, Duration::from_secs(3));
    }

    #[test]
    fn rejects_zero_channels() {
        let mut cfg = config();
        cfg.max_channels = 0;
        assert!(matches!(cfg.validate(), Err(CoreError::Config { .. })));
    }

    #[test]
    fn rejects_blank_username_and_password() {
        let mut cfg = config();
        cfg.username = "  ".into();
        assert!(cfg.validate().is_err());

        let mut cfg = config();
        cfg.password = SecretString::from("");
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_non_http_urls() {
        let mut cfg = config();
        cfg.base_url = Url::parse("ftp://portal.example.com").unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn blank_card_id_counts_as_unset() {
        let mut cfg = config();
        cfg.card_id = Some("   ".into());
        assert_eq!(cfg.configured_card(), None);
        cfg.card_id = Some("CARD-1".into());
        assert_eq!(cfg.configured_card(), Some("CARD-1"));
    }
}
