//! Shared configuration for evcnet.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext), and
//! translation to `evcnet_core::EvcNetConfig`. The CLI layers its
//! command-line overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use evcnet_core::{DEFAULT_BASE_URL, EvcNetConfig, TlsVerification};

/// Keyring service name; entries are keyed `<profile>/password`.
pub const KEYRING_SERVICE: &str = "evcnet";

pub const PASSWORD_ENV: &str = "EVCNET_PASSWORD";
pub const USERNAME_ENV: &str = "EVCNET_USERNAME";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found in config")]
    ProfileNotFound { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named account profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use when none is given.
    pub fn active_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or("default")
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Polling period in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            poll_interval: default_poll_interval(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_poll_interval() -> u64 {
    30
}

/// A named portal account.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Profile {
    /// Portal base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Login e-mail address.
    pub username: Option<String>,

    /// Password (plaintext; prefer keyring or env var).
    pub password: Option<String>,

    /// Card used to start charging sessions.
    pub card_id: Option<String>,

    /// Customer the sessions are billed to.
    pub customer_id: Option<String>,

    /// Minimum number of channels polled per spot.
    pub max_channels: Option<usize>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Skip TLS verification.
    pub insecure: Option<bool>,

    /// Override request timeout (seconds).
    pub timeout: Option<u64>,

    /// Override polling period (seconds).
    pub poll_interval: Option<u64>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            username: None,
            password: None,
            card_id: None,
            customer_id: None,
            max_channels: None,
            ca_cert: None,
            insecure: None,
            timeout: None,
            poll_interval: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "evcnet", "evcnet").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("evcnet");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields defaults.
///
/// Environment keys use `__` for nesting: `EVCNET_DEFAULTS__TIMEOUT=60`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("EVCNET_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(&config_path(), cfg)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Login name from the profile, else `EVCNET_USERNAME`.
pub fn resolve_username(profile: &Profile, profile_name: &str) -> Result<String, ConfigError> {
    profile
        .username
        .clone()
        .or_else(|| std::env::var(USERNAME_ENV).ok())
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })
}

/// Password from `EVCNET_PASSWORD`, then the OS keyring, then plaintext.
pub fn resolve_password(
    profile: &Profile,
    profile_name: &str,
) -> Result<SecretString, ConfigError> {
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(pw));
    }

    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name)) {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a profile's password in the OS keyring.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name))?;
    entry.set_password(password)?;
    Ok(())
}

fn keyring_user(profile_name: &str) -> String {
    format!("{profile_name}/password")
}

// ── Translation to core config ──────────────────────────────────────

/// Build an `EvcNetConfig` from a profile, resolving credentials.
pub fn profile_to_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<EvcNetConfig, ConfigError> {
    let username = resolve_username(profile, profile_name)?;
    let password = resolve_password(profile, profile_name)?;
    build_config(profile, defaults, username, password)
}

/// Build an `EvcNetConfig` from a profile and already-resolved credentials.
pub fn build_config(
    profile: &Profile,
    defaults: &Defaults,
    username: String,
    password: SecretString,
) -> Result<EvcNetConfig, ConfigError> {
    let base_url: url::Url = profile
        .base_url
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "base_url".into(),
            reason: format!("invalid URL: {}", profile.base_url),
        })?;

    let max_channels = profile.max_channels.unwrap_or(1);
    if max_channels == 0 {
        return Err(ConfigError::Validation {
            field: "max_channels".into(),
            reason: "must be at least 1".into(),
        });
    }

    let tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let mut config = EvcNetConfig::new(base_url, username, password);
    config.card_id.clone_from(&profile.card_id);
    config.customer_id.clone_from(&profile.customer_id);
    config.max_channels = max_channels;
    config.tls = tls;
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.poll_interval =
        Duration::from_secs(profile.poll_interval.unwrap_or(defaults.poll_interval));
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    fn sample() -> Config {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "home".into(),
            Profile {
                username: Some("driver@example.com".into()),
                card_id: Some("CARD-1".into()),
                max_channels: Some(2),
                ..Profile::default()
            },
        );
        cfg.default_profile = Some("home".into());
        cfg
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        save_config_to(&path, &sample()).unwrap();
        let loaded = load_config_from(&path).unwrap();

        assert_eq!(loaded.active_profile_name(), "home");
        let profile = &loaded.profiles["home"];
        assert_eq!(profile.base_url, DEFAULT_BASE_URL);
        assert_eq!(profile.card_id.as_deref(), Some("CARD-1"));
        assert_eq!(profile.max_channels, Some(2));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded.defaults, Defaults::default());
        assert!(loaded.profiles.is_empty());
    }

    #[test]
    fn profile_fields_parse_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "work"

[defaults]
timeout = 10

[profiles.work]
base_url = "https://portal.example.com"
username = "fleet@example.com"
customer_id = "42"
poll_interval = 120
insecure = true
"#,
        )
        .unwrap();

        let loaded = load_config_from(&path).unwrap();
        let work = &loaded.profiles["work"];
        assert_eq!(loaded.defaults.timeout, 10);
        assert_eq!(work.base_url, "https://portal.example.com");
        assert_eq!(work.customer_id.as_deref(), Some("42"));

        let cfg = build_config(
            work,
            &loaded.defaults,
            "fleet@example.com".into(),
            SecretString::from("pw"),
        )
        .unwrap();
        assert_eq!(cfg.timeout, Duration::from_secs(10));
        assert_eq!(cfg.poll_interval, Duration::from_secs(120));
        assert_eq!(cfg.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(cfg.password.expose_secret(), "pw");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn build_config_rejects_bad_url_and_zero_channels() {
        let defaults = Defaults::default();
        let bad_url = Profile {
            base_url: "not a url".into(),
            ..Profile::default()
        };
        assert!(matches!(
            build_config(&bad_url, &defaults, "u".into(), SecretString::from("p")),
            Err(ConfigError::Validation { .. })
        ));

        let zero = Profile {
            max_channels: Some(0),
            ..Profile::default()
        };
        assert!(build_config(&zero, &defaults, "u".into(), SecretString::from("p")).is_err());
    }

    #[test]
    fn build_config_carries_ids_and_defaults() {
        let profile = &sample().profiles["home"];
        let cfg = build_config(
            profile,
            &Defaults::default(),
            "driver@example.com".into(),
            SecretString::from("pw"),
        )
        .unwrap();
        assert_eq!(cfg.card_id.as_deref(), Some("CARD-1"));
        assert_eq!(cfg.max_channels, 2);
        assert_eq!(cfg.tls, TlsVerification::SystemDefaults);
        assert_eq!(cfg.timeout, Duration::from_secs(30));
    }
}
