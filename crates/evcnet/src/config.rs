//! CLI configuration: thin wrapper around `evcnet_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (`--base-url`, `--username`, `--timeout`, ...).

use evcnet_core::EvcNetConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use evcnet_config::{Config, Profile, config_path, load_config_or_default, save_config};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| config.active_profile_name().to_owned())
}

/// Build an `EvcNetConfig` from the config file, active profile and flags.
///
/// Without a matching profile, `--username` (or `EVCNET_USERNAME`) is
/// enough to run against the default portal.
pub fn resolve(global: &GlobalOpts) -> Result<EvcNetConfig, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                available: available_profiles(&cfg),
                name: profile_name,
            });
        }
        None if global.username.is_some() => Profile::default(),
        None => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    apply_overrides(&mut profile, global);
    Ok(evcnet_config::profile_to_config(
        &profile,
        &profile_name,
        &cfg.defaults,
    )?)
}

/// Flags win over profile values.
fn apply_overrides(profile: &mut Profile, global: &GlobalOpts) {
    if let Some(ref url) = global.base_url {
        profile.base_url.clone_from(url);
    }
    if global.username.is_some() {
        profile.username.clone_from(&global.username);
    }
    if global.timeout.is_some() {
        profile.timeout = global.timeout;
    }
    if global.max_channels.is_some() {
        profile.max_channels = global.max_channels;
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
}

pub fn available_profiles(cfg: &Config) -> String {
    let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort();
    names.join(", ")
}
