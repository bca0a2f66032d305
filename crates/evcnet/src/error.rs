//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use evcnet_config::ConfigError;
use evcnet_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach EVC-net at {url}")]
    #[diagnostic(
        code(evcnet::connection_failed),
        help(
            "Check the portal URL and your network connection.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request to EVC-net timed out")]
    #[diagnostic(
        code(evcnet::timeout),
        help("Increase the timeout with --timeout or try again later.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(evcnet::auth_failed),
        help(
            "Verify your e-mail address and password.\n\
             Run: evcnet config set-password"
        )
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(evcnet::no_credentials),
        help(
            "Configure credentials with: evcnet config init\n\
             Or set EVCNET_USERNAME and EVCNET_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("Charging spot '{identifier}' not found")]
    #[diagnostic(
        code(evcnet::not_found),
        help("Run: evcnet spots to see your charging spots")
    )]
    SpotNotFound { identifier: String },

    #[error("No card id available to start charging on spot {spot}")]
    #[diagnostic(
        code(evcnet::missing_card),
        help("Pass --card, or set card_id in your profile.")
    )]
    MissingCardId { spot: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("EVC-net API error: {message}")]
    #[diagnostic(code(evcnet::api_error))]
    Api { message: String },

    #[error("Unexpected data from EVC-net: {message}")]
    #[diagnostic(code(evcnet::malformed_response))]
    MalformedResponse { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(evcnet::validation))]
    Validation { field: String, reason: String },

    #[error("Operation '{action}' requires confirmation")]
    #[diagnostic(
        code(evcnet::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(evcnet::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: evcnet config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(evcnet::no_config),
        help(
            "Create one with: evcnet config init\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {0}")]
    #[diagnostic(code(evcnet::config))]
    Config(String),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::SpotNotFound { .. } => exit_code::NOT_FOUND,
            Self::MissingCardId { .. }
            | Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::Timeout => Self::Timeout,
            CoreError::SpotNotFound { identifier } => Self::SpotNotFound { identifier },
            CoreError::MissingCardId { spot } => Self::MissingCardId {
                spot: spot.to_string(),
            },
            CoreError::MalformedResponse { message } => Self::MalformedResponse { message },
            // Report what actually broke the cycle.
            CoreError::UpdateFailed(inner) => Self::from(*inner),
            CoreError::Api { message, status } => Self::Api {
                message: match status {
                    Some(code) => format!("{message} (HTTP {code})"),
                    None => message,
                },
            },
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::ProfileNotFound { name } => Self::ProfileNotFound {
                name,
                available: "(none)".into(),
            },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_failures_report_their_cause() {
        let err = CliError::from(CoreError::UpdateFailed(Box::new(CoreError::Timeout)));
        assert_eq!(err.exit_code(), exit_code::TIMEOUT);

        let err = CliError::from(CoreError::UpdateFailed(Box::new(
            CoreError::AuthenticationFailed {
                message: "bad password".into(),
            },
        )));
        assert_eq!(err.exit_code(), exit_code::AUTH);
    }

    #[test]
    fn exit_codes_follow_error_kind() {
        let not_found = CliError::from(CoreError::SpotNotFound {
            identifier: "9".into(),
        });
        assert_eq!(not_found.exit_code(), exit_code::NOT_FOUND);

        let connection = CliError::from(CoreError::ConnectionFailed {
            url: "https://portal".into(),
            reason: "refused".into(),
        });
        assert_eq!(connection.exit_code(), exit_code::CONNECTION);

        let api = CliError::from(CoreError::Api {
            message: "boom".into(),
            status: Some(500),
        });
        assert_eq!(api.exit_code(), exit_code::GENERAL);
        assert!(api.to_string().contains("HTTP 500"));

        let missing = CliError::from(ConfigError::NoCredentials {
            profile: "home".into(),
        });
        assert_eq!(missing.exit_code(), exit_code::AUTH);
    }
}
