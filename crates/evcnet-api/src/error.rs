use thiserror::Error;

/// Top-level error type for the `evcnet-api` crate.
///
/// Covers every failure mode of the portal client: login, transport,
/// unexpected HTTP statuses, and payloads that don't have the expected
/// shape. `evcnet-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed (bad credentials, no session cookie, host unreachable).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The session was still rejected after a fresh login and one retry.
    #[error("Session expired -- retry after re-authentication also failed")]
    SessionExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Portal ──────────────────────────────────────────────────────
    /// The AJAX endpoint answered with a status that is neither success
    /// nor a recognisable session expiry.
    #[error("Portal API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    // ── Data ────────────────────────────────────────────────────────
    /// The body was not valid JSON, or valid JSON of the wrong shape.
    /// `body` holds a truncated copy for debugging.
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error indicates the session is gone
    /// and a fresh login might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::SessionExpired)
    }

    /// Returns `true` if this is a transient error worth retrying later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub(crate) fn malformed(message: impl Into<String>, body: &str) -> Self {
        Self::MalformedResponse {
            message: message.into(),
            body: truncate(body, BODY_PREVIEW_LEN).to_owned(),
        }
    }
}

/// How much of a response body is kept in errors and logs.
pub(crate) const BODY_PREVIEW_LEN: usize = 200;

/// Cut `s` to at most `max` bytes without splitting a UTF-8 sequence.
pub(crate) fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello", 3), "hel");
        // 'é' is two bytes; cutting inside it backs off to the boundary.
        assert_eq!(truncate("aé", 2), "a");
    }

    #[test]
    fn auth_expired_classification() {
        assert!(Error::SessionExpired.is_auth_expired());
        assert!(
            Error::Authentication {
                message: "x".into()
            }
            .is_auth_expired()
        );
        assert!(
            !Error::Api {
                status: 500,
                body: String::new()
            }
            .is_auth_expired()
        );
    }

    #[test]
    fn server_errors_are_transient() {
        let err = Error::Api {
            status: 503,
            body: String::new(),
        };
        assert!(err.is_transient());
        let err = Error::Api {
            status: 404,
            body: String::new(),
        };
        assert!(!err.is_transient());
    }
}
