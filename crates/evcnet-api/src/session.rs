// Session authentication
//
// Classic POST/redirect/cookie login against the portal's PHP backend.
// A 302 from `/Login/Login` is the only success signal; the session id
// arrives as a `PHPSESSID` cookie, either on the 302 itself or on the
// page it redirects to. All session state lives behind one async mutex,
// held across the login exchange, so at most one login is in flight.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, LOCATION, SET_COOKIE};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info};
use url::Url;

use crate::error::{BODY_PREVIEW_LEN, Error, truncate};

/// PHP session cookie carrying the authenticated session.
pub const SESSION_COOKIE: &str = "PHPSESSID";

/// Load-balancer stickiness cookie. Optional; forwarded when present.
pub const ROUTE_COOKIE: &str = "SERVERID";

pub const LOGIN_PATH: &str = "/Login/Login";

/// Minimum spacing between logins while a session is believed valid.
pub const DEFAULT_AUTH_BACKOFF: Duration = Duration::from_secs(30);

/// Portal login credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

/// Session cookie values captured at login.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
    session: String,
    route: Option<String>,
}

impl SessionToken {
    pub fn new(session: impl Into<String>, route: Option<String>) -> Self {
        Self {
            session: session.into(),
            route,
        }
    }

    /// Value for the `Cookie` request header.
    pub fn cookie_header(&self) -> String {
        match &self.route {
            Some(route) => format!("{SESSION_COOKIE}={}; {ROUTE_COOKIE}={route}", self.session),
            None => format!("{SESSION_COOKIE}={}", self.session),
        }
    }

    /// First few characters of the session id, for logs.
    pub fn redacted(&self) -> String {
        let prefix: String = self.session.chars().take(6).collect();
        format!("{prefix}...")
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("session", &self.redacted())
            .field("route", &self.route.is_some())
            .finish()
    }
}

#[derive(Debug, Default)]
struct SessionState {
    token: Option<SessionToken>,
    authenticated: bool,
    last_attempt: Option<Instant>,
}

/// Owns the portal session and serializes logins.
///
/// [`authenticate`](Self::authenticate) is idempotent and safe to call
/// from any number of tasks: callers that queue up behind an in-flight
/// login get that login's outcome without a second network exchange,
/// and a session younger than the backoff window is reused as-is.
pub struct Authenticator {
    http: reqwest::Client,
    cookie_jar: Option<Arc<Jar>>,
    base_url: Url,
    credentials: Credentials,
    backoff: Duration,
    state: Mutex<SessionState>,
    /// Bumped once per completed login attempt.
    generation: AtomicU64,
}

impl Authenticator {
    /// `cookie_jar` should be the jar installed in `http`, if any; it is
    /// consulted when the login response itself carries no session cookie.
    pub fn new(
        http: reqwest::Client,
        cookie_jar: Option<Arc<Jar>>,
        base_url: Url,
        credentials: Credentials,
    ) -> Self {
        Self {
            http,
            cookie_jar,
            base_url,
            credentials,
            backoff: DEFAULT_AUTH_BACKOFF,
            state: Mutex::new(SessionState::default()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    /// Number of login attempts completed so far.
    pub fn attempts(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Log in unless a fresh session already exists.
    ///
    /// Returns `false` on any failure; the reason is logged.
    pub async fn authenticate(&self) -> bool {
        let seen = self.generation.load(Ordering::Acquire);
        let mut state = self.state.lock().await;

        if self.generation.load(Ordering::Acquire) != seen {
            debug!(
                authenticated = state.authenticated,
                "joined a login that completed while waiting"
            );
            return state.authenticated;
        }

        if state.authenticated
            && state
                .last_attempt
                .is_some_and(|at| at.elapsed() < self.backoff)
        {
            debug!("session is fresh, skipping login");
            return true;
        }

        let outcome = match self.login().await {
            Ok(token) => {
                info!(user = %self.credentials.username, "authenticated with EVC-net");
                debug!(session = %token.redacted(), "session cookie captured");
                state.token = Some(token);
                state.authenticated = true;
                true
            }
            Err(e) => {
                error!(error = %e, "authentication failed");
                state.token = None;
                state.authenticated = false;
                false
            }
        };

        state.last_attempt = Some(Instant::now());
        self.generation.fetch_add(1, Ordering::AcqRel);
        outcome
    }

    /// The current session, if authenticated.
    pub async fn session(&self) -> Option<SessionToken> {
        let state = self.state.lock().await;
        if state.authenticated {
            state.token.clone()
        } else {
            None
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.lock().await.authenticated
    }

    /// Mark the session as expired.
    ///
    /// Only takes effect if `used` is still the current session; a request
    /// that raced a newer login must not throw that login away.
    pub async fn invalidate(&self, used: &SessionToken) {
        let mut state = self.state.lock().await;
        if state.token.as_ref() == Some(used) {
            debug!(session = %used.redacted(), "session invalidated");
            state.authenticated = false;
        } else {
            debug!("session already replaced, keeping the newer one");
        }
    }

    // ── Login exchange ───────────────────────────────────────────────

    async fn login(&self) -> Result<SessionToken, Error> {
        let url = endpoint_url(&self.base_url, LOGIN_PATH)?;
        debug!("logging in at {}", url);

        let form = [
            ("emailField", self.credentials.username.as_str()),
            ("passwordField", self.credentials.password.expose_secret()),
        ];

        let resp = self.http.post(url.clone()).form(&form).send().await?;
        let status = resp.status();
        debug!(%status, "login response");

        if status != StatusCode::FOUND {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!(
                    "login failed (HTTP {status}, expected 302): {}",
                    truncate(&body, BODY_PREVIEW_LEN)
                ),
            });
        }

        if let Some(token) = self.extract_token(resp.headers()) {
            return Ok(token);
        }

        // Some deployments only set the cookie on the redirect target.
        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Error::Authentication {
                message: format!("no {SESSION_COOKIE} cookie and no redirect target on login"),
            })?;
        let target = url.join(location)?;
        debug!("no session cookie on login response, fetching {}", target);

        let follow = self.http.get(target).send().await?;
        self.extract_token(follow.headers())
            .ok_or_else(|| Error::Authentication {
                message: format!("no {SESSION_COOKIE} cookie found after login redirect"),
            })
    }

    /// Look for the session cookies in `Set-Cookie` headers, then in the jar.
    fn extract_token(&self, headers: &HeaderMap) -> Option<SessionToken> {
        let set_cookies: Vec<&str> = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|c| c.split(';').next())
            .map(str::trim)
            .collect();

        let jar_header = self
            .cookie_jar
            .as_ref()
            .and_then(|jar| jar.cookies(&self.base_url))
            .and_then(|v| v.to_str().ok().map(String::from));
        let jar_cookies: Vec<&str> = jar_header
            .as_deref()
            .map(|h| h.split(';').map(str::trim).collect())
            .unwrap_or_default();

        let session = find_cookie(&set_cookies, SESSION_COOKIE)
            .or_else(|| find_cookie(&jar_cookies, SESSION_COOKIE))?;
        let route = find_cookie(&set_cookies, ROUTE_COOKIE)
            .or_else(|| find_cookie(&jar_cookies, ROUTE_COOKIE));

        Some(SessionToken { session, route })
    }
}

/// Find a non-empty cookie value among `name=value` pairs.
fn find_cookie(pairs: &[&str], name: &str) -> Option<String> {
    pairs.iter().find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key.trim() == name && !value.trim().is_empty()).then(|| value.trim().to_owned())
    })
}

/// Join a portal path onto the configured base URL.
///
/// The base may carry a trailing slash or a path prefix; both are kept.
pub(crate) fn endpoint_url(base: &Url, path: &str) -> Result<Url, Error> {
    let base = base.as_str().trim_end_matches('/');
    Ok(Url::parse(&format!("{base}{path}"))?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn find_cookie_picks_named_value() {
        let pairs = ["lang=en", "PHPSESSID=abc123", "SERVERID=node2"];
        assert_eq!(find_cookie(&pairs, SESSION_COOKIE).as_deref(), Some("abc123"));
        assert_eq!(find_cookie(&pairs, ROUTE_COOKIE).as_deref(), Some("node2"));
        assert_eq!(find_cookie(&pairs, "missing"), None);
    }

    #[test]
    fn find_cookie_ignores_deleted_values() {
        let pairs = ["PHPSESSID=", "PHPSESSID=real"];
        assert_eq!(find_cookie(&pairs, SESSION_COOKIE).as_deref(), Some("real"));
    }

    #[test]
    fn cookie_header_includes_route_when_present() {
        let token = SessionToken::new("abc", None);
        assert_eq!(token.cookie_header(), "PHPSESSID=abc");

        let token = SessionToken::new("abc", Some("node1".into()));
        assert_eq!(token.cookie_header(), "PHPSESSID=abc; SERVERID=node1");
    }

    #[test]
    fn debug_output_never_shows_the_full_session() {
        let token = SessionToken::new("supersecretsessionid", None);
        let dbg = format!("{token:?}");
        assert!(!dbg.contains("supersecretsessionid"));
        assert!(dbg.contains("supers..."));
    }

    #[test]
    fn endpoint_url_handles_trailing_slash_and_prefix() {
        let base = Url::parse("https://portal.example.com/").unwrap();
        assert_eq!(
            endpoint_url(&base, LOGIN_PATH).unwrap().as_str(),
            "https://portal.example.com/Login/Login"
        );

        let base = Url::parse("https://portal.example.com/evc").unwrap();
        assert_eq!(
            endpoint_url(&base, "/api/ajax").unwrap().as_str(),
            "https://portal.example.com/evc/api/ajax"
        );
    }
}
