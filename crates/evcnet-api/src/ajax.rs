// AJAX request engine
//
// Every data call is a single `POST /api/ajax` whose form field `requests`
// holds a JSON object of indexed sub-requests. The backend answers an
// expired session with its login page (HTML, status 200) or a redirect,
// never with a JSON error, so the body has to be sniffed before parsing.

use reqwest::StatusCode;
use reqwest::header::COOKIE;
use serde_json::{Map, Value};
use tracing::{debug, error, warn};
use url::Url;

use crate::error::{BODY_PREVIEW_LEN, Error, truncate};
use crate::session::{Authenticator, Credentials, SessionToken, endpoint_url};
use crate::transport::TransportConfig;

pub const AJAX_PATH: &str = "/api/ajax";

/// Initial attempt plus one retry after re-authentication.
pub const MAX_ATTEMPTS: u32 = 2;

/// One backend procedure call: a handler class, a method on it, and its
/// parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct AjaxCall {
    pub handler: String,
    pub method: String,
    pub params: Value,
}

impl AjaxCall {
    pub fn new(handler: impl Into<String>, method: impl Into<String>, params: Value) -> Self {
        Self {
            handler: handler.into(),
            method: method.into(),
            params,
        }
    }
}

/// An ordered set of calls sent in one request.
///
/// Serializes as `{"0": {...}, "1": {...}}`; the response is a JSON array
/// with one element per call, in the same order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AjaxBatch {
    calls: Vec<AjaxCall>,
}

impl AjaxBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(call: AjaxCall) -> Self {
        Self { calls: vec![call] }
    }

    pub fn push(mut self, call: AjaxCall) -> Self {
        self.calls.push(call);
        self
    }

    pub fn calls(&self) -> &[AjaxCall] {
        &self.calls
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// The indexed envelope sent as the `requests` form field.
    pub fn to_value(&self) -> Value {
        let mut envelope = Map::new();
        for (idx, call) in self.calls.iter().enumerate() {
            let mut entry = Map::new();
            entry.insert("handler".into(), Value::String(call.handler.clone()));
            entry.insert("method".into(), Value::String(call.method.clone()));
            entry.insert("params".into(), call.params.clone());
            envelope.insert(idx.to_string(), Value::Object(entry));
        }
        Value::Object(envelope)
    }
}

/// How a single HTTP exchange ended, short of a hard failure.
enum Reply {
    Json(Value),
    Expired { status: StatusCode, reason: &'static str },
}

/// Authenticated client for the portal's AJAX endpoint.
///
/// Owns the [`Authenticator`] and the shared `reqwest::Client`. A call
/// that hits an expired session is retried once after a fresh login; a
/// second expiry is terminal.
pub struct AjaxClient {
    http: reqwest::Client,
    auth: Authenticator,
    ajax_url: Url,
}

impl AjaxClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// If the config doesn't already include a cookie jar, one is created
    /// (the login flow may only expose the session cookie through it).
    pub fn new(
        base_url: Url,
        credentials: Credentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let config = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let cookie_jar = config.cookie_jar.clone();
        let http = config.build_client()?;
        let ajax_url = endpoint_url(&base_url, AJAX_PATH)?;
        let auth = Authenticator::new(http.clone(), cookie_jar, base_url, credentials);
        Ok(Self {
            http,
            auth,
            ajax_url,
        })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    ///
    /// The client must not follow redirects, or logins will never see
    /// their 302.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        credentials: Credentials,
    ) -> Result<Self, Error> {
        let ajax_url = endpoint_url(&base_url, AJAX_PATH)?;
        let auth = Authenticator::new(http.clone(), None, base_url, credentials);
        Ok(Self {
            http,
            auth,
            ajax_url,
        })
    }

    pub fn with_auth_backoff(mut self, backoff: std::time::Duration) -> Self {
        self.auth = self.auth.with_backoff(backoff);
        self
    }

    pub fn auth(&self) -> &Authenticator {
        &self.auth
    }

    pub fn base_url(&self) -> &Url {
        self.auth.base_url()
    }

    /// Send a batch and return the parsed JSON response.
    pub async fn request(&self, batch: &AjaxBatch) -> Result<Value, Error> {
        let body = batch.to_value().to_string();

        for attempt in 1..=MAX_ATTEMPTS {
            let token = self.ensure_session().await?;

            match self.send(&body, &token).await? {
                Reply::Json(value) => return Ok(value),
                Reply::Expired { status, reason } if attempt == MAX_ATTEMPTS => {
                    warn!(
                        %status,
                        reason,
                        attempt,
                        "session still expired after re-authentication"
                    );
                    return Err(Error::SessionExpired);
                }
                Reply::Expired { status, reason } => {
                    warn!(%status, reason, "session likely expired, re-authenticating");
                    self.auth.invalidate(&token).await;
                    if !self.auth.authenticate().await {
                        return Err(Error::Authentication {
                            message: "re-authentication failed".into(),
                        });
                    }
                }
            }
        }

        Err(Error::SessionExpired)
    }

    async fn ensure_session(&self) -> Result<SessionToken, Error> {
        if let Some(token) = self.auth.session().await {
            return Ok(token);
        }
        if !self.auth.authenticate().await {
            return Err(Error::Authentication {
                message: "could not log in to EVC-net".into(),
            });
        }
        self.auth.session().await.ok_or_else(|| Error::Authentication {
            message: "session was dropped right after login".into(),
        })
    }

    async fn send(&self, body: &str, token: &SessionToken) -> Result<Reply, Error> {
        debug!("POST {}", self.ajax_url);

        let resp = self
            .http
            .post(self.ajax_url.clone())
            .header(COOKIE, token.cookie_header())
            .form(&[("requests", body)])
            .send()
            .await?;

        let status = resp.status();
        match status {
            StatusCode::OK => {
                let text = resp.text().await?;
                let trimmed = text.trim();
                if !(trimmed.starts_with('[') || trimmed.starts_with('{')) {
                    return Ok(Reply::Expired {
                        status,
                        reason: "received HTML instead of JSON",
                    });
                }
                serde_json::from_str(trimmed).map(Reply::Json).map_err(|e| {
                    error!(
                        %status,
                        body = truncate(&text, BODY_PREVIEW_LEN),
                        "failed to decode JSON response"
                    );
                    Error::malformed(format!("invalid JSON (HTTP {status}): {e}"), &text)
                })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FOUND => Ok(Reply::Expired {
                status,
                reason: "session rejected",
            }),
            _ => {
                let body = resp.text().await.unwrap_or_default();
                let body = truncate(&body, BODY_PREVIEW_LEN).to_owned();
                error!(%status, %body, "AJAX request failed");
                Err(Error::Api {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn batch_serializes_with_indexed_keys() {
        let batch = AjaxBatch::single(AjaxCall::new("H", "m", json!({"a": 1})))
            .push(AjaxCall::new("H2", "n", json!({})));

        assert_eq!(
            batch.to_value(),
            json!({
                "0": {"handler": "H", "method": "m", "params": {"a": 1}},
                "1": {"handler": "H2", "method": "n", "params": {}},
            })
        );
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn empty_batch_is_empty_object() {
        let batch = AjaxBatch::new();
        assert!(batch.is_empty());
        assert_eq!(batch.to_value(), json!({}));
    }
}
