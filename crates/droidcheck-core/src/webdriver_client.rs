//! Async HTTP client for a W3C WebDriver automation endpoint.
//!
//! This module provides [`WebDriverClient`], a low-level transport layer that
//! sends JSON commands to the endpoint and returns the decoded `value` of each
//! response, using the wire format defined in [`crate::protocol`]. It knows
//! nothing about locators or gestures; [`WebDriverDriver`] builds those on top.
//!
//! [`WebDriverDriver`]: crate::webdriver_driver::WebDriverDriver
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use droidcheck_core::webdriver_client::WebDriverClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = WebDriverClient::new("http://127.0.0.1:4723/wd/hub", Duration::from_secs(60))?;
//!
//! client.create_session().await?;
//! let title = client.get("element/42/text").await?;
//! client.delete_session().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use reqwest::{Method, Url};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};

use crate::protocol::{decode_remote_error, decode_session_id, new_session_body, ProtocolError};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Timeout for establishing a TCP connection to the endpoint.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur during endpoint communication.
#[derive(Error, Debug)]
pub enum WebDriverClientError {
    /// Attempted a session command without an open session.
    #[error("no open session")]
    NotConnected,

    /// The endpoint URL is malformed or not http(s).
    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(String),

    /// Failed to establish a connection.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// A request exceeded its timeout.
    #[error("request timed out")]
    Timeout,

    /// Any other HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The response could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The endpoint answered with an error object.
    #[error("remote error ({status}) '{error}': {message}")]
    Remote {
        status: u16,
        error: String,
        message: String,
    },
}

impl From<reqwest::Error> for WebDriverClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            WebDriverClientError::Timeout
        } else if err.is_connect() {
            WebDriverClientError::ConnectionFailed(err.to_string())
        } else {
            WebDriverClientError::Http(err.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// WebDriverClient
// ---------------------------------------------------------------------------

/// Async client for one WebDriver session.
///
/// Holds the validated endpoint base URL and, once
/// [`create_session`](Self::create_session) succeeds, the remote session id
/// that prefixes every session-scoped command.
#[derive(Debug)]
pub struct WebDriverClient {
    http: reqwest::Client,
    base: String,
    session_id: Option<String>,
}

impl WebDriverClient {
    /// Create a client for the given endpoint.
    ///
    /// The URL is validated eagerly; no request is made until
    /// [`create_session`](Self::create_session). `request_timeout` bounds each
    /// command and must exceed the implicit wait, since lookups block
    /// remotely for up to that long.
    pub fn new(endpoint: &str, request_timeout: Duration) -> Result<Self, WebDriverClientError> {
        let base = validate_endpoint(endpoint)?;
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| WebDriverClientError::Http(e.to_string()))?;

        Ok(Self {
            http,
            base,
            session_id: None,
        })
    }

    /// The open session id, if any.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Create a remote session with empty capabilities.
    pub async fn create_session(&mut self) -> Result<String, WebDriverClientError> {
        let url = format!("{}/session", self.base);
        debug!(%url, "creating session");

        let body = self.execute(Method::POST, url, Some(&new_session_body())).await?;
        let session_id = decode_session_id(&body)?;

        debug!(%session_id, "session created");
        self.session_id = Some(session_id.clone());
        Ok(session_id)
    }

    /// Delete the remote session. The client is unusable afterwards.
    pub async fn delete_session(&mut self) -> Result<(), WebDriverClientError> {
        let session_id = self
            .session_id
            .take()
            .ok_or(WebDriverClientError::NotConnected)?;
        let url = format!("{}/session/{}", self.base, session_id);
        debug!(%session_id, "deleting session");
        self.execute(Method::DELETE, url, None).await?;
        Ok(())
    }

    /// `GET /session/{id}/{path}`, returning the response `value`.
    pub async fn get(&self, path: &str) -> Result<Value, WebDriverClientError> {
        let url = self.session_url(path)?;
        let body = self.execute(Method::GET, url, None).await?;
        Ok(take_value(body))
    }

    /// `POST /session/{id}/{path}` with a JSON body, returning the response `value`.
    pub async fn post(&self, path: &str, payload: &Value) -> Result<Value, WebDriverClientError> {
        let url = self.session_url(path)?;
        let body = self.execute(Method::POST, url, Some(payload)).await?;
        Ok(take_value(body))
    }

    fn session_url(&self, path: &str) -> Result<String, WebDriverClientError> {
        let session_id = self
            .session_id
            .as_deref()
            .ok_or(WebDriverClientError::NotConnected)?;
        Ok(format!("{}/session/{}/{}", self.base, session_id, path))
    }

    /// Sends one request and returns the full response body.
    async fn execute(
        &self,
        method: Method,
        url: String,
        payload: Option<&Value>,
    ) -> Result<Value, WebDriverClientError> {
        trace!(%method, %url, "sending command");

        let mut request = self.http.request(method, url.as_str());
        if let Some(payload) = payload {
            request = request.json(payload);
        }
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        let body: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| {
                ProtocolError::InvalidPayload(format!("response is not JSON ({e}): {text}"))
            })?
        };

        if let Some(remote) = decode_remote_error(&body) {
            return Err(WebDriverClientError::Remote {
                status: status.as_u16(),
                error: remote.error,
                message: remote.message,
            });
        }
        if !status.is_success() {
            return Err(WebDriverClientError::Remote {
                status: status.as_u16(),
                error: "unknown error".to_string(),
                message: text,
            });
        }

        trace!(status = status.as_u16(), "command complete");
        Ok(body)
    }
}

/// Checks the endpoint is an absolute http(s) URL and strips a trailing slash.
fn validate_endpoint(endpoint: &str) -> Result<String, WebDriverClientError> {
    let url = Url::parse(endpoint)
        .map_err(|e| WebDriverClientError::InvalidUrl(format!("{endpoint}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(WebDriverClientError::InvalidUrl(format!(
            "{endpoint}: unsupported scheme '{}'",
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(WebDriverClientError::InvalidUrl(format!(
            "{endpoint}: missing host"
        )));
    }
    Ok(endpoint.trim_end_matches('/').to_string())
}

fn take_value(mut body: Value) -> Value {
    body.get_mut("value").map(Value::take).unwrap_or(Value::Null)
}
