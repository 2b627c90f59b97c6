//! [`AutomationDriver`] implementation backed by a W3C WebDriver endpoint.
//!
//! This module provides [`WebDriverDriver`], which implements the
//! [`AutomationDriver`] trait by issuing WebDriver commands through a
//! [`WebDriverClient`]. It targets Appium servers driving an Android device,
//! but only uses the standard W3C command set plus Appium's locator
//! strategies.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use droidcheck_core::driver::AutomationDriver;
//! use droidcheck_core::element::Locator;
//! use droidcheck_core::webdriver_driver::WebDriverDriver;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut driver = WebDriverDriver::new("http://127.0.0.1:4723/wd/hub", Duration::from_secs(30));
//! driver.connect().await?;
//! driver.set_implicit_wait(Duration::from_secs(30)).await?;
//!
//! let fab = driver.find_element(&Locator::id("com.amazon.devicefarm:id/fab")).await?;
//! driver.click(&fab).await?;
//! driver.quit().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::driver::{AutomationDriver, DriverError};
use crate::element::{ElementRef, Locator, Rect};
use crate::protocol::{
    actions_body, decode_attribute, decode_element_id, decode_rect, decode_text,
    find_element_body, implicit_wait_body, send_keys_body, NO_SUCH_ELEMENT,
};
use crate::touch::TouchSequence;
use crate::webdriver_client::{WebDriverClient, WebDriverClientError};

/// Extra time granted to each HTTP request beyond the implicit wait.
const COMMAND_GRACE: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Maps a [`WebDriverClientError`] to a [`DriverError`].
fn map_client_error(err: WebDriverClientError) -> DriverError {
    match err {
        WebDriverClientError::NotConnected => DriverError::NotConnected,
        WebDriverClientError::InvalidUrl(reason) => DriverError::InvalidUrl {
            url: reason.split(": ").next().unwrap_or_default().to_string(),
            reason,
        },
        WebDriverClientError::ConnectionFailed(msg) => DriverError::ConnectionFailed(msg),
        WebDriverClientError::Timeout => DriverError::Timeout,
        WebDriverClientError::Http(msg) => DriverError::Http(msg),
        WebDriverClientError::Protocol(e) => DriverError::JsonParse(e.to_string()),
        WebDriverClientError::Remote { error, message, .. } => DriverError::Remote { error, message },
    }
}

/// Like [`map_client_error`], but reads a `no such element` answer as a
/// lookup miss for `locator`.
fn map_lookup_error(err: WebDriverClientError, locator: &Locator) -> DriverError {
    match err {
        WebDriverClientError::Remote { ref error, .. } if error == NO_SUCH_ELEMENT => {
            DriverError::ElementNotFound(locator.clone())
        }
        other => map_client_error(other),
    }
}

// ---------------------------------------------------------------------------
// WebDriverDriver
// ---------------------------------------------------------------------------

/// An [`AutomationDriver`] backed by a WebDriver session.
///
/// The driver holds the endpoint URL and lazily creates a
/// [`WebDriverClient`] when [`connect`](AutomationDriver::connect) is called.
/// The client is wrapped in a [`tokio::sync::Mutex`] so that
/// [`quit`](AutomationDriver::quit) can take it out through `&self`.
pub struct WebDriverDriver {
    endpoint: String,
    request_timeout: Duration,
    client: Mutex<Option<WebDriverClient>>,
}

impl WebDriverDriver {
    /// Creates a driver for the given endpoint.
    ///
    /// `implicit_wait` sizes the per-request HTTP timeout; the wait itself is
    /// applied with [`set_implicit_wait`](AutomationDriver::set_implicit_wait).
    /// No connection is established until [`connect`](AutomationDriver::connect).
    pub fn new(endpoint: impl Into<String>, implicit_wait: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            request_timeout: implicit_wait.saturating_add(COMMAND_GRACE),
            client: Mutex::new(None),
        }
    }

    async fn get(&self, path: &str) -> Result<Value, WebDriverClientError> {
        let guard = self.client.lock().await;
        let client = guard.as_ref().ok_or(WebDriverClientError::NotConnected)?;
        client.get(path).await
    }

    async fn post(&self, path: &str, payload: &Value) -> Result<Value, WebDriverClientError> {
        let guard = self.client.lock().await;
        let client = guard.as_ref().ok_or(WebDriverClientError::NotConnected)?;
        client.post(path, payload).await
    }
}

#[async_trait]
impl AutomationDriver for WebDriverDriver {
    #[instrument(skip(self), fields(endpoint = %self.endpoint), level = "debug")]
    async fn connect(&mut self) -> Result<(), DriverError> {
        let mut client =
            WebDriverClient::new(&self.endpoint, self.request_timeout).map_err(|e| match e {
                WebDriverClientError::InvalidUrl(reason) => DriverError::InvalidUrl {
                    url: self.endpoint.clone(),
                    reason,
                },
                other => DriverError::ConnectionFailed(other.to_string()),
            })?;

        client.create_session().await.map_err(|e| match e {
            WebDriverClientError::Remote { error, message, .. } => {
                DriverError::ConnectionFailed(format!("session not created: {error}: {message}"))
            }
            WebDriverClientError::Timeout => {
                DriverError::ConnectionFailed("timed out creating session".to_string())
            }
            WebDriverClientError::Http(msg) => DriverError::ConnectionFailed(msg),
            other => map_client_error(other),
        })?;

        *self.client.lock().await = Some(client);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.client
            .try_lock()
            .map(|g| g.as_ref().is_some_and(|c| c.session_id().is_some()))
            .unwrap_or(false)
    }

    #[instrument(skip(self), level = "debug")]
    async fn set_implicit_wait(&self, wait: Duration) -> Result<(), DriverError> {
        self.post("timeouts", &implicit_wait_body(wait))
            .await
            .map_err(map_client_error)?;
        Ok(())
    }

    #[instrument(skip(self), fields(locator = %locator), level = "debug")]
    async fn find_element(&self, locator: &Locator) -> Result<ElementRef, DriverError> {
        let value = self
            .post("element", &find_element_body(locator))
            .await
            .map_err(|e| map_lookup_error(e, locator))?;
        let id = decode_element_id(&value).map_err(|e| DriverError::JsonParse(e.to_string()))?;
        debug!(element_id = %id, "element found");
        Ok(ElementRef::new(id, locator.clone()))
    }

    async fn element_text(&self, element: &ElementRef) -> Result<String, DriverError> {
        let value = self
            .get(&format!("element/{}/text", element.id))
            .await
            .map_err(map_client_error)?;
        decode_text(&value).map_err(|e| DriverError::JsonParse(e.to_string()))
    }

    async fn element_attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        let value = self
            .get(&format!("element/{}/attribute/{}", element.id, name))
            .await
            .map_err(map_client_error)?;
        Ok(decode_attribute(&value))
    }

    async fn element_rect(&self, element: &ElementRef) -> Result<Rect, DriverError> {
        let value = self
            .get(&format!("element/{}/rect", element.id))
            .await
            .map_err(map_client_error)?;
        decode_rect(&value).map_err(|e| DriverError::JsonParse(e.to_string()))
    }

    #[instrument(skip(self), fields(element = %element.id), level = "debug")]
    async fn click(&self, element: &ElementRef) -> Result<(), DriverError> {
        self.post(&format!("element/{}/click", element.id), &json!({}))
            .await
            .map_err(map_client_error)?;
        Ok(())
    }

    #[instrument(skip(self, text), fields(element = %element.id), level = "debug")]
    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<(), DriverError> {
        self.post(&format!("element/{}/value", element.id), &send_keys_body(text))
            .await
            .map_err(map_client_error)?;
        Ok(())
    }

    #[instrument(skip(self, sequence), fields(steps = sequence.steps().len()), level = "debug")]
    async fn perform_touch(&self, sequence: &TouchSequence) -> Result<(), DriverError> {
        self.post("actions", &actions_body(sequence))
            .await
            .map_err(map_client_error)?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn quit(&self) -> Result<(), DriverError> {
        let mut guard = self.client.lock().await;
        let mut client = guard.take().ok_or(DriverError::NotConnected)?;
        client.delete_session().await.map_err(map_client_error)
    }
}
