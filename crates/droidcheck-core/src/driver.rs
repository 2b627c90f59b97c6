//! Automation driver trait for backend-agnostic UI automation.
//!
//! This module defines the [`AutomationDriver`] trait, the narrow set of
//! remote operations the harness needs: session setup and teardown, element
//! lookup, text and attribute reads, clicks, key input, and the low-level
//! touch-sequence primitive. The scenario runner and gesture synthesizer only
//! ever talk to this trait, so they work the same against the WebDriver
//! backend ([`WebDriverDriver`](crate::webdriver_driver::WebDriverDriver)) and
//! against in-process fakes in tests.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::element::{ElementRef, Locator, Rect};
use crate::touch::TouchSequence;

/// Errors that can occur during automation driver operations.
///
/// This enum unifies errors from all backends behind a single type,
/// allowing consumers to handle errors uniformly regardless of the
/// underlying automation backend.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The endpoint could not be reached or refused to create a session.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The endpoint URL could not be parsed.
    #[error("Invalid endpoint URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// No element matched the locator within the implicit wait.
    #[error("No element found for {0}")]
    ElementNotFound(Locator),

    /// The endpoint rejected a command.
    #[error("Remote error '{error}': {message}")]
    Remote { error: String, message: String },

    /// No session is open.
    #[error("Not connected to automation endpoint")]
    NotConnected,

    /// A request exceeded its deadline.
    #[error("Operation timed out")]
    Timeout,

    /// An HTTP transport error that is not a connect failure or timeout.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Failed to interpret a response payload.
    #[error("JSON parse error: {0}")]
    JsonParse(String),
}

impl DriverError {
    /// Returns true for errors that mean no session could be established.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            DriverError::ConnectionFailed(_) | DriverError::InvalidUrl { .. }
        )
    }
}

/// Trait for backend-agnostic Android UI automation.
///
/// Element lookups block on the remote side until the element appears or the
/// implicit wait elapses, then fail with [`DriverError::ElementNotFound`].
///
/// All methods are async; the harness awaits them one at a time, so
/// implementors need not support concurrent commands beyond being
/// `Send + Sync`.
#[async_trait]
pub trait AutomationDriver: Send + Sync {
    /// Open a session against the backend.
    ///
    /// Must be called once before any other command.
    async fn connect(&mut self) -> Result<(), DriverError>;

    /// Check if a session is open.
    fn is_connected(&self) -> bool;

    /// Bound every subsequent lookup by `wait`.
    async fn set_implicit_wait(&self, wait: Duration) -> Result<(), DriverError>;

    /// Resolve a single element.
    async fn find_element(&self, locator: &Locator) -> Result<ElementRef, DriverError>;

    /// The element's visible text.
    async fn element_text(&self, element: &ElementRef) -> Result<String, DriverError>;

    /// An element attribute, or `None` if the element has no such attribute.
    async fn element_attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, DriverError>;

    /// The element's current on-screen bounding box.
    async fn element_rect(&self, element: &ElementRef) -> Result<Rect, DriverError>;

    /// Click (tap) the element.
    async fn click(&self, element: &ElementRef) -> Result<(), DriverError>;

    /// Type text into the element.
    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<(), DriverError>;

    /// Deliver a touch sequence as one atomic gesture.
    async fn perform_touch(&self, sequence: &TouchSequence) -> Result<(), DriverError>;

    /// Close the session.
    async fn quit(&self) -> Result<(), DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::ConnectionFailed("refused".to_string());
        assert!(err.to_string().contains("refused"));

        let err = DriverError::ElementNotFound(Locator::id("fab"));
        assert!(err.to_string().contains("id 'fab'"));

        let err = DriverError::Remote {
            error: "stale element reference".to_string(),
            message: "gone".to_string(),
        };
        assert!(err.to_string().contains("stale element reference"));

        let err = DriverError::NotConnected;
        assert!(err.to_string().contains("Not connected"));

        let err = DriverError::Timeout;
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_connection_error_classification() {
        assert!(DriverError::ConnectionFailed("x".into()).is_connection_error());
        assert!(DriverError::InvalidUrl {
            url: "nope".into(),
            reason: "relative URL without a base".into(),
        }
        .is_connection_error());
        assert!(!DriverError::ElementNotFound(Locator::id("x")).is_connection_error());
        assert!(!DriverError::Timeout.is_connection_error());
    }
}
