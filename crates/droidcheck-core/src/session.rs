//! Session lifecycle for one harness run.
//!
//! A [`Session`] owns the connection to the automation endpoint for the whole
//! run. It is opened once before the first scenario, shared with every
//! scenario through the driver handle, and stopped exactly once afterwards.
//! [`Session::stop`] consumes the session, so a stopped session cannot be
//! used again.
//!
//! # Example
//!
//! ```no_run
//! use droidcheck_core::driver::AutomationDriver;
//! use droidcheck_core::session::{Session, SessionConfig};
//!
//! # async fn example() -> Result<(), droidcheck_core::driver::DriverError> {
//! let session = Session::start(SessionConfig::default()).await?;
//! let driver = session.driver();
//! assert!(driver.is_connected());
//! session.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::driver::{AutomationDriver, DriverError};
use crate::webdriver_driver::WebDriverDriver;

/// Default automation endpoint (a local Appium server).
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:4723/wd/hub";

/// Default implicit wait applied to every element lookup.
pub const DEFAULT_IMPLICIT_WAIT: Duration = Duration::from_secs(30);

/// Connection settings for a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// WebDriver endpoint base URL.
    pub endpoint: String,
    /// Upper bound for each element lookup, enforced by the endpoint.
    pub implicit_wait: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            implicit_wait: DEFAULT_IMPLICIT_WAIT,
        }
    }
}

/// A live connection to the automation endpoint.
pub struct Session {
    id: Uuid,
    started_at: DateTime<Utc>,
    config: SessionConfig,
    driver: Arc<dyn AutomationDriver>,
}

impl Session {
    /// Opens a WebDriver session with empty capabilities and applies the
    /// implicit wait.
    ///
    /// Fails with [`DriverError::ConnectionFailed`] if the endpoint cannot be
    /// reached and [`DriverError::InvalidUrl`] if the URL is malformed.
    pub async fn start(config: SessionConfig) -> Result<Self, DriverError> {
        let driver = WebDriverDriver::new(config.endpoint.clone(), config.implicit_wait);
        Self::from_driver(driver, config).await
    }

    /// Opens a session over an arbitrary driver.
    pub async fn from_driver<D>(mut driver: D, config: SessionConfig) -> Result<Self, DriverError>
    where
        D: AutomationDriver + 'static,
    {
        info!(endpoint = %config.endpoint, "starting session");
        driver.connect().await?;

        if let Err(e) = driver.set_implicit_wait(config.implicit_wait).await {
            warn!(error = %e, "failed to set implicit wait, closing session");
            if let Err(quit_err) = driver.quit().await {
                warn!(error = %quit_err, "failed to close session");
            }
            return Err(e);
        }

        let session = Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            config,
            driver: Arc::new(driver),
        };
        info!(
            session_id = %session.id,
            implicit_wait_ms = session.config.implicit_wait.as_millis() as u64,
            "session started"
        );
        Ok(session)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// A shared handle to the driver.
    ///
    /// Handles stay valid until [`stop`](Self::stop); commands issued after
    /// that fail with [`DriverError::NotConnected`].
    pub fn driver(&self) -> Arc<dyn AutomationDriver> {
        Arc::clone(&self.driver)
    }

    /// Releases the remote session.
    pub async fn stop(self) -> Result<(), DriverError> {
        let elapsed = Utc::now() - self.started_at;
        info!(
            session_id = %self.id,
            elapsed_ms = elapsed.num_milliseconds(),
            "stopping session"
        );
        self.driver.quit().await
    }
}
