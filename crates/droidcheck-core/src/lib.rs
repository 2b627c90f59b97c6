//! # droidcheck-core
//!
//! Core library for Android UI acceptance testing over a WebDriver endpoint.
//!
//! This crate drives a running Android app through an Appium-compatible
//! automation server. A single session is shared by an ordered chain of
//! scenarios that build app state step by step; a failed scenario causes
//! every scenario that depends on it to be skipped.
//!
//! ## Modules
//!
//! - [`driver`] - Backend-agnostic automation trait and error type
//! - [`webdriver_driver`] - [`driver::AutomationDriver`] over W3C WebDriver
//! - [`webdriver_client`] - Low-level HTTP transport for WebDriver commands
//! - [`protocol`] - WebDriver request bodies and response decoding
//! - [`element`] - Locators, element handles and screen geometry
//! - [`touch`] - Scripted touch sequences
//! - [`gesture`] - Directional swipes computed from element bounds
//! - [`session`] - Session lifecycle for one run
//! - [`scenario`] - Scenario bodies and validated dependency chains
//! - [`runner`] - Sequential chain execution with skip propagation
//! - [`report`] - The per-run report
//! - [`config`] - Persistent configuration in `~/.droidcheck/config.json`
//! - [`suites`] - Bundled scenario suites
//!
//! ## External Dependencies
//!
//! A running Appium server (default `http://127.0.0.1:4723/wd/hub`) with a
//! connected device or emulator. The session is created with empty
//! capabilities; the server decides which device and app are used.
//!
//! ## Example
//!
//! ```no_run
//! use droidcheck_core::gesture::GestureSynthesizer;
//! use droidcheck_core::runner::run_in_session;
//! use droidcheck_core::session::{Session, SessionConfig};
//! use droidcheck_core::suites::tasks;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let chain = tasks::chain()?;
//! let session = Session::start(SessionConfig::default()).await?;
//! let report = run_in_session(
//!     session,
//!     &chain,
//!     GestureSynthesizer::default(),
//!     CancellationToken::new(),
//! )
//! .await;
//! println!("{}", report.to_text());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod driver;
pub mod element;
pub mod gesture;
pub mod protocol;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod session;
pub mod suites;
pub mod touch;
pub mod webdriver_client;
pub mod webdriver_driver;
