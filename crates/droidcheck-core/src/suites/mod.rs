//! Scenario suites bundled with the harness.

pub mod tasks;
