//! Scenarios and validated scenario chains.
//!
//! A scenario is a named async body plus the names of the scenarios it
//! depends on. Scenarios are declared through [`ScenarioChain::builder`];
//! [`ScenarioChainBuilder::build`] rejects duplicate names, unknown or
//! self-referencing prerequisites, and cycles before anything runs, and fixes
//! the execution order.
//!
//! # Ordering
//!
//! The order is a topological sort in which, among the scenarios whose
//! prerequisites have all been placed, the one declared first goes next. A
//! chain whose declaration order already respects its dependencies therefore
//! runs exactly in declaration order.
//!
//! # Example
//!
//! ```
//! use async_trait::async_trait;
//! use droidcheck_core::runner::ScenarioContext;
//! use droidcheck_core::scenario::{ScenarioBody, ScenarioChain, ScenarioError};
//!
//! struct Noop;
//!
//! #[async_trait]
//! impl ScenarioBody for Noop {
//!     async fn run(&self, _ctx: &ScenarioContext) -> Result<(), ScenarioError> {
//!         Ok(())
//!     }
//! }
//!
//! let chain = ScenarioChain::builder()
//!     .scenario("first", &[], Noop)
//!     .scenario("second", &["first"], Noop)
//!     .build()
//!     .unwrap();
//! assert_eq!(chain.names(), vec!["first", "second"]);
//! ```

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::driver::DriverError;
use crate::gesture::GestureError;
use crate::runner::ScenarioContext;

/// Lifecycle state of one scenario within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioState {
    Pending,
    Running,
    Passed,
    Failed,
    Skipped,
}

impl ScenarioState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioState::Pending => "pending",
            ScenarioState::Running => "running",
            ScenarioState::Passed => "passed",
            ScenarioState::Failed => "failed",
            ScenarioState::Skipped => "skipped",
        }
    }
}

impl fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// An observed UI value did not match the expected one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{what}: expected {expected:?}, got {actual:?}")]
pub struct AssertionFailure {
    pub what: String,
    pub expected: String,
    pub actual: String,
}

/// Fails with an [`AssertionFailure`] unless `actual == expected`.
pub fn ensure_eq(what: &str, expected: &str, actual: &str) -> Result<(), AssertionFailure> {
    if expected == actual {
        Ok(())
    } else {
        Err(AssertionFailure {
            what: what.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

/// Any error a scenario body can fail with.
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error(transparent)]
    Assertion(#[from] AssertionFailure),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error(transparent)]
    Gesture(#[from] GestureError),

    #[error("{0}")]
    Other(String),
}

/// Chain declarations that cannot be ordered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("scenario '{0}' is declared more than once")]
    Duplicate(String),

    #[error("scenario '{scenario}' depends on unknown scenario '{prerequisite}'")]
    UnknownDependency {
        scenario: String,
        prerequisite: String,
    },

    #[error("scenario '{0}' depends on itself")]
    SelfDependency(String),

    #[error("dependency cycle among scenarios: {}", .0.join(", "))]
    Cycle(Vec<String>),
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

/// The body of a scenario.
///
/// Bodies interact with the app only through the [`ScenarioContext`] they
/// are given.
#[async_trait]
pub trait ScenarioBody: Send + Sync {
    async fn run(&self, ctx: &ScenarioContext) -> Result<(), ScenarioError>;
}

/// A named body and its prerequisites.
#[derive(Clone)]
pub struct Scenario {
    name: String,
    prerequisites: Vec<String>,
    body: Arc<dyn ScenarioBody>,
}

impl Scenario {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prerequisites(&self) -> &[String] {
        &self.prerequisites
    }

    pub(crate) fn body(&self) -> Arc<dyn ScenarioBody> {
        Arc::clone(&self.body)
    }
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("prerequisites", &self.prerequisites)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// ScenarioChain
// ---------------------------------------------------------------------------

/// Scenarios in validated execution order.
#[derive(Debug, Clone)]
pub struct ScenarioChain {
    scenarios: Vec<Scenario>,
}

impl ScenarioChain {
    pub fn builder() -> ScenarioChainBuilder {
        ScenarioChainBuilder::default()
    }

    /// Scenarios in execution order.
    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// Scenario names in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.scenarios.iter().map(Scenario::name).collect()
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

/// Collects scenario declarations for a [`ScenarioChain`].
#[derive(Default)]
pub struct ScenarioChainBuilder {
    declared: Vec<Scenario>,
}

impl ScenarioChainBuilder {
    /// Declares a scenario that runs only after every scenario in
    /// `prerequisites` has passed.
    pub fn scenario(
        mut self,
        name: impl Into<String>,
        prerequisites: &[&str],
        body: impl ScenarioBody + 'static,
    ) -> Self {
        self.declared.push(Scenario {
            name: name.into(),
            prerequisites: prerequisites.iter().map(|p| p.to_string()).collect(),
            body: Arc::new(body),
        });
        self
    }

    /// Validates the declarations and orders them.
    pub fn build(self) -> Result<ScenarioChain, ChainError> {
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(self.declared.len());
        for (i, scenario) in self.declared.iter().enumerate() {
            if index.insert(scenario.name(), i).is_some() {
                return Err(ChainError::Duplicate(scenario.name.clone()));
            }
        }

        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.declared.len()];
        let mut remaining: Vec<usize> = vec![0; self.declared.len()];
        for (i, scenario) in self.declared.iter().enumerate() {
            for prerequisite in &scenario.prerequisites {
                if *prerequisite == scenario.name {
                    return Err(ChainError::SelfDependency(scenario.name.clone()));
                }
                let &p = index.get(prerequisite.as_str()).ok_or_else(|| {
                    ChainError::UnknownDependency {
                        scenario: scenario.name.clone(),
                        prerequisite: prerequisite.clone(),
                    }
                })?;
                dependents[p].push(i);
                remaining[i] += 1;
            }
        }

        // Kahn's algorithm; the ready set is ordered by declaration index.
        let mut ready: BTreeSet<usize> = (0..self.declared.len())
            .filter(|&i| remaining[i] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.declared.len());
        while let Some(i) = ready.pop_first() {
            order.push(i);
            for &d in &dependents[i] {
                remaining[d] -= 1;
                if remaining[d] == 0 {
                    ready.insert(d);
                }
            }
        }

        if order.len() < self.declared.len() {
            let stuck = self
                .declared
                .iter()
                .enumerate()
                .filter(|(i, _)| remaining[*i] > 0)
                .map(|(_, s)| s.name.clone())
                .collect();
            return Err(ChainError::Cycle(stuck));
        }

        let mut slots: Vec<Option<Scenario>> = self.declared.into_iter().map(Some).collect();
        let scenarios = order.into_iter().filter_map(|i| slots[i].take()).collect();
        Ok(ScenarioChain { scenarios })
    }
}
