//! Sequential execution of a [`ScenarioChain`].
//!
//! The runner walks the chain in order, one scenario at a time. A scenario
//! runs only if every prerequisite passed; otherwise it is recorded as
//! skipped without running. Each body runs in its own task so that a panic
//! becomes a failed scenario instead of aborting the run.
//!
//! Scenario bodies reach the app only through the [`ScenarioContext`] the
//! runner hands them, which bundles the shared driver, the gesture
//! synthesizer and the interrupt token.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::driver::{AutomationDriver, DriverError};
use crate::element::{ElementRef, Locator};
use crate::gesture::{Direction, GestureOutcome, GestureSynthesizer};
use crate::report::{RunReport, ScenarioRecord, SkipReason};
use crate::scenario::{Scenario, ScenarioChain, ScenarioError, ScenarioState};
use crate::session::Session;

// ---------------------------------------------------------------------------
// ScenarioContext
// ---------------------------------------------------------------------------

/// Everything a scenario body may use.
pub struct ScenarioContext {
    driver: Arc<dyn AutomationDriver>,
    gestures: GestureSynthesizer,
    interrupt: CancellationToken,
    warnings: Mutex<Vec<String>>,
}

impl ScenarioContext {
    pub fn new(driver: Arc<dyn AutomationDriver>, gestures: GestureSynthesizer) -> Self {
        Self::with_interrupt(driver, gestures, CancellationToken::new())
    }

    /// Like [`new`](Self::new), with the gesture settle pause bound to
    /// `interrupt`.
    pub fn with_interrupt(
        driver: Arc<dyn AutomationDriver>,
        gestures: GestureSynthesizer,
        interrupt: CancellationToken,
    ) -> Self {
        Self {
            driver,
            gestures: gestures.with_interrupt(interrupt.clone()),
            interrupt,
            warnings: Mutex::new(Vec::new()),
        }
    }

    pub fn driver(&self) -> &dyn AutomationDriver {
        self.driver.as_ref()
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupt.is_cancelled()
    }

    pub async fn find(&self, locator: &Locator) -> Result<ElementRef, DriverError> {
        self.driver.find_element(locator).await
    }

    /// Looks up the element and reads its text.
    pub async fn text(&self, locator: &Locator) -> Result<String, DriverError> {
        let element = self.find(locator).await?;
        self.driver.element_text(&element).await
    }

    /// Looks up the element and taps it, returning the element tapped.
    pub async fn click(&self, locator: &Locator) -> Result<ElementRef, DriverError> {
        let element = self.find(locator).await?;
        info!(%locator, "tap");
        self.driver.click(&element).await?;
        Ok(element)
    }

    pub async fn send_keys(&self, locator: &Locator, text: &str) -> Result<(), DriverError> {
        let element = self.find(locator).await?;
        info!(%locator, text, "type");
        self.driver.send_keys(&element, text).await
    }

    /// Looks up the element and swipes inside it.
    ///
    /// A swallowed transport failure is recorded as a warning on the current
    /// scenario.
    pub async fn swipe(&self, locator: &Locator, direction: Direction) -> Result<GestureOutcome, ScenarioError> {
        let element = self.find(locator).await?;
        let outcome = self
            .gestures
            .swipe(self.driver.as_ref(), &element, direction)
            .await?;
        if let GestureOutcome::TransportFailed(reason) = &outcome {
            self.warn(format!("swipe {direction} on {locator} failed: {reason}"));
        }
        Ok(outcome)
    }

    /// Records a non-fatal problem on the current scenario.
    pub fn warn(&self, message: impl Into<String>) {
        let mut warnings = self.warnings.lock().unwrap_or_else(|e| e.into_inner());
        warnings.push(message.into());
    }

    fn take_warnings(&self) -> Vec<String> {
        let mut warnings = self.warnings.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *warnings)
    }
}

// ---------------------------------------------------------------------------
// ChainRunner
// ---------------------------------------------------------------------------

/// Runs a chain against one context and produces the report.
#[derive(Debug, Clone)]
pub struct ChainRunner {
    endpoint: String,
}

impl ChainRunner {
    /// `endpoint` is only recorded in the report.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    pub async fn run(&self, chain: &ScenarioChain, ctx: Arc<ScenarioContext>) -> RunReport {
        let mut report = RunReport::new(self.endpoint.clone());
        let mut states: HashMap<String, ScenarioState> = chain
            .names()
            .into_iter()
            .map(|n| (n.to_string(), ScenarioState::Pending))
            .collect();

        info!(run_id = %report.run_id, scenarios = chain.len(), "starting run");

        for scenario in chain.scenarios() {
            let record = if ctx.is_interrupted() {
                ScenarioRecord::skipped(scenario.name(), SkipReason::Interrupted)
            } else if let Some(reason) = blocking_reason(scenario, &states) {
                ScenarioRecord::skipped(scenario.name(), reason)
            } else {
                states.insert(scenario.name().to_string(), ScenarioState::Running);
                run_one(scenario, &ctx).await
            };

            match record.state {
                ScenarioState::Passed => info!(scenario = %record.name, "passed"),
                ScenarioState::Failed => warn!(
                    scenario = %record.name,
                    detail = record.detail.as_deref().unwrap_or_default(),
                    "failed"
                ),
                _ => info!(
                    scenario = %record.name,
                    reason = %record.skip_reason.as_ref().map(ToString::to_string).unwrap_or_default(),
                    "skipped"
                ),
            }

            states.insert(record.name.clone(), record.state);
            report.push(record);
        }

        report.finish();
        info!(
            passed = report.passed(),
            failed = report.failed(),
            skipped = report.skipped(),
            "run finished"
        );
        report
    }
}

/// The first prerequisite that did not pass, as a skip reason.
fn blocking_reason(scenario: &Scenario, states: &HashMap<String, ScenarioState>) -> Option<SkipReason> {
    scenario.prerequisites().iter().find_map(|p| {
        match states.get(p).copied().unwrap_or(ScenarioState::Pending) {
            ScenarioState::Passed => None,
            ScenarioState::Failed => Some(SkipReason::PrerequisiteFailed(p.clone())),
            _ => Some(SkipReason::PrerequisiteSkipped(p.clone())),
        }
    })
}

async fn run_one(scenario: &Scenario, ctx: &Arc<ScenarioContext>) -> ScenarioRecord {
    let span = info_span!("scenario", name = %scenario.name());
    let body = scenario.body();
    let task_ctx = Arc::clone(ctx);
    let started = Instant::now();

    debug!(scenario = %scenario.name(), "running");
    let joined = tokio::spawn(async move { body.run(&task_ctx).await }.instrument(span)).await;

    let (state, detail) = match joined {
        Ok(Ok(())) => (ScenarioState::Passed, None),
        Ok(Err(e)) => (ScenarioState::Failed, Some(e.to_string())),
        Err(e) if e.is_panic() => (
            ScenarioState::Failed,
            Some(format!("panicked: {}", panic_message(e.into_panic().as_ref()))),
        ),
        Err(e) => (ScenarioState::Failed, Some(format!("task aborted: {e}"))),
    };

    ScenarioRecord {
        name: scenario.name().to_string(),
        state,
        detail,
        skip_reason: None,
        duration_ms: started.elapsed().as_millis() as u64,
        warnings: ctx.take_warnings(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Runs `chain` over `session` and stops the session afterwards.
///
/// The session is stopped whatever the scenarios do; a failure to stop is
/// logged and does not change the report.
pub async fn run_in_session(
    session: Session,
    chain: &ScenarioChain,
    gestures: GestureSynthesizer,
    interrupt: CancellationToken,
) -> RunReport {
    let ctx = Arc::new(ScenarioContext::with_interrupt(
        session.driver(),
        gestures,
        interrupt,
    ));
    let report = ChainRunner::new(session.config().endpoint.clone())
        .run(chain, ctx)
        .await;

    if let Err(e) = session.stop().await {
        warn!(error = %e, "failed to stop session");
    }
    report
}
