//! Directional swipe gestures inside an element.
//!
//! A swipe is computed from the element's bounding box at call time and a
//! [`Direction`], then delivered as one atomic touch sequence:
//! press at the start point, hold for [`GestureTiming::press_hold`], move to
//! the end point, release. After the sequence returns, the synthesizer pauses
//! for [`GestureTiming::settle`] so the app can finish animating before the
//! next lookup.
//!
//! Touch transport failures are handled according to [`GesturePolicy`]. The
//! default, [`GesturePolicy::BestEffort`], logs the failure and reports it as
//! [`GestureOutcome::TransportFailed`] instead of returning an error.
//!
//! # Example
//!
//! ```
//! use droidcheck_core::element::{Point, Rect};
//! use droidcheck_core::gesture::{swipe_path, Direction};
//!
//! let path = swipe_path(Rect::new(0, 200, 1080, 150), Direction::Left, 0).unwrap();
//! assert_eq!(path.start, Point::new(1080, 275));
//! assert_eq!(path.end, Point::new(0, 275));
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::driver::{AutomationDriver, DriverError};
use crate::element::{ElementRef, Point, Rect};
use crate::touch::TouchSequence;

/// Default time the finger rests at the start point before moving.
pub const DEFAULT_PRESS_HOLD: Duration = Duration::from_millis(200);

/// Default pause after the touch sequence returns.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(200);

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while synthesizing a swipe.
#[derive(Error, Debug)]
pub enum GestureError {
    /// The direction or the path geometry is unusable.
    #[error("invalid gesture argument: {0}")]
    InvalidArgument(String),

    /// The element's rectangle could not be read.
    #[error("failed to read element rect: {0}")]
    Rect(#[source] DriverError),

    /// The touch sequence failed under [`GesturePolicy::Strict`].
    #[error("touch action failed: {0}")]
    Transport(#[source] DriverError),
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// The four swipe directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    /// True for left and right.
    pub fn is_horizontal(&self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = GestureError;

    /// Parses `up`, `down`, `left` or `right` in any letter case, so both
    /// `LEFT` and `left` are accepted. Surrounding whitespace is not.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            _ => Err(GestureError::InvalidArgument(format!(
                "direction '{s}' not supported (expected up, down, left or right)"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Start and end points of a swipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwipePath {
    pub start: Point,
    pub end: Point,
}

impl SwipePath {
    /// The press, hold, move, release script for this path.
    pub fn to_sequence(&self, press_hold: Duration, move_duration: Duration) -> TouchSequence {
        TouchSequence::new()
            .press(self.start)
            .wait(press_hold)
            .move_to(self.end, move_duration)
            .release()
    }
}

/// Computes the swipe endpoints inside `rect`, inset by `edge_border` pixels
/// along the swipe axis.
///
/// Vertical swipes run along the rectangle's vertical center line and
/// horizontal swipes along its horizontal center line. Halves are computed
/// with integer division.
///
/// Returns [`GestureError::InvalidArgument`] if `edge_border` is negative,
/// if the rectangle's extent along the swipe axis is not greater than
/// `2 * edge_border` (the start point would then meet or pass the end), or if
/// any coordinate falls outside the `i64` range.
pub fn swipe_path(rect: Rect, direction: Direction, edge_border: i64) -> Result<SwipePath, GestureError> {
    if edge_border < 0 {
        return Err(GestureError::InvalidArgument(format!(
            "edge border must not be negative, got {edge_border}"
        )));
    }

    let extent = if direction.is_horizontal() {
        rect.width
    } else {
        rect.height
    };
    let degenerate = || {
        GestureError::InvalidArgument(format!(
            "cannot swipe {direction} across {extent}px with a {edge_border}px border"
        ))
    };
    let inset = edge_border.checked_mul(2).ok_or_else(degenerate)?;
    if extent <= inset {
        return Err(degenerate());
    }

    let out_of_range =
        || GestureError::InvalidArgument(format!("{rect:?} is out of range for a swipe"));
    let center_x = rect.x.checked_add(rect.width / 2).ok_or_else(out_of_range)?;
    let center_y = rect.y.checked_add(rect.height / 2).ok_or_else(out_of_range)?;
    let top = rect.y.checked_add(edge_border).ok_or_else(out_of_range)?;
    let bottom = rect
        .y
        .checked_add(rect.height)
        .and_then(|b| b.checked_sub(edge_border))
        .ok_or_else(out_of_range)?;
    let left = rect.x.checked_add(edge_border).ok_or_else(out_of_range)?;
    let right = rect
        .x
        .checked_add(rect.width)
        .and_then(|r| r.checked_sub(edge_border))
        .ok_or_else(out_of_range)?;

    let (start, end) = match direction {
        Direction::Down => (Point::new(center_x, top), Point::new(center_x, bottom)),
        Direction::Up => (Point::new(center_x, bottom), Point::new(center_x, top)),
        Direction::Left => (Point::new(right, center_y), Point::new(left, center_y)),
        Direction::Right => (Point::new(left, center_y), Point::new(right, center_y)),
    };
    Ok(SwipePath { start, end })
}

// ---------------------------------------------------------------------------
// Timing and policy
// ---------------------------------------------------------------------------

/// Timing and inset constants for synthesized swipes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureTiming {
    /// How long the finger rests at the start point.
    pub press_hold: Duration,
    /// Pause after the touch sequence returns.
    pub settle: Duration,
    /// Duration of the move from start to end, interpolated remotely.
    pub move_duration: Duration,
    /// Inset from the rectangle's edges along the swipe axis, in pixels.
    pub edge_border: i64,
}

impl Default for GestureTiming {
    fn default() -> Self {
        Self {
            press_hold: DEFAULT_PRESS_HOLD,
            settle: DEFAULT_SETTLE,
            move_duration: Duration::ZERO,
            edge_border: 0,
        }
    }
}

/// What to do when the touch sequence itself fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GesturePolicy {
    /// Log a warning and report [`GestureOutcome::TransportFailed`].
    #[default]
    BestEffort,
    /// Return [`GestureError::Transport`].
    Strict,
}

/// Result of a swipe that did not error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureOutcome {
    Performed,
    /// The touch sequence failed and the failure was swallowed.
    TransportFailed(String),
}

impl GestureOutcome {
    pub fn is_performed(&self) -> bool {
        matches!(self, GestureOutcome::Performed)
    }
}

// ---------------------------------------------------------------------------
// GestureSynthesizer
// ---------------------------------------------------------------------------

/// Performs directional swipes through an [`AutomationDriver`].
#[derive(Debug, Clone, Default)]
pub struct GestureSynthesizer {
    timing: GestureTiming,
    policy: GesturePolicy,
    interrupt: Option<CancellationToken>,
}

impl GestureSynthesizer {
    pub fn new(timing: GestureTiming) -> Self {
        Self {
            timing,
            policy: GesturePolicy::default(),
            interrupt: None,
        }
    }

    pub fn with_policy(mut self, policy: GesturePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Cut the settle pause short once `token` is cancelled.
    pub fn with_interrupt(mut self, token: CancellationToken) -> Self {
        self.interrupt = Some(token);
        self
    }

    /// Swipes inside `element` in `direction`.
    ///
    /// The rectangle is read fresh on every call. Under
    /// [`GesturePolicy::BestEffort`] a failed touch sequence still returns
    /// `Ok`, carrying [`GestureOutcome::TransportFailed`].
    pub async fn swipe(
        &self,
        driver: &dyn AutomationDriver,
        element: &ElementRef,
        direction: Direction,
    ) -> Result<GestureOutcome, GestureError> {
        let rect = driver
            .element_rect(element)
            .await
            .map_err(GestureError::Rect)?;
        let path = swipe_path(rect, direction, self.timing.edge_border)?;

        info!(
            %direction,
            locator = %element.locator,
            start = %path.start,
            end = %path.end,
            "swiping element"
        );

        let sequence = path.to_sequence(self.timing.press_hold, self.timing.move_duration);
        let outcome = match driver.perform_touch(&sequence).await {
            Ok(()) => GestureOutcome::Performed,
            Err(e) => match self.policy {
                GesturePolicy::Strict => return Err(GestureError::Transport(e)),
                GesturePolicy::BestEffort => {
                    warn!(%direction, error = %e, "touch action failed, continuing");
                    GestureOutcome::TransportFailed(e.to_string())
                }
            },
        };

        self.settle().await;
        Ok(outcome)
    }

    /// Parses `direction` and swipes.
    ///
    /// An unknown direction fails before any remote call is made.
    pub async fn swipe_named(
        &self,
        driver: &dyn AutomationDriver,
        element: &ElementRef,
        direction: &str,
    ) -> Result<GestureOutcome, GestureError> {
        let direction = direction.parse::<Direction>()?;
        self.swipe(driver, element, direction).await
    }

    async fn settle(&self) {
        let pause = tokio::time::sleep(self.timing.settle);
        match &self.interrupt {
            Some(token) => {
                tokio::select! {
                    _ = pause => {}
                    _ = token.cancelled() => debug!("settle pause interrupted"),
                }
            }
            None => pause.await,
        }
    }
}
