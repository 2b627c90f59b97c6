//! Scripted touch sequences.
//!
//! A [`TouchSequence`] is an ordered list of low-level pointer steps that the
//! endpoint performs as one atomic gesture. The harness never interpolates
//! between points itself; any intermediate motion is produced remotely.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use droidcheck_core::element::Point;
//! use droidcheck_core::touch::TouchSequence;
//!
//! let seq = TouchSequence::new()
//!     .press(Point::new(900, 400))
//!     .wait(Duration::from_millis(200))
//!     .move_to(Point::new(0, 400), Duration::ZERO)
//!     .release();
//! assert_eq!(seq.steps().len(), 4);
//! ```

use std::time::Duration;

use crate::element::Point;

/// One step of a touch sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TouchStep {
    /// Put the finger down at a point.
    Press(Point),
    /// Hold the current state for a duration.
    Wait(Duration),
    /// Move the finger to a point over the given duration.
    MoveTo { to: Point, duration: Duration },
    /// Lift the finger.
    Release,
}

/// An ordered press/wait/move/release script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TouchSequence {
    steps: Vec<TouchStep>,
}

impl TouchSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(mut self, at: Point) -> Self {
        self.steps.push(TouchStep::Press(at));
        self
    }

    pub fn wait(mut self, duration: Duration) -> Self {
        self.steps.push(TouchStep::Wait(duration));
        self
    }

    pub fn move_to(mut self, to: Point, duration: Duration) -> Self {
        self.steps.push(TouchStep::MoveTo { to, duration });
        self
    }

    pub fn release(mut self) -> Self {
        self.steps.push(TouchStep::Release);
        self
    }

    pub fn steps(&self) -> &[TouchStep] {
        &self.steps
    }

    /// The first pressed point, if any.
    pub fn start(&self) -> Option<Point> {
        self.steps.iter().find_map(|step| match step {
            TouchStep::Press(p) => Some(*p),
            _ => None,
        })
    }

    /// The last point the finger moved to, if any.
    pub fn end(&self) -> Option<Point> {
        self.steps.iter().rev().find_map(|step| match step {
            TouchStep::MoveTo { to, .. } => Some(*to),
            _ => None,
        })
    }
}
