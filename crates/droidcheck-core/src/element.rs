//! Shared UI element types for WebDriver-based automation.
//!
//! This module defines how elements are located ([`Locator`]), how a located
//! element is referenced afterwards ([`ElementRef`]), and the geometry types
//! ([`Rect`], [`Point`]) used by gesture computation. These types are
//! independent of any specific backend implementation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A strategy for resolving a single UI element on the remote device.
///
/// Each variant maps to one `using` strategy understood by the automation
/// endpoint, so scenarios can swap lookup strategies without touching their
/// own logic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "value", rename_all = "snake_case")]
pub enum Locator {
    /// Android resource id, e.g. `com.example:id/fab`.
    Id(String),
    /// Structural path through the view hierarchy.
    XPath(String),
    /// Content description exposed to accessibility services.
    AccessibilityId(String),
    /// Fully qualified widget class, e.g. `android.widget.CheckBox`.
    ClassName(String),
    /// A `UiSelector` expression evaluated by UiAutomator on the device.
    UiAutomator(String),
}

impl Locator {
    /// Resource id lookup.
    pub fn id(value: impl Into<String>) -> Self {
        Locator::Id(value.into())
    }

    /// Structural path lookup.
    pub fn xpath(value: impl Into<String>) -> Self {
        Locator::XPath(value.into())
    }

    /// Accessibility id lookup.
    pub fn accessibility_id(value: impl Into<String>) -> Self {
        Locator::AccessibilityId(value.into())
    }

    /// The `using` value sent to the endpoint for this strategy.
    pub fn strategy(&self) -> &'static str {
        match self {
            Locator::Id(_) => "id",
            Locator::XPath(_) => "xpath",
            Locator::AccessibilityId(_) => "accessibility id",
            Locator::ClassName(_) => "class name",
            Locator::UiAutomator(_) => "-android uiautomator",
        }
    }

    /// The selector value for this strategy.
    pub fn value(&self) -> &str {
        match self {
            Locator::Id(v)
            | Locator::XPath(v)
            | Locator::AccessibilityId(v)
            | Locator::ClassName(v)
            | Locator::UiAutomator(v) => v,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.strategy(), self.value())
    }
}

/// A live handle to an element on the remote device.
///
/// The handle is only as fresh as the UI it was resolved against: if the
/// screen re-renders, the endpoint may reject it as stale. No recovery is
/// attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    /// The endpoint's opaque element id.
    pub id: String,
    /// The locator that produced this handle, kept for diagnostics.
    pub locator: Locator,
}

impl ElementRef {
    pub fn new(id: impl Into<String>, locator: Locator) -> Self {
        Self {
            id: id.into(),
            locator,
        }
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element {} ({})", self.id, self.locator)
    }
}

/// A screen coordinate in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The on-screen bounding box of an element, captured at query time.
///
/// Coordinates are in device pixels with the origin at the top-left corner
/// of the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    /// The x-coordinate of the element's top-left corner.
    pub x: i64,
    /// The y-coordinate of the element's top-left corner.
    pub y: i64,
    /// The width of the element.
    pub width: i64,
    /// The height of the element.
    pub height: i64,
}

impl Rect {
    pub const fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i64 {
        self.y + self.height
    }

    /// Returns true if `point` lies inside the rectangle or on its edge.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_strategies() {
        assert_eq!(Locator::id("a").strategy(), "id");
        assert_eq!(Locator::xpath("/hierarchy").strategy(), "xpath");
        assert_eq!(Locator::accessibility_id("Add").strategy(), "accessibility id");
        assert_eq!(Locator::ClassName("android.widget.Button".into()).strategy(), "class name");
        assert_eq!(
            Locator::UiAutomator("new UiSelector().text(\"OK\")".into()).strategy(),
            "-android uiautomator"
        );
    }

    #[test]
    fn test_locator_display_includes_strategy_and_value() {
        let locator = Locator::id("com.amazon.devicefarm:id/fab");
        assert_eq!(locator.to_string(), "id 'com.amazon.devicefarm:id/fab'");
    }

    #[test]
    fn test_locator_serde_tagging() {
        let json = serde_json::to_value(Locator::xpath("//a")).unwrap();
        assert_eq!(json["strategy"], "x_path");
        assert_eq!(json["value"], "//a");
    }

    #[test]
    fn test_rect_edges_and_contains() {
        let rect = Rect::new(10, 20, 100, 50);
        assert_eq!(rect.right(), 110);
        assert_eq!(rect.bottom(), 70);
        assert!(rect.contains(Point::new(10, 20)));
        assert!(rect.contains(Point::new(110, 70)));
        assert!(!rect.contains(Point::new(111, 70)));
        assert!(!rect.contains(Point::new(50, 19)));
    }
}
