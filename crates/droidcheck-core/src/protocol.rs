//! W3C WebDriver wire format for the commands the harness issues.
//!
//! Every command body is plain JSON. Every response is a JSON object whose
//! `value` field carries the result, or an error object of the form
//! `{"error": "...", "message": "..."}`. Appium servers of different
//! generations answer session creation and element lookups with slightly
//! different shapes; the decoders here accept both the W3C and the legacy
//! (JSON Wire) forms.
//!
//! # Example
//!
//! ```
//! use droidcheck_core::element::Locator;
//! use droidcheck_core::protocol::{decode_element_id, find_element_body};
//!
//! let body = find_element_body(&Locator::id("com.example:id/fab"));
//! assert_eq!(body["using"], "id");
//!
//! let value = serde_json::json!({"element-6066-11e4-a52e-4f735466cecf": "42"});
//! assert_eq!(decode_element_id(&value).unwrap(), "42");
//! ```

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::element::{Locator, Rect};
use crate::touch::{TouchSequence, TouchStep};

/// The W3C web element identifier key.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// The legacy JSON Wire element identifier key.
pub const LEGACY_ELEMENT_KEY: &str = "ELEMENT";

/// The remote error code for a lookup that found nothing.
pub const NO_SUCH_ELEMENT: &str = "no such element";

/// Pointer input source id used for synthesized touches.
const TOUCH_POINTER_ID: &str = "finger1";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while decoding endpoint responses.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    /// A required field is missing from the payload.
    #[error("missing field '{0}' in response")]
    MissingField(&'static str),

    /// A field is present but has the wrong shape.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

/// An error object returned by the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteError {
    pub error: String,
    #[serde(default)]
    pub message: String,
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Body for `POST /session`.
///
/// Capabilities are always empty: the endpoint decides the device, the app,
/// and every other session setting.
pub fn new_session_body() -> Value {
    json!({
        "capabilities": {
            "alwaysMatch": {},
            "firstMatch": [{}],
        },
        "desiredCapabilities": {},
    })
}

/// Body for `POST /session/{id}/timeouts` setting the implicit wait.
pub fn implicit_wait_body(wait: Duration) -> Value {
    json!({ "implicit": wait.as_millis() as u64 })
}

/// Body for `POST /session/{id}/element`.
pub fn find_element_body(locator: &Locator) -> Value {
    json!({
        "using": locator.strategy(),
        "value": locator.value(),
    })
}

/// Body for `POST /session/{id}/element/{eid}/value`.
///
/// Carries both the W3C `text` field and the legacy per-character `value`
/// array.
pub fn send_keys_body(text: &str) -> Value {
    let chars: Vec<String> = text.chars().map(|c| c.to_string()).collect();
    json!({
        "text": text,
        "value": chars,
    })
}

/// Body for `POST /session/{id}/actions` carrying one touch pointer.
pub fn actions_body(sequence: &TouchSequence) -> Value {
    let actions: Vec<Value> = sequence.steps().iter().flat_map(encode_step).collect();

    json!({
        "actions": [{
            "type": "pointer",
            "id": TOUCH_POINTER_ID,
            "parameters": { "pointerType": "touch" },
            "actions": actions,
        }]
    })
}

/// A press is encoded as a zero-duration move followed by pointer down.
fn encode_step(step: &TouchStep) -> Vec<Value> {
    match step {
        TouchStep::Press(at) => vec![
            json!({
                "type": "pointerMove",
                "duration": 0,
                "origin": "viewport",
                "x": at.x,
                "y": at.y,
            }),
            json!({ "type": "pointerDown", "button": 0 }),
        ],
        TouchStep::Wait(duration) => vec![json!({
            "type": "pause",
            "duration": duration.as_millis() as u64,
        })],
        TouchStep::MoveTo { to, duration } => vec![json!({
            "type": "pointerMove",
            "duration": duration.as_millis() as u64,
            "origin": "viewport",
            "x": to.x,
            "y": to.y,
        })],
        TouchStep::Release => vec![json!({ "type": "pointerUp", "button": 0 })],
    }
}

// ---------------------------------------------------------------------------
// Response decoding
// ---------------------------------------------------------------------------

/// Extracts the session id from a new-session response body.
///
/// W3C servers nest it under `value.sessionId`; legacy servers put it at the
/// top level.
pub fn decode_session_id(body: &Value) -> Result<String, ProtocolError> {
    body.get("value")
        .and_then(|v| v.get("sessionId"))
        .or_else(|| body.get("sessionId"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(ProtocolError::MissingField("sessionId"))
}

/// Extracts the element id from a find-element `value`.
pub fn decode_element_id(value: &Value) -> Result<String, ProtocolError> {
    value
        .get(ELEMENT_KEY)
        .or_else(|| value.get(LEGACY_ELEMENT_KEY))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(ProtocolError::MissingField(ELEMENT_KEY))
}

#[derive(Deserialize)]
struct WireRect {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

/// Decodes a `rect` value. Fractional coordinates are truncated.
pub fn decode_rect(value: &Value) -> Result<Rect, ProtocolError> {
    let wire: WireRect = serde_json::from_value(value.clone())
        .map_err(|e| ProtocolError::InvalidPayload(format!("rect: {e}")))?;
    Ok(Rect::new(
        wire.x as i64,
        wire.y as i64,
        wire.width as i64,
        wire.height as i64,
    ))
}

/// Decodes a text value; `null` reads as the empty string.
pub fn decode_text(value: &Value) -> Result<String, ProtocolError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Null => Ok(String::new()),
        other => Err(ProtocolError::InvalidPayload(format!(
            "expected text, got {other}"
        ))),
    }
}

/// Decodes an attribute value. Non-string scalars are stringified the way
/// Appium's Java client reports them (`true`, `12`).
pub fn decode_attribute(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Returns the error object if the response body carries one.
pub fn decode_remote_error(body: &Value) -> Option<RemoteError> {
    let value = body.get("value")?;
    value.get("error")?;
    serde_json::from_value(value.clone()).ok()
}
