//! Shared test helpers for droidcheck-core integration tests.
//!
//! This module provides an in-process fake of the Tasks app that implements
//! [`AutomationDriver`], and a programmable mock WebDriver endpoint for tests
//! that exercise the HTTP backend.

#![allow(dead_code)]

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use droidcheck_core::driver::{AutomationDriver, DriverError};
use droidcheck_core::element::{ElementRef, Locator, Point, Rect};
use droidcheck_core::gesture::{GestureSynthesizer, GestureTiming};
use droidcheck_core::protocol::ELEMENT_KEY;
use droidcheck_core::session::{Session, SessionConfig};
use droidcheck_core::suites::tasks::{
    ADD_TASK_BUTTON_ID, CONFIRM_BUTTON_ID, HEADLINE, HEADLINE_ID, NEW_TASK_SUBMIT_ID,
    NEW_TASK_TEXT_ID, TASK_ROW_PREFIX, TASK_ROW_SUFFIX,
};
use droidcheck_core::touch::TouchSequence;

// ---------------------------------------------------------------------------
// Fake Tasks app
// ---------------------------------------------------------------------------

/// Top of the first task row on the fake screen.
pub const FIRST_ROW_TOP: i64 = 210;
pub const ROW_HEIGHT: i64 = 147;
pub const SCREEN_WIDTH: i64 = 1080;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeTask {
    pub label: String,
    pub checked: bool,
}

/// Observable state of the fake app.
#[derive(Debug)]
pub struct AppState {
    pub headline: String,
    /// Newest first, as the real list shows them.
    pub tasks: Vec<FakeTask>,
    pub dialog_open: bool,
    pub typed: String,
    /// Row index awaiting delete confirmation.
    pub pending_delete: Option<usize>,
    pub connected: bool,
    pub implicit_wait: Option<Duration>,
    pub quit_calls: usize,
    pub touches: Vec<TouchSequence>,
    /// Every locator passed to `find_element`, in order.
    pub lookups: Vec<Locator>,
    /// Element ids that never resolve.
    pub hidden: HashSet<String>,
    pub fail_touch: bool,
    pub fail_connect: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            headline: HEADLINE.to_string(),
            tasks: Vec::new(),
            dialog_open: false,
            typed: String::new(),
            pending_delete: None,
            connected: false,
            implicit_wait: None,
            quit_calls: 0,
            touches: Vec::new(),
            lookups: Vec::new(),
            hidden: HashSet::new(),
            fail_touch: false,
            fail_connect: false,
        }
    }
}

/// An in-process stand-in for the Tasks app behind a WebDriver session.
///
/// Clones share state, so a test can keep one handle while the session owns
/// another.
#[derive(Clone, Default)]
pub struct FakeTasksApp {
    state: Arc<Mutex<AppState>>,
}

impl FakeTasksApp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutate the app state before or between runs.
    pub fn configure(&self, f: impl FnOnce(&mut AppState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn labels(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .tasks
            .iter()
            .map(|t| t.label.clone())
            .collect()
    }

    pub fn quit_calls(&self) -> usize {
        self.state.lock().unwrap().quit_calls
    }

    pub fn touches(&self) -> Vec<TouchSequence> {
        self.state.lock().unwrap().touches.clone()
    }

    pub fn lookups(&self) -> Vec<Locator> {
        self.state.lock().unwrap().lookups.clone()
    }

    pub fn implicit_wait(&self) -> Option<Duration> {
        self.state.lock().unwrap().implicit_wait
    }

    pub fn row_rect(position: usize) -> Rect {
        Rect::new(
            0,
            FIRST_ROW_TOP + (position as i64 - 1) * ROW_HEIGHT,
            SCREEN_WIDTH,
            ROW_HEIGHT,
        )
    }

    fn resolve(state: &AppState, locator: &Locator) -> Option<String> {
        let id = match locator {
            Locator::Id(id) if id == HEADLINE_ID => "headline".to_string(),
            Locator::Id(id) if id == ADD_TASK_BUTTON_ID && !state.dialog_open => "fab".to_string(),
            Locator::Id(id) if id == NEW_TASK_TEXT_ID && state.dialog_open => "input".to_string(),
            Locator::Id(id) if id == NEW_TASK_SUBMIT_ID && state.dialog_open => "submit".to_string(),
            Locator::Id(id) if id == CONFIRM_BUTTON_ID && state.pending_delete.is_some() => {
                "confirm".to_string()
            }
            Locator::XPath(path) => {
                let index = path
                    .strip_prefix(TASK_ROW_PREFIX)?
                    .strip_suffix(TASK_ROW_SUFFIX)?
                    .strip_prefix('[')?
                    .strip_suffix(']')?
                    .parse::<usize>()
                    .ok()?;
                if index == 0 || index > state.tasks.len() {
                    return None;
                }
                format!("row:{index}")
            }
            _ => return None,
        };
        (!state.hidden.contains(&id)).then_some(id)
    }

    fn row_index(element: &ElementRef) -> Option<usize> {
        element.id.strip_prefix("row:")?.parse::<usize>().ok()
    }

    fn stale(element: &ElementRef) -> DriverError {
        DriverError::Remote {
            error: "stale element reference".to_string(),
            message: format!("{element} is no longer attached"),
        }
    }
}

#[async_trait]
impl AutomationDriver for FakeTasksApp {
    async fn connect(&mut self) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_connect {
            return Err(DriverError::ConnectionFailed("connection refused".to_string()));
        }
        state.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.connected && state.quit_calls == 0
    }

    async fn set_implicit_wait(&self, wait: Duration) -> Result<(), DriverError> {
        self.state.lock().unwrap().implicit_wait = Some(wait);
        Ok(())
    }

    async fn find_element(&self, locator: &Locator) -> Result<ElementRef, DriverError> {
        let mut state = self.state.lock().unwrap();
        if state.quit_calls > 0 {
            return Err(DriverError::NotConnected);
        }
        state.lookups.push(locator.clone());
        Self::resolve(&state, locator)
            .map(|id| ElementRef::new(id, locator.clone()))
            .ok_or_else(|| DriverError::ElementNotFound(locator.clone()))
    }

    async fn element_text(&self, element: &ElementRef) -> Result<String, DriverError> {
        let state = self.state.lock().unwrap();
        if element.id == "headline" {
            return Ok(state.headline.clone());
        }
        Self::row_index(element)
            .and_then(|i| state.tasks.get(i - 1))
            .map(|t| t.label.clone())
            .ok_or_else(|| Self::stale(element))
    }

    async fn element_attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        let state = self.state.lock().unwrap();
        let task = Self::row_index(element)
            .and_then(|i| state.tasks.get(i - 1))
            .ok_or_else(|| Self::stale(element))?;
        Ok(match name {
            "checked" => Some(task.checked.to_string()),
            "text" => Some(task.label.clone()),
            _ => None,
        })
    }

    async fn element_rect(&self, element: &ElementRef) -> Result<Rect, DriverError> {
        let state = self.state.lock().unwrap();
        match Self::row_index(element) {
            Some(i) if i <= state.tasks.len() => Ok(Self::row_rect(i)),
            _ => Err(Self::stale(element)),
        }
    }

    async fn click(&self, element: &ElementRef) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        match element.id.as_str() {
            "fab" => state.dialog_open = true,
            "submit" => {
                let label = std::mem::take(&mut state.typed);
                state.tasks.insert(
                    0,
                    FakeTask {
                        label,
                        checked: false,
                    },
                );
                state.dialog_open = false;
            }
            "confirm" => {
                if let Some(row) = state.pending_delete.take() {
                    state.tasks.remove(row);
                }
            }
            _ => {
                let index = Self::row_index(element).ok_or_else(|| Self::stale(element))?;
                let task = state
                    .tasks
                    .get_mut(index - 1)
                    .ok_or_else(|| Self::stale(element))?;
                task.checked = !task.checked;
            }
        }
        Ok(())
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        if element.id != "input" {
            return Err(DriverError::Remote {
                error: "invalid element state".to_string(),
                message: format!("{element} does not accept text"),
            });
        }
        state.typed.push_str(text);
        Ok(())
    }

    async fn perform_touch(&self, sequence: &TouchSequence) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        state.touches.push(sequence.clone());
        if state.fail_touch {
            return Err(DriverError::Remote {
                error: "unknown error".to_string(),
                message: "touch action rejected".to_string(),
            });
        }

        // A leftward drag that starts inside a row arms the delete dialog.
        if let (Some(start), Some(end)) = (sequence.start(), sequence.end()) {
            if end.x < start.x {
                let row = (1..=state.tasks.len()).find(|&i| Self::row_rect(i).contains(start));
                if let Some(i) = row {
                    state.pending_delete = Some(i - 1);
                }
            }
        }
        Ok(())
    }

    async fn quit(&self) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        state.quit_calls += 1;
        Ok(())
    }
}

/// Gesture timing with no pauses, so tests do not sleep.
pub fn instant_gestures() -> GestureSynthesizer {
    GestureSynthesizer::new(GestureTiming {
        press_hold: Duration::ZERO,
        settle: Duration::ZERO,
        ..GestureTiming::default()
    })
}

/// Open a session over a fresh fake app; returns the app handle too.
pub async fn fake_session() -> (Session, FakeTasksApp) {
    let app = FakeTasksApp::new();
    let session = Session::from_driver(app.clone(), SessionConfig::default())
        .await
        .unwrap();
    (session, app)
}

/// The start and end point of a recorded touch sequence.
pub fn touch_path(sequence: &TouchSequence) -> (Point, Point) {
    (sequence.start().unwrap(), sequence.end().unwrap())
}

// ---------------------------------------------------------------------------
// Mock WebDriver endpoint
// ---------------------------------------------------------------------------

/// One request received by the mock endpoint.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: Value,
}

/// Maps a request to an HTTP status and a raw response body.
pub type Responder = Arc<dyn Fn(&RecordedRequest) -> (u16, String) + Send + Sync>;

/// A running mock endpoint.
pub struct MockEndpoint {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    _handle: tokio::task::JoinHandle<()>,
}

impl MockEndpoint {
    /// The WebDriver base URL served by this mock.
    pub fn url(&self) -> String {
        format!("http://{}/wd/hub", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// `METHOD path` of every request, in arrival order.
    pub fn request_lines(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }
}

impl Drop for MockEndpoint {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

/// Start a mock WebDriver endpoint that answers every request with
/// `responder`. Each connection carries exactly one request.
pub async fn mock_webdriver(responder: Responder) -> MockEndpoint {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&requests);

    let handle = tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let responder = Arc::clone(&responder);
            let log = Arc::clone(&log);
            tokio::spawn(async move {
                let _ = serve_one(stream, responder, log).await;
            });
        }
    });

    MockEndpoint {
        addr,
        requests,
        _handle: handle,
    }
}

async fn serve_one(
    mut stream: TcpStream,
    responder: Responder,
    log: Arc<Mutex<Vec<RecordedRequest>>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();
    let content_length = lines
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_bytes = &buf[header_end..(header_end + content_length).min(buf.len())];
    let body = serde_json::from_slice(body_bytes).unwrap_or(Value::Null);

    let request = RecordedRequest { method, path, body };
    let (status, reply) = responder(&request);
    log.lock().unwrap().push(request);

    let response = format!(
        "HTTP/1.1 {status} {}\r\nContent-Type: application/json; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{reply}",
        reason_phrase(status),
        reply.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await?;
    stream.shutdown().await
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// Session id handed out by [`appium_responder`].
pub const MOCK_SESSION_ID: &str = "4b1e7c52-session";

/// A responder that behaves like a healthy Appium server.
///
/// Lookups whose value contains `missing` fail with `no such element`.
pub fn appium_responder() -> Responder {
    Arc::new(|req: &RecordedRequest| {
        let session_prefix = format!("/wd/hub/session/{MOCK_SESSION_ID}");
        let ok = |value: Value| (200, json!({ "value": value }).to_string());

        if req.method == "POST" && req.path == "/wd/hub/session" {
            return ok(json!({ "sessionId": MOCK_SESSION_ID, "capabilities": {} }));
        }
        let Some(command) = req.path.strip_prefix(&session_prefix) else {
            return (
                404,
                json!({ "value": { "error": "unknown command", "message": req.path } }).to_string(),
            );
        };

        match (req.method.as_str(), command) {
            ("DELETE", "") => ok(Value::Null),
            ("POST", "/timeouts") => ok(Value::Null),
            ("POST", "/element") => {
                let value = req.body["value"].as_str().unwrap_or_default();
                if value.contains("missing") {
                    (
                        404,
                        json!({ "value": {
                            "error": "no such element",
                            "message": "An element could not be located on the page using the given search parameters.",
                            "stacktrace": ""
                        }})
                        .to_string(),
                    )
                } else {
                    ok(json!({ ELEMENT_KEY: "el-1", "ELEMENT": "el-1" }))
                }
            }
            ("GET", "/element/el-1/text") => ok(json!("Tasks")),
            ("GET", "/element/el-1/attribute/checked") => ok(json!("true")),
            ("GET", "/element/el-1/attribute/missing") => ok(Value::Null),
            ("GET", "/element/el-1/rect") => {
                ok(json!({ "x": 0, "y": 210.5, "width": 1080, "height": 147.0 }))
            }
            ("POST", "/element/el-1/click") => ok(Value::Null),
            ("POST", "/element/el-1/value") => ok(Value::Null),
            ("POST", "/actions") => ok(Value::Null),
            _ => (
                404,
                json!({ "value": { "error": "unknown command", "message": command } }).to_string(),
            ),
        }
    })
}

/// A URL on which nothing is listening.
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/wd/hub")
}
