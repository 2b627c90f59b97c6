//! CLI for Android UI acceptance testing over a WebDriver endpoint.
//!
//! Runs the bundled Tasks scenario chain against an Appium server, lists the
//! chain, or performs a single swipe against a live session.
//!
//! # Usage
//!
//! ```bash
//! # Run the Tasks suite against the default local Appium server
//! droidcheck run
//!
//! # Run against a remote endpoint and save a JSON report
//! droidcheck --url http://device-farm:4723/wd/hub run --report report.json
//!
//! # Slow the gestures down and fail on touch transport errors
//! droidcheck run --press-ms 400 --settle-ms 500 --strict-gestures
//!
//! # Show the execution order
//! droidcheck list
//!
//! # Swipe an element left
//! droidcheck swipe --id com.amazon.devicefarm:id/tasksText left
//!
//! # Machine-readable output
//! droidcheck -f json run
//! ```
//!
//! # Exit codes
//!
//! - `0` every scenario passed
//! - `1` a scenario failed or was skipped, or the swipe failed
//! - `2` the endpoint could not be reached
//! - `3` bad configuration or usage

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use droidcheck_core::config::HarnessConfig;
use droidcheck_core::driver::{AutomationDriver, DriverError};
use droidcheck_core::element::Locator;
use droidcheck_core::gesture::{Direction, GestureError, GestureOutcome, GestureSynthesizer};
use droidcheck_core::report::RunReport;
use droidcheck_core::runner::run_in_session;
use droidcheck_core::session::Session;
use droidcheck_core::suites::tasks;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// CLI for Android UI acceptance testing over a WebDriver endpoint.
#[derive(Parser)]
#[command(name = "droidcheck")]
#[command(about = "Run Android UI acceptance scenarios against an Appium endpoint")]
#[command(version)]
struct Cli {
    /// WebDriver endpoint URL (overrides the config file)
    #[arg(short, long, env = "DROIDCHECK_URL", global = true)]
    url: Option<String>,

    /// Config file to use instead of ~/.droidcheck/config.json
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format: text or json
    #[arg(short, long, default_value = "text", global = true)]
    format: OutputFormat,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Run the Tasks scenario chain
    Run {
        /// Implicit wait for element lookups, in seconds
        #[arg(long)]
        implicit_wait: Option<u64>,
        /// How long a swipe holds before moving, in milliseconds
        #[arg(long)]
        press_ms: Option<u64>,
        /// Pause after each swipe, in milliseconds
        #[arg(long)]
        settle_ms: Option<u64>,
        /// Inset from the element edges for swipes, in pixels
        #[arg(long)]
        edge_border: Option<i64>,
        /// Fail the scenario when a touch action fails
        #[arg(long)]
        strict_gestures: bool,
        /// Also write the JSON report to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// List scenarios in execution order
    List,

    /// Swipe inside one element
    Swipe {
        #[command(flatten)]
        target: Target,
        /// Direction: up, down, left, right
        direction: String,
    },
}

/// Exactly one way to locate the element.
#[derive(clap::Args)]
#[group(required = true, multiple = false)]
struct Target {
    /// Android resource id
    #[arg(long)]
    id: Option<String>,
    /// XPath through the view hierarchy
    #[arg(long)]
    xpath: Option<String>,
    /// Accessibility id (content description)
    #[arg(long)]
    accessibility_id: Option<String>,
}

impl Target {
    fn locator(&self) -> Result<Locator, CliError> {
        match (&self.id, &self.xpath, &self.accessibility_id) {
            (Some(id), None, None) => Ok(Locator::id(id)),
            (None, Some(path), None) => Ok(Locator::xpath(path)),
            (None, None, Some(id)) => Ok(Locator::accessibility_id(id)),
            _ => Err(CliError::Usage(
                "exactly one of --id, --xpath or --accessibility-id is required".to_string(),
            )),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(3)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let _guard = match init_tracing(cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", e);
            return e.exit_code();
        }
    };

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

/// Logs go to stderr, or to `log_file` through a non-blocking appender whose
/// guard must outlive the run.
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>, CliError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    let file_name = path
        .file_name()
        .ok_or_else(|| CliError::Usage(format!("invalid log file path: {}", path.display())))?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)
        .map_err(|e| CliError::Usage(format!("cannot create log directory {}: {}", dir.display(), e)))?;

    let file_appender = tracing_appender::rolling::never(&dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();
    Ok(Some(guard))
}

#[derive(Debug)]
enum CliError {
    Connection(String),
    Failed(String),
    Usage(String),
}

impl CliError {
    fn code(&self) -> u8 {
        match self {
            CliError::Connection(_) => 2,
            CliError::Failed(_) => 1,
            CliError::Usage(_) => 3,
        }
    }

    fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Connection(msg) => write!(f, "Connection error: {}", msg),
            CliError::Failed(msg) => write!(f, "Failed: {}", msg),
            CliError::Usage(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl From<DriverError> for CliError {
    fn from(e: DriverError) -> Self {
        if e.is_connection_error() {
            CliError::Connection(e.to_string())
        } else {
            CliError::Failed(e.to_string())
        }
    }
}

fn load_config(cli: &Cli) -> Result<HarnessConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => HarnessConfig::load_from(path).map_err(|e| CliError::Usage(e.to_string()))?,
        None => HarnessConfig::load(),
    };
    if let Some(url) = &cli.url {
        config.endpoint = url.clone();
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<ExitCode, CliError> {
    match &cli.command {
        Command::List => list(&cli),
        Command::Run {
            implicit_wait,
            press_ms,
            settle_ms,
            edge_border,
            strict_gestures,
            report,
        } => {
            let mut config = load_config(&cli)?;
            if let Some(secs) = implicit_wait {
                config.implicit_wait_secs = *secs;
            }
            if let Some(ms) = press_ms {
                config.gestures.press_hold_ms = *ms;
            }
            if let Some(ms) = settle_ms {
                config.gestures.settle_ms = *ms;
            }
            if let Some(px) = edge_border {
                config.gestures.edge_border = *px;
            }
            if *strict_gestures {
                config.gestures.best_effort = false;
            }
            run_suite(&cli, &config, report.as_deref()).await
        }
        Command::Swipe { target, direction } => {
            // A bad direction is a usage error, reported before any session is opened.
            direction
                .parse::<Direction>()
                .map_err(|e: GestureError| CliError::Usage(e.to_string()))?;
            let locator = target.locator()?;
            let config = load_config(&cli)?;
            swipe(&cli, &config, &locator, direction).await
        }
    }
}

fn list(cli: &Cli) -> Result<ExitCode, CliError> {
    let chain = tasks::chain().map_err(|e| CliError::Usage(e.to_string()))?;

    if cli.format == OutputFormat::Json {
        let scenarios: Vec<_> = chain
            .scenarios()
            .iter()
            .map(|s| serde_json::json!({ "name": s.name(), "prerequisites": s.prerequisites() }))
            .collect();
        println!("{}", serde_json::Value::Array(scenarios));
    } else {
        for (i, scenario) in chain.scenarios().iter().enumerate() {
            if scenario.prerequisites().is_empty() {
                println!("{}. {}", i + 1, scenario.name());
            } else {
                println!(
                    "{}. {} (after {})",
                    i + 1,
                    scenario.name(),
                    scenario.prerequisites().join(", ")
                );
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn gestures_for(config: &HarnessConfig) -> GestureSynthesizer {
    GestureSynthesizer::new(config.gestures.to_timing()).with_policy(config.gestures.policy())
}

/// Cancels the returned token on the first Ctrl-C.
fn interrupt_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing the current scenario");
            on_signal.cancel();
        }
    });
    token
}

async fn run_suite(
    cli: &Cli,
    config: &HarnessConfig,
    report_path: Option<&Path>,
) -> Result<ExitCode, CliError> {
    let chain = tasks::chain().map_err(|e| CliError::Usage(e.to_string()))?;
    let gestures = gestures_for(config);
    let interrupt = interrupt_on_ctrl_c();

    let session = Session::start(config.to_session_config()).await?;
    let report = run_in_session(session, &chain, gestures, interrupt).await;

    if let Some(path) = report_path {
        write_report(&report, path)?;
        info!(path = %path.display(), "report written");
    }

    if cli.format == OutputFormat::Json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::Failed(format!("failed to encode report: {}", e)))?;
        println!("{}", json);
    } else {
        println!("{}", report.to_text());
    }

    Ok(if report.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn write_report(report: &RunReport, path: &Path) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| CliError::Failed(format!("failed to encode report: {}", e)))?;
    std::fs::write(path, json)
        .map_err(|e| CliError::Failed(format!("failed to write report {}: {}", path.display(), e)))
}

async fn swipe(
    cli: &Cli,
    config: &HarnessConfig,
    locator: &Locator,
    direction: &str,
) -> Result<ExitCode, CliError> {
    let gestures = gestures_for(config).with_interrupt(interrupt_on_ctrl_c());
    let session = Session::start(config.to_session_config()).await?;

    let driver = session.driver();
    let result = match driver.find_element(locator).await {
        Ok(element) => gestures
            .swipe_named(driver.as_ref(), &element, direction)
            .await
            .map_err(|e| CliError::Failed(e.to_string())),
        Err(e) => Err(CliError::from(e)),
    };
    drop(driver);

    if let Err(e) = session.stop().await {
        warn!(error = %e, "failed to stop session");
    }

    let outcome = result?;
    let error = match &outcome {
        GestureOutcome::Performed => None,
        GestureOutcome::TransportFailed(reason) => Some(reason.as_str()),
    };

    if cli.format == OutputFormat::Json {
        println!(
            "{}",
            serde_json::json!({
                "success": error.is_none(),
                "direction": direction.to_ascii_lowercase(),
                "locator": locator,
                "error": error,
            })
        );
    } else if let Some(reason) = error {
        eprintln!("swipe {} on {} failed: {}", direction.to_ascii_lowercase(), locator, reason);
    } else {
        println!("swiped {} on {}", direction.to_ascii_lowercase(), locator);
    }

    Ok(if outcome.is_performed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_swipe_target() {
        let cli = Cli::try_parse_from(["droidcheck", "swipe", "--xpath", "//row", "left"]).unwrap();
        match cli.command {
            Command::Swipe { target, direction } => {
                assert_eq!(target.locator().unwrap(), Locator::xpath("//row"));
                assert_eq!(direction, "left");
            }
            _ => panic!("expected swipe"),
        }
    }

    #[test]
    fn test_cli_rejects_two_targets() {
        assert!(Cli::try_parse_from(["droidcheck", "swipe", "--id", "a", "--xpath", "b", "up"]).is_err());
    }

    #[test]
    fn test_driver_error_exit_codes() {
        let conn: CliError = DriverError::ConnectionFailed("refused".into()).into();
        assert_eq!(conn.code(), 2);
        let other: CliError = DriverError::Timeout.into();
        assert_eq!(other.code(), 1);
    }
}
