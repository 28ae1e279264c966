use crate::dashboard::Dashboard;
use crate::model::{ControllerEvent, LogEntry, RunForm, Severity};
use crate::orchestrator::{process_run_completion, ControllerSettings, RunController};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "stress-console",
    version,
    about = "Drive a remote HTTP load-test engine and watch the run live"
)]
pub struct Cli {
    /// Base URL of the load-test engine
    #[arg(long, env = "STRESS_CONSOLE_ENGINE_URL", default_value = "http://127.0.0.1:5000")]
    pub engine_url: String,

    /// Target URL to put under load
    #[arg(long, env = "STRESS_CONSOLE_TARGET_URL", default_value = "")]
    pub target_url: String,

    /// Number of concurrent simulated users
    #[arg(long, default_value = "10")]
    pub users: String,

    /// Run duration in seconds
    #[arg(long, default_value = "30")]
    pub duration: String,

    /// Seconds over which users are introduced (forwarded to the engine)
    #[arg(long, default_value = "5")]
    pub ramp_up: String,

    /// How often to poll the engine for statistics
    #[arg(long, default_value = "1s")]
    pub poll_interval: humantime::Duration,

    /// Deadline for each request to the engine
    #[arg(long, default_value = "5s")]
    pub request_timeout: humantime::Duration,

    /// Consecutive failed polls before the run is considered lost
    #[arg(long, default_value_t = 3)]
    pub failure_threshold: u32,

    /// Directory for downloaded PDF reports (defaults to the download directory)
    #[arg(long)]
    pub report_dir: Option<PathBuf>,

    /// Export the final run summary as JSON (headless modes)
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Write diagnostic traces to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Print JSON summary and exit (no TUI)
    #[arg(long, conflicts_with = "text")]
    pub json: bool,

    /// Print live log and text summary, then exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Start a run as soon as the dashboard opens
    #[arg(long)]
    pub start_on_launch: bool,
}

impl Cli {
    pub fn is_headless(&self) -> bool {
        self.json || self.text
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if !args.is_headless() {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_headless(args, false).await;
        }
    }

    let json = args.json;
    run_headless(args, json).await
}

/// Build `ControllerSettings` from CLI arguments.
pub fn build_settings(args: &Cli) -> Result<ControllerSettings> {
    let engine = url::Url::parse(args.engine_url.trim())
        .with_context(|| format!("invalid engine URL `{}`", args.engine_url))?;
    if !matches!(engine.scheme(), "http" | "https") {
        anyhow::bail!("engine URL must use http or https, got `{}`", engine.scheme());
    }

    let poll_interval = Duration::from(args.poll_interval);
    if poll_interval.is_zero() {
        anyhow::bail!("--poll-interval must be greater than zero");
    }
    let request_timeout = Duration::from(args.request_timeout);
    if request_timeout.is_zero() {
        anyhow::bail!("--request-timeout must be greater than zero");
    }

    let report_dir = match args.report_dir.clone() {
        Some(dir) => dir,
        None => dirs::download_dir()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    Ok(ControllerSettings {
        engine_url: args.engine_url.trim().to_string(),
        poll_interval,
        request_timeout,
        failure_threshold: args.failure_threshold,
        report_dir,
    })
}

/// Prefill for the run form. Values stay raw until validated at dispatch.
pub fn build_form(args: &Cli) -> RunForm {
    RunForm {
        target_url: args.target_url.clone(),
        users: args.users.clone(),
        duration: args.duration.clone(),
        ramp_up: args.ramp_up.clone(),
    }
}

fn format_log_line(entry: &LogEntry) -> String {
    let level = match entry.severity {
        Severity::Info => "INFO ",
        Severity::Success => "OK   ",
        Severity::Warning => "WARN ",
        Severity::Error => "ERROR",
    };
    format!("[{}] {level} {}", entry.clock(), entry.message)
}

/// Fold pending controller events into the dashboard, echoing log lines if asked.
/// Returns true if a stats snapshot was among them.
fn drain_events(
    evt_rx: &mut mpsc::UnboundedReceiver<ControllerEvent>,
    dashboard: &mut Dashboard,
    echo: Option<&mpsc::UnboundedSender<OutputLine>>,
) -> bool {
    let mut saw_snapshot = false;
    while let Ok(ev) = evt_rx.try_recv() {
        match &ev {
            ControllerEvent::Log(entry) => {
                if let Some(tx) = echo {
                    let _ = tx.send(OutputLine::Stderr(format_log_line(entry)));
                }
            }
            ControllerEvent::Snapshot(_) => saw_snapshot = true,
            _ => {}
        }
        dashboard.apply(ev);
    }
    saw_snapshot
}

fn progress_line(dashboard: &Dashboard, now: Instant) -> Option<String> {
    let p = dashboard.progress_at(now)?;
    Some(format!(
        "Progress: {}s elapsed, {}s remaining ({}%) | {} requests, {} ok, {} failed, avg {}",
        p.elapsed_secs,
        p.remaining_secs,
        p.percentage.floor() as u64,
        dashboard.total_requests,
        dashboard.successful_requests,
        dashboard.failed_requests,
        dashboard.average_display()
    ))
}

/// Run one test without the dashboard and report its summary.
/// `json` selects JSON output on stdout instead of the live log and text summary.
async fn run_headless(args: Cli, json: bool) -> Result<()> {
    let settings = build_settings(&args)?;
    let form = build_form(&args);
    let (out_tx, out_handle) = spawn_output_writer();
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<ControllerEvent>();
    let mut controller =
        RunController::new(settings, evt_tx).context("failed to create engine client")?;
    let mut dashboard = Dashboard::default();
    let echo = if json { None } else { Some(&out_tx) };

    let started = controller.start(&form).await;
    drain_events(&mut evt_rx, &mut dashboard, echo);
    if let Err(e) = started {
        drop(out_tx);
        let _ = out_handle.await;
        let context = if e.is_validation() {
            "invalid run parameters"
        } else {
            "test did not start"
        };
        return Err(anyhow::Error::new(e).context(context));
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    while controller.status().is_active() {
        tokio::select! {
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                if controller.stop().await.is_err() {
                    // engine unreachable: stop observing and report what we have
                    controller.shutdown();
                    drain_events(&mut evt_rx, &mut dashboard, echo);
                    break;
                }
            }
            Some(msg) = controller.next_poll() => {
                controller.handle_poll(msg);
            }
        }
        let snapshot = drain_events(&mut evt_rx, &mut dashboard, echo);
        if snapshot && !json {
            if let Some(line) = progress_line(&dashboard, Instant::now()) {
                let _ = out_tx.send(OutputLine::Stderr(line));
            }
        }
    }

    if let Some(processed) = process_run_completion(&controller, args.export_json.as_deref()) {
        if json {
            let out = serde_json::to_string_pretty(&processed.summary)?;
            let _ = out_tx.send(OutputLine::Stdout(out));
        } else {
            let text = crate::summary::build_text_summary(&processed.summary);
            for line in text.lines {
                let _ = out_tx.send(OutputLine::Stdout(line));
            }
        }
        for msg in processed.export_messages {
            let _ = out_tx.send(OutputLine::Stderr(msg));
        }
    }

    drop(out_tx);
    let _ = out_handle.await;

    match dashboard.log.last() {
        Some(entry) if entry.severity == Severity::Error => {
            Err(anyhow::anyhow!("run ended with an error: {}", entry.message))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_prefill_form() {
        let args = Cli::parse_from(["stress-console", "--target-url", "http://localhost:3000"]);
        let form = build_form(&args);
        assert_eq!(form.target_url, "http://localhost:3000");
        assert_eq!(form.users, "10");
        assert_eq!(form.duration, "30");
        assert_eq!(form.ramp_up, "5");
        assert!(!args.is_headless());
    }

    #[test]
    fn settings_parse_durations() {
        let args = Cli::parse_from([
            "stress-console",
            "--poll-interval",
            "250ms",
            "--request-timeout",
            "2s",
            "--failure-threshold",
            "5",
            "--report-dir",
            "/tmp/reports",
        ]);
        let s = build_settings(&args).unwrap();
        assert_eq!(s.poll_interval, Duration::from_millis(250));
        assert_eq!(s.request_timeout, Duration::from_secs(2));
        assert_eq!(s.failure_threshold, 5);
        assert_eq!(s.report_dir, PathBuf::from("/tmp/reports"));
    }

    #[test]
    fn bad_engine_url_is_a_startup_error() {
        let args = Cli::parse_from(["stress-console", "--engine-url", "ftp://engine"]);
        assert!(build_settings(&args).is_err());
        let args = Cli::parse_from(["stress-console", "--engine-url", "not a url"]);
        assert!(build_settings(&args).is_err());
    }

    #[test]
    fn zero_durations_are_startup_errors() {
        let args = Cli::parse_from(["stress-console", "--poll-interval", "0s"]);
        let err = build_settings(&args).unwrap_err();
        assert!(err.to_string().contains("--poll-interval"), "{err:#}");

        let args = Cli::parse_from(["stress-console", "--request-timeout", "0s"]);
        let err = build_settings(&args).unwrap_err();
        assert!(err.to_string().contains("--request-timeout"), "{err:#}");
    }

    #[test]
    fn json_and_text_conflict() {
        assert!(Cli::try_parse_from(["stress-console", "--json", "--text"]).is_err());
    }

    #[test]
    fn log_lines_carry_severity() {
        let entry = LogEntry::new(Severity::Warning, "Test paused");
        let line = format_log_line(&entry);
        assert!(line.ends_with("WARN  Test paused"));
        assert!(line.starts_with('['));
    }
}
