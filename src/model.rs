use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use time::OffsetDateTime;

/// Validated parameters for one run. Built from the form at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub target_url: String,
    pub user_count: u32,
    pub duration_secs: u64,
    pub ramp_up_secs: u64,
}

impl RunConfig {
    pub fn declared_duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

/// Raw, unvalidated form input as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunForm {
    pub target_url: String,
    pub users: String,
    pub duration: String,
    pub ramp_up: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Idle,
    Running,
    Paused,
    Stopped,
}

impl RunStatus {
    /// Running or paused: a run exists on the engine side.
    pub fn is_active(self) -> bool {
        matches!(self, RunStatus::Running | RunStatus::Paused)
    }

    pub fn label(self) -> &'static str {
        match self {
            RunStatus::Idle => "Ready",
            RunStatus::Running => "Running",
            RunStatus::Paused => "Paused",
            RunStatus::Stopped => "Stopped",
        }
    }
}

/// Full statistics snapshot reported by the engine on each poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    #[serde(default)]
    pub total_requests: u64,
    #[serde(default)]
    pub successful_requests: u64,
    #[serde(default)]
    pub failed_requests: u64,
    #[serde(default, rename = "response_times")]
    pub response_times_ms: Vec<f64>,
    #[serde(default, rename = "errors")]
    pub recent_errors: Vec<String>,
}

/// Local view of how far into the declared duration a run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElapsedWindow {
    pub started_at: Instant,
    pub declared: Duration,
}

impl ElapsedWindow {
    pub fn new(started_at: Instant, declared: Duration) -> Self {
        Self {
            started_at,
            declared,
        }
    }

    pub fn progress_at(&self, now: Instant) -> Progress {
        crate::metrics::compute_progress(now.saturating_duration_since(self.started_at), self.declared)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub elapsed_secs: u64,
    pub remaining_secs: u64,
    /// Always within 0..=100.
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: OffsetDateTime,
    pub message: String,
    pub severity: Severity,
}

impl LogEntry {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            timestamp: OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc()),
            message: message.into(),
            severity,
        }
    }

    /// Wall-clock time of day, e.g. `14:03:27`.
    pub fn clock(&self) -> String {
        self.timestamp
            .format(time::macros::format_description!("[hour]:[minute]:[second]"))
            .unwrap_or_else(|_| "--:--:--".into())
    }
}

/// Events emitted by the run controller and consumed by presentation layers.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    Log(LogEntry),
    LogCleared,
    StatusChanged(RunStatus),
    /// A dispatcher request is in flight (true) or has resolved (false).
    Busy(bool),
    /// Displays reset ahead of a new run.
    Reset,
    ProgressShown(ElapsedWindow),
    DurationUpdated(Duration),
    ProgressHidden,
    Snapshot(RunStats),
    ReportSaved(PathBuf),
}

/// End-of-run figures, printed in headless modes and exported as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default)]
    pub timestamp_utc: String,
    pub target_url: String,
    pub user_count: u32,
    #[serde(with = "humantime_serde")]
    pub declared_duration: Duration,
    #[serde(with = "humantime_serde")]
    pub observed_duration: Duration,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub success_rate: f64,
    pub avg_response_ms: f64,
    pub min_response_ms: Option<f64>,
    pub max_response_ms: Option<f64>,
    pub p50_response_ms: Option<f64>,
    pub p95_response_ms: Option<f64>,
    pub p99_response_ms: Option<f64>,
    #[serde(default)]
    pub last_error: Option<String>,
}
