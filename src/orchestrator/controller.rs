//! Run lifecycle controller.
//!
//! Owns run status, the active configuration and the status poller, dispatches control
//! requests to the engine and emits events for presentation layers.

use super::poller::{PollMessage, PollUpdate, Poller, PollerSettings};
use crate::engine::EngineClient;
use crate::error::{ControllerError, Result};
use crate::model::{
    ControllerEvent, ElapsedWindow, LogEntry, RunConfig, RunForm, RunStats, RunStatus, Severity,
};
use crate::validate;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

/// Only this many leading characters of an engine error are compared when deduplicating.
const ERROR_DEDUP_PREFIX: usize = 30;

/// Commands emitted by UI layers to control the run.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Start(RunForm),
    PauseResume,
    Stop,
    UpdateConfig { users: String, duration: String },
    DownloadReport,
    ClearLog,
    Quit,
}

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub engine_url: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub failure_threshold: u32,
    pub report_dir: PathBuf,
}

pub struct RunController {
    client: EngineClient,
    settings: ControllerSettings,
    status: RunStatus,
    config: Option<RunConfig>,
    window: Option<ElapsedWindow>,
    poller: Option<Poller>,
    generation: u64,
    poll_tx: UnboundedSender<PollMessage>,
    poll_rx: UnboundedReceiver<PollMessage>,
    event_tx: UnboundedSender<ControllerEvent>,
    last_logged: Option<String>,
    last_stats: Option<RunStats>,
    finished_at: Option<Instant>,
}

impl RunController {
    pub fn new(
        settings: ControllerSettings,
        event_tx: UnboundedSender<ControllerEvent>,
    ) -> Result<Self> {
        let client = EngineClient::new(settings.engine_url.clone(), settings.request_timeout)?;
        let (poll_tx, poll_rx) = mpsc::unbounded_channel();
        Ok(Self {
            client,
            settings,
            status: RunStatus::Idle,
            config: None,
            window: None,
            poller: None,
            generation: 0,
            poll_tx,
            poll_rx,
            event_tx,
            last_logged: None,
            last_stats: None,
            finished_at: None,
        })
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn config(&self) -> Option<&RunConfig> {
        self.config.as_ref()
    }

    pub fn window(&self) -> Option<ElapsedWindow> {
        self.window
    }

    pub fn last_stats(&self) -> Option<&RunStats> {
        self.last_stats.as_ref()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_some()
    }

    /// Wall-clock time from start acknowledgement to the end of the run (or now).
    pub fn observed_duration(&self) -> Duration {
        match self.window {
            Some(w) => self
                .finished_at
                .unwrap_or_else(Instant::now)
                .saturating_duration_since(w.started_at),
            None => Duration::ZERO,
        }
    }

    fn emit(&self, ev: ControllerEvent) {
        let _ = self.event_tx.send(ev);
    }

    fn log(&mut self, severity: Severity, message: impl Into<String>) {
        let entry = LogEntry::new(severity, message);
        debug!(?severity, "{}", entry.message);
        self.last_logged = Some(entry.message.clone());
        self.emit(ControllerEvent::Log(entry));
    }

    fn set_status(&mut self, status: RunStatus) {
        if self.status != status {
            info!(from = ?self.status, to = ?status, "run status changed");
        }
        self.status = status;
        self.emit(ControllerEvent::StatusChanged(status));
    }

    /// Validate the form and ask the engine to start a run. Polling begins on acknowledgement.
    pub async fn start(&mut self, form: &RunForm) -> Result<()> {
        if self.status.is_active() {
            self.log(Severity::Warning, "A test is already running");
            return Err(ControllerError::InvalidState("a test is already running"));
        }
        let cfg = match validate::validate_run_form(form) {
            Ok(cfg) => cfg,
            Err(e) => {
                self.log(Severity::Error, e.to_string());
                return Err(e);
            }
        };

        self.last_stats = None;
        self.emit(ControllerEvent::Reset);
        self.log(Severity::Info, "Initializing stress test...");

        self.emit(ControllerEvent::Busy(true));
        let res = self.client.start(&cfg).await;
        self.emit(ControllerEvent::Busy(false));

        match res {
            Ok(ack) if ack.is("started") => {
                self.log(
                    Severity::Success,
                    format!(
                        "Test started: {} users targeting {}",
                        cfg.user_count, cfg.target_url
                    ),
                );
                self.log(Severity::Info, format!("Duration: {} seconds", cfg.duration_secs));

                let window = ElapsedWindow::new(Instant::now(), cfg.declared_duration());
                self.window = Some(window);
                self.finished_at = None;
                self.config = Some(cfg);
                self.set_status(RunStatus::Running);
                self.emit(ControllerEvent::ProgressShown(window));
                self.spawn_poller();
                Ok(())
            }
            Ok(ack) => {
                let reason = ack.message.clone().unwrap_or_else(|| "Unknown error".into());
                self.log(Severity::Error, format!("Failed to start test: {reason}"));
                Err(ControllerError::EngineRejected(reason))
            }
            Err(ControllerError::EngineRejected(reason)) => {
                self.log(Severity::Error, format!("Failed to start test: {reason}"));
                Err(ControllerError::EngineRejected(reason))
            }
            Err(e) => {
                self.log(Severity::Error, format!("Error starting test: {e}"));
                Err(e)
            }
        }
    }

    /// Toggle pause on the engine; local status follows the engine's answer.
    pub async fn pause_or_resume(&mut self) -> Result<()> {
        if !self.status.is_active() {
            self.log(Severity::Warning, "No running test to pause");
            return Err(ControllerError::InvalidState("no running test to pause"));
        }

        self.emit(ControllerEvent::Busy(true));
        let res = self.client.toggle_pause().await;
        self.emit(ControllerEvent::Busy(false));

        match res {
            Ok(ack) if ack.is("paused") => {
                self.log(Severity::Warning, "Test paused");
                self.set_status(RunStatus::Paused);
                Ok(())
            }
            Ok(ack) if ack.is("running") || ack.is("resumed") => {
                self.log(Severity::Info, "Test resumed");
                self.set_status(RunStatus::Running);
                Ok(())
            }
            Ok(ack) => {
                let reason = ack.reason();
                self.log(Severity::Error, format!("Error pausing test: {reason}"));
                Err(ControllerError::EngineRejected(reason))
            }
            Err(e) => {
                self.log(Severity::Error, format!("Error pausing test: {e}"));
                Err(e)
            }
        }
    }

    /// Ask the engine to terminate the run. Status is left as-is if the request fails.
    pub async fn stop(&mut self) -> Result<()> {
        self.emit(ControllerEvent::Busy(true));
        let res = self.client.stop().await;
        self.emit(ControllerEvent::Busy(false));

        match res {
            Ok(ack) if ack.is("stopped") => {
                self.log(Severity::Info, "Test stopped");
                self.finish_run();
                Ok(())
            }
            Ok(ack) => {
                let reason = ack.reason();
                self.log(Severity::Error, format!("Error stopping test: {reason}"));
                Err(ControllerError::EngineRejected(reason))
            }
            Err(e) => {
                self.log(Severity::Error, format!("Error stopping test: {e}"));
                Err(e)
            }
        }
    }

    /// Send new user count and duration to an active run without restarting it.
    pub async fn update_config(&mut self, users: &str, duration: &str) -> Result<()> {
        let (user_count, duration_secs) = match validate::validate_update(users, duration) {
            Ok(v) => v,
            Err(e) => {
                self.log(Severity::Error, e.to_string());
                return Err(e);
            }
        };
        if !self.status.is_active() {
            self.log(
                Severity::Warning,
                format!(
                    "No active test; {user_count} users, {duration_secs}s will apply to the next start"
                ),
            );
            return Ok(());
        }

        self.emit(ControllerEvent::Busy(true));
        let res = self.client.update_config(user_count, duration_secs).await;
        self.emit(ControllerEvent::Busy(false));

        match res {
            Ok(ack) if ack.is("updated") => {
                self.log(
                    Severity::Info,
                    format!("Configuration updated: {user_count} users, {duration_secs}s duration"),
                );
                if let Some(cfg) = self.config.as_mut() {
                    cfg.user_count = user_count;
                    cfg.duration_secs = duration_secs;
                }
                let declared = Duration::from_secs(duration_secs);
                if let Some(w) = self.window.as_mut() {
                    w.declared = declared;
                }
                self.emit(ControllerEvent::DurationUpdated(declared));
                Ok(())
            }
            Ok(ack) => {
                let reason = ack.reason();
                self.log(Severity::Error, format!("Error updating configuration: {reason}"));
                Err(ControllerError::EngineRejected(reason))
            }
            Err(e) => {
                self.log(Severity::Error, format!("Error updating configuration: {e}"));
                Err(e)
            }
        }
    }

    /// Fetch the engine's PDF report for the finished run and write it to the report directory.
    pub async fn download_report(&mut self) -> Result<PathBuf> {
        if self.status != RunStatus::Stopped {
            self.log(Severity::Warning, "Report is available once a test has finished");
            return Err(ControllerError::InvalidState(
                "report is available once a test has finished",
            ));
        }
        self.log(Severity::Info, "Generating PDF report...");

        self.emit(ControllerEvent::Busy(true));
        let res = self.client.generate_report().await;
        self.emit(ControllerEvent::Busy(false));

        let written = match res {
            Ok(bytes) => write_report(&self.settings.report_dir, &bytes),
            Err(e) => Err(e),
        };
        match written {
            Ok(path) => {
                self.log(
                    Severity::Success,
                    format!("Report downloaded successfully: {}", path.display()),
                );
                self.emit(ControllerEvent::ReportSaved(path.clone()));
                Ok(path)
            }
            Err(e) => {
                self.log(Severity::Error, format!("Error downloading report: {e}"));
                Err(e)
            }
        }
    }

    pub fn clear_log(&mut self) {
        self.last_logged = None;
        self.emit(ControllerEvent::LogCleared);
        self.log(Severity::Info, "Log cleared.");
    }

    /// Wait for the next message from the live poller.
    pub(crate) async fn next_poll(&mut self) -> Option<PollMessage> {
        self.poll_rx.recv().await
    }

    /// Apply a poll result, unless it belongs to a poller that has since been stopped.
    pub(crate) fn handle_poll(&mut self, msg: PollMessage) {
        let live = self
            .poller
            .as_ref()
            .is_some_and(|p| p.generation() == msg.generation);
        if !live {
            debug!(generation = msg.generation, "discarding stale poll result");
            return;
        }

        match msg.update {
            PollUpdate::Snapshot { stats, running } => {
                self.emit(ControllerEvent::Snapshot(stats.clone()));
                if let Some(err) = stats.recent_errors.last() {
                    if should_log_engine_error(self.last_logged.as_deref(), err) {
                        self.log(Severity::Warning, err.clone());
                    }
                }
                let (ok, failed) = (stats.successful_requests, stats.failed_requests);
                self.last_stats = Some(stats);

                if !running {
                    self.finish_run();
                    self.log(Severity::Success, "Test completed successfully");
                    self.log(Severity::Info, format!("Results: {ok} successful, {failed} failed"));
                }
            }
            PollUpdate::FetchFailed { consecutive, error } => {
                debug!(consecutive, "stats fetch failed: {error}");
            }
            PollUpdate::ConnectivityLost { failures } => {
                warn!(failures, "giving up on engine");
                self.finish_run();
                let e = ControllerError::ConnectivityLost { failures };
                self.log(Severity::Error, format!("{e}. Stopping test."));
            }
        }
    }

    /// Stop observing the engine without telling it anything, e.g. when the UI goes away.
    pub fn shutdown(&mut self) {
        if let Some(p) = self.poller.take() {
            p.cancel();
        }
        self.generation += 1;
    }

    fn spawn_poller(&mut self) {
        if let Some(p) = self.poller.take() {
            p.cancel();
        }
        self.generation += 1;
        let settings = PollerSettings {
            interval: self.settings.poll_interval,
            failure_threshold: self.settings.failure_threshold,
        };
        self.poller = Some(Poller::spawn(
            self.client.clone(),
            settings,
            self.generation,
            self.poll_tx.clone(),
        ));
    }

    fn finish_run(&mut self) {
        self.shutdown();
        if self.finished_at.is_none() && self.window.is_some() {
            self.finished_at = Some(Instant::now());
        }
        self.set_status(RunStatus::Stopped);
        self.emit(ControllerEvent::ProgressHidden);
    }
}

/// An engine error is worth logging unless the most recent log line already carries it.
fn should_log_engine_error(last_logged: Option<&str>, error: &str) -> bool {
    if error.is_empty() {
        return false;
    }
    let prefix: String = error.chars().take(ERROR_DEDUP_PREFIX).collect();
    !last_logged.is_some_and(|last| last.contains(&prefix))
}

fn write_report(dir: &std::path::Path, bytes: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let stamp = time::OffsetDateTime::now_local()
        .unwrap_or_else(|_| time::OffsetDateTime::now_utc())
        .format(time::macros::format_description!(
            "[year][month][day]_[hour][minute][second]"
        ))
        .unwrap_or_else(|_| "report".into());
    let path = dir.join(format!("stress_test_report_{stamp}.pdf"));
    std::fs::write(&path, bytes)?;
    Ok(path)
}

/// Serve UI commands and poll results until the UI quits.
pub(crate) async fn run_controller(
    mut controller: RunController,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                // Errors are already on the event log; the loop keeps serving.
                match cmd {
                    Some(UiCommand::Start(form)) => {
                        let _ = controller.start(&form).await;
                    }
                    Some(UiCommand::PauseResume) => {
                        let _ = controller.pause_or_resume().await;
                    }
                    Some(UiCommand::Stop) => {
                        let _ = controller.stop().await;
                    }
                    Some(UiCommand::UpdateConfig { users, duration }) => {
                        let _ = controller.update_config(&users, &duration).await;
                    }
                    Some(UiCommand::DownloadReport) => {
                        let _ = controller.download_report().await;
                    }
                    Some(UiCommand::ClearLog) => controller.clear_log(),
                    Some(UiCommand::Quit) | None => {
                        controller.shutdown();
                        break;
                    }
                }
            }
            Some(msg) = controller.next_poll() => {
                controller.handle_poll(msg);
            }
        }
    }
    Ok(())
}
