//! Presentation state projected from controller events.
//!
//! Every surface (terminal dashboard, headless text output) folds the same event stream
//! through a `Dashboard`, so counters, chart window and control enablement are computed
//! in one place.

use crate::metrics::{self, CHART_WINDOW};
use crate::model::{ControllerEvent, ElapsedWindow, LogEntry, Progress, RunStats, RunStatus};
use std::path::PathBuf;
use std::time::Instant;

/// Which run controls may be used right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub start_enabled: bool,
    pub pause_enabled: bool,
    pub stop_enabled: bool,
    pub report_enabled: bool,
    pub pause_label: &'static str,
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub status: RunStatus,
    /// A dispatcher request is outstanding.
    pub busy: bool,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub average_ms: f64,
    /// Most recent response times, oldest first.
    pub chart: Vec<f64>,
    pub log: Vec<LogEntry>,
    pub last_report: Option<PathBuf>,
    progress: Option<ElapsedWindow>,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self {
            status: RunStatus::Idle,
            busy: false,
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            average_ms: 0.0,
            chart: Vec::new(),
            log: Vec::new(),
            last_report: None,
            progress: None,
        }
    }
}

impl Dashboard {
    pub fn apply(&mut self, ev: ControllerEvent) {
        match ev {
            ControllerEvent::Log(entry) => self.log.push(entry),
            ControllerEvent::LogCleared => self.log.clear(),
            ControllerEvent::StatusChanged(status) => self.status = status,
            ControllerEvent::Busy(busy) => self.busy = busy,
            ControllerEvent::Reset => self.reset_displays(),
            ControllerEvent::ProgressShown(window) => self.progress = Some(window),
            ControllerEvent::DurationUpdated(declared) => {
                if let Some(w) = self.progress.as_mut() {
                    w.declared = declared;
                }
            }
            ControllerEvent::ProgressHidden => self.progress = None,
            ControllerEvent::Snapshot(stats) => self.apply_snapshot(&stats),
            ControllerEvent::ReportSaved(path) => self.last_report = Some(path),
        }
    }

    fn reset_displays(&mut self) {
        self.total_requests = 0;
        self.successful_requests = 0;
        self.failed_requests = 0;
        self.average_ms = 0.0;
        self.chart.clear();
    }

    fn apply_snapshot(&mut self, stats: &RunStats) {
        self.total_requests = stats.total_requests;
        self.successful_requests = stats.successful_requests;
        self.failed_requests = stats.failed_requests;
        // an empty snapshot keeps the last chart and average on screen
        if !stats.response_times_ms.is_empty() {
            self.average_ms = metrics::average_response_ms(&stats.response_times_ms);
            self.chart = metrics::last_n(&stats.response_times_ms, CHART_WINDOW).to_vec();
        }
    }

    pub fn average_display(&self) -> String {
        if self.average_ms == 0.0 {
            "0ms".into()
        } else {
            format!("{:.2}ms", self.average_ms)
        }
    }

    /// Chart x-axis labels, always `T1..Tn` for the visible window.
    pub fn chart_labels(&self) -> Vec<String> {
        (1..=self.chart.len()).map(|i| format!("T{i}")).collect()
    }

    /// Success and failure counts, in that order.
    pub fn distribution(&self) -> [u64; 2] {
        [self.successful_requests, self.failed_requests]
    }

    pub fn progress_window(&self) -> Option<ElapsedWindow> {
        self.progress
    }

    pub fn progress_at(&self, now: Instant) -> Option<Progress> {
        self.progress.map(|w| w.progress_at(now))
    }

    pub fn controls(&self) -> Controls {
        let active = self.status.is_active();
        let idle = !self.busy;
        Controls {
            start_enabled: idle && !active,
            pause_enabled: idle && active,
            stop_enabled: idle && active,
            report_enabled: idle && self.status == RunStatus::Stopped,
            pause_label: if self.status == RunStatus::Paused {
                "Resume"
            } else {
                "Pause"
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Severity;
    use std::time::Duration;

    fn snapshot(times: Vec<f64>) -> ControllerEvent {
        ControllerEvent::Snapshot(RunStats {
            total_requests: 12,
            successful_requests: 10,
            failed_requests: 2,
            response_times_ms: times,
            recent_errors: Vec::new(),
        })
    }

    #[test]
    fn snapshot_projects_counters_and_window() {
        let mut d = Dashboard::default();
        d.apply(snapshot((1..=12).map(f64::from).collect()));
        assert_eq!(d.total_requests, 12);
        assert_eq!(d.distribution(), [10, 2]);
        assert_eq!(d.chart, (3..=12).map(f64::from).collect::<Vec<_>>());
        assert_eq!(d.chart_labels().first().map(String::as_str), Some("T1"));
        assert_eq!(d.chart_labels().last().map(String::as_str), Some("T10"));
        assert_eq!(d.average_display(), "6.50ms");
    }

    #[test]
    fn empty_samples_keep_previous_chart() {
        let mut d = Dashboard::default();
        d.apply(snapshot(vec![100.0, 200.0, 300.0]));
        d.apply(snapshot(Vec::new()));
        assert_eq!(d.chart, vec![100.0, 200.0, 300.0]);
        assert_eq!(d.average_display(), "200.00ms");
    }

    #[test]
    fn reset_clears_displays_but_not_log() {
        let mut d = Dashboard::default();
        d.apply(ControllerEvent::Log(LogEntry::new(Severity::Info, "hello")));
        d.apply(snapshot(vec![5.0]));
        d.apply(ControllerEvent::Reset);
        assert_eq!(d.total_requests, 0);
        assert_eq!(d.distribution(), [0, 0]);
        assert!(d.chart.is_empty());
        assert_eq!(d.average_display(), "0ms");
        assert_eq!(d.log.len(), 1);
    }

    #[test]
    fn controls_follow_status_and_busy() {
        let mut d = Dashboard::default();
        let c = d.controls();
        assert!(c.start_enabled && !c.pause_enabled && !c.stop_enabled && !c.report_enabled);

        d.apply(ControllerEvent::StatusChanged(RunStatus::Running));
        let c = d.controls();
        assert!(!c.start_enabled && c.pause_enabled && c.stop_enabled);
        assert_eq!(c.pause_label, "Pause");

        d.apply(ControllerEvent::Busy(true));
        let c = d.controls();
        assert!(!c.start_enabled && !c.pause_enabled && !c.stop_enabled && !c.report_enabled);

        d.apply(ControllerEvent::Busy(false));
        d.apply(ControllerEvent::StatusChanged(RunStatus::Paused));
        assert_eq!(d.controls().pause_label, "Resume");

        d.apply(ControllerEvent::StatusChanged(RunStatus::Stopped));
        let c = d.controls();
        assert!(c.start_enabled && c.report_enabled && !c.stop_enabled);
    }

    #[test]
    fn progress_visible_only_while_shown() {
        let mut d = Dashboard::default();
        let started = Instant::now();
        assert!(d.progress_at(started).is_none());

        d.apply(ControllerEvent::ProgressShown(ElapsedWindow::new(
            started,
            Duration::from_secs(10),
        )));
        let p = d.progress_at(started + Duration::from_secs(5)).unwrap();
        assert_eq!(p.percentage, 50.0);

        d.apply(ControllerEvent::DurationUpdated(Duration::from_secs(20)));
        let p = d.progress_at(started + Duration::from_secs(5)).unwrap();
        assert_eq!(p.percentage, 25.0);
        assert_eq!(p.remaining_secs, 15);

        d.apply(ControllerEvent::ProgressHidden);
        assert!(d.progress_at(started).is_none());
    }

    #[test]
    fn clear_log_empties_entries() {
        let mut d = Dashboard::default();
        d.apply(ControllerEvent::Log(LogEntry::new(Severity::Error, "boom")));
        d.apply(ControllerEvent::LogCleared);
        assert!(d.log.is_empty());
    }
}
