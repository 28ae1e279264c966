//! End-of-run summary.
//!
//! Computes the figures reported after a run and formats human-readable lines for text
//! mode. The same `RunSummary` is serialized for `--json` and `--export-json`.

use crate::metrics;
use crate::model::{RunConfig, RunStats, RunSummary};
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

pub(crate) fn build_summary(
    config: &RunConfig,
    stats: &RunStats,
    observed_duration: Duration,
) -> RunSummary {
    let pct = metrics::response_percentiles(&stats.response_times_ms);
    let timestamp_utc = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default();

    RunSummary {
        timestamp_utc,
        target_url: config.target_url.clone(),
        user_count: config.user_count,
        declared_duration: config.declared_duration(),
        observed_duration,
        total_requests: stats.total_requests,
        successful_requests: stats.successful_requests,
        failed_requests: stats.failed_requests,
        success_rate: metrics::success_rate(stats.successful_requests, stats.total_requests),
        avg_response_ms: metrics::average_response_ms(&stats.response_times_ms),
        min_response_ms: pct.map(|p| p.min),
        max_response_ms: pct.map(|p| p.max),
        p50_response_ms: pct.map(|p| p.p50),
        p95_response_ms: pct.map(|p| p.p95),
        p99_response_ms: pct.map(|p| p.p99),
        last_error: stats.recent_errors.last().cloned(),
    }
}

/// Build a text summary from a finished run.
pub(crate) fn build_text_summary(summary: &RunSummary) -> TextSummary {
    let mut lines = Vec::new();

    lines.push(format!("Target: {}", summary.target_url));
    lines.push(format!(
        "Users: {}  Duration: {} declared, {} observed",
        summary.user_count,
        humantime::format_duration(summary.declared_duration),
        humantime::format_duration(Duration::from_secs(summary.observed_duration.as_secs())),
    ));
    lines.push(format!(
        "Requests: {} total, {} successful, {} failed ({:.1}% success)",
        summary.total_requests,
        summary.successful_requests,
        summary.failed_requests,
        summary.success_rate
    ));

    let fmt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |ms| format!("{ms:.2}"));
    lines.push(format!(
        "Response time: avg {:.2} min {} max {} ms",
        summary.avg_response_ms,
        fmt(summary.min_response_ms),
        fmt(summary.max_response_ms)
    ));
    lines.push(format!(
        "Percentiles: p50 {} p95 {} p99 {} ms",
        fmt(summary.p50_response_ms),
        fmt(summary.p95_response_ms),
        fmt(summary.p99_response_ms)
    ));

    if let Some(err) = summary.last_error.as_deref() {
        if !err.trim().is_empty() {
            lines.push(format!("Last error: {err}"));
        }
    }

    TextSummary { lines }
}

pub(crate) fn export_json(path: &Path, summary: &RunSummary) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let json = serde_json::to_vec_pretty(summary).context("serialize run summary")?;
    std::fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RunConfig {
        RunConfig {
            target_url: "http://localhost:3000".into(),
            user_count: 10,
            duration_secs: 30,
            ramp_up_secs: 5,
        }
    }

    fn stats() -> RunStats {
        RunStats {
            total_requests: 4,
            successful_requests: 3,
            failed_requests: 1,
            response_times_ms: vec![100.0, 200.0, 300.0],
            recent_errors: vec!["User 1: timeout".into()],
        }
    }

    #[test]
    fn summary_figures() {
        let s = build_summary(&config(), &stats(), Duration::from_secs(31));
        assert_eq!(s.success_rate, 75.0);
        assert_eq!(s.avg_response_ms, 200.0);
        assert_eq!(s.min_response_ms, Some(100.0));
        assert_eq!(s.max_response_ms, Some(300.0));
        assert_eq!(s.last_error.as_deref(), Some("User 1: timeout"));
    }

    #[test]
    fn empty_run_has_no_percentiles() {
        let s = build_summary(&config(), &RunStats::default(), Duration::ZERO);
        assert_eq!(s.success_rate, 0.0);
        assert!(s.p50_response_ms.is_none());
        let text = build_text_summary(&s);
        assert!(text.lines.iter().any(|l| l.contains("min - max -")));
        assert!(!text.lines.iter().any(|l| l.starts_with("Last error")));
    }

    #[test]
    fn text_lines_carry_counts() {
        let s = build_summary(&config(), &stats(), Duration::from_millis(30_400));
        let text = build_text_summary(&s);
        assert_eq!(text.lines[0], "Target: http://localhost:3000");
        assert_eq!(text.lines[1], "Users: 10  Duration: 30s declared, 30s observed");
        assert_eq!(
            text.lines[2],
            "Requests: 4 total, 3 successful, 1 failed (75.0% success)"
        );
        assert_eq!(text.lines.last().unwrap(), "Last error: User 1: timeout");
    }

    #[test]
    fn export_writes_readable_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/summary.json");
        let s = build_summary(&config(), &stats(), Duration::from_secs(30));
        export_json(&path, &s).unwrap();
        let back: RunSummary = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(back.total_requests, 4);
        assert_eq!(back.declared_duration, Duration::from_secs(30));
    }
}
