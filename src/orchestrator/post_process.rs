//! Post-run processing utilities.
//!
//! Builds the run summary once a run has ended and handles the optional JSON export.

use super::controller::RunController;
use crate::model::RunSummary;
use crate::summary;
use std::path::Path;

/// Result of post-run processing, ready for presentation layers.
pub(crate) struct ProcessedRun {
    pub summary: RunSummary,
    pub export_messages: Vec<String>,
}

/// Summarize the controller's last run and export it if requested.
///
/// Returns `None` when no run was ever acknowledged by the engine.
pub(crate) fn process_run_completion(
    controller: &RunController,
    export_json: Option<&Path>,
) -> Option<ProcessedRun> {
    let config = controller.config()?;
    let stats = controller.last_stats().cloned().unwrap_or_default();
    let summary = summary::build_summary(config, &stats, controller.observed_duration());

    let mut export_messages = Vec::new();
    if let Some(export_path) = export_json {
        match summary::export_json(export_path, &summary) {
            Ok(_) => export_messages.push(format!("Exported JSON: {}", export_path.display())),
            Err(e) => export_messages.push(format!("Export JSON failed: {e:#}")),
        }
    }

    Some(ProcessedRun {
        summary,
        export_messages,
    })
}
