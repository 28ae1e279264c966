//! JSON bodies exchanged with the load-test engine.

use crate::model::{RunConfig, RunStats};
use serde::{Deserialize, Serialize};

pub const PATH_START: &str = "/api/start-test";
pub const PATH_PAUSE: &str = "/api/pause-test";
pub const PATH_STOP: &str = "/api/stop-test";
pub const PATH_UPDATE_CONFIG: &str = "/api/update-config";
pub const PATH_STATS: &str = "/api/test-stats";
pub const PATH_REPORT: &str = "/api/generate-report";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRequest {
    pub url: String,
    pub users: u32,
    pub duration: u64,
    pub ramp_up: u64,
}

impl From<&RunConfig> for StartRequest {
    fn from(cfg: &RunConfig) -> Self {
        Self {
            url: cfg.target_url.clone(),
            users: cfg.user_count,
            duration: cfg.duration_secs,
            ramp_up: cfg.ramp_up_secs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateConfigRequest {
    pub users: u32,
    pub duration: u64,
}

/// Acknowledgement returned by every control endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl Ack {
    pub fn is(&self, status: &str) -> bool {
        self.status.eq_ignore_ascii_case(status)
    }

    /// Engine-supplied explanation, or a generic one naming the unexpected status.
    pub fn reason(&self) -> String {
        match self.message.as_deref() {
            Some(m) if !m.trim().is_empty() => m.to_string(),
            _ => format!("unexpected status `{}`", self.status),
        }
    }
}

/// Engine-side run state. Pause is tracked from control acknowledgements, not from here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    pub running: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsResponse {
    pub status: EngineState,
    #[serde(default)]
    pub stats: RunStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_response_tolerates_extra_and_missing_fields() {
        let body = r#"{
            "status": {"running": true, "paused": true},
            "stats": {"total_requests": 3, "successful_requests": 2, "failed_requests": 1,
                      "response_times": [10.5, 20.0], "timestamps": [1.0, 2.0],
                      "errors": ["User 0: HTTP 500"]},
            "config": {"url": "http://x", "users": 1}
        }"#;
        let parsed: StatsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.status, EngineState { running: true });
        assert_eq!(parsed.stats.total_requests, 3);
        assert_eq!(parsed.stats.response_times_ms, vec![10.5, 20.0]);
        assert_eq!(parsed.stats.recent_errors, vec!["User 0: HTTP 500".to_string()]);

        let sparse: StatsResponse =
            serde_json::from_str(r#"{"status": {"running": false}, "stats": {}}"#).unwrap();
        assert_eq!(sparse.stats, RunStats::default());
    }

    #[test]
    fn start_request_uses_engine_field_names() {
        let cfg = RunConfig {
            target_url: "http://localhost:3000".into(),
            user_count: 4,
            duration_secs: 30,
            ramp_up_secs: 5,
        };
        let v = serde_json::to_value(StartRequest::from(&cfg)).unwrap();
        assert_eq!(
            v,
            serde_json::json!({"url": "http://localhost:3000", "users": 4, "duration": 30, "ramp_up": 5})
        );
    }

    #[test]
    fn ack_reason_falls_back_to_status() {
        let ack = Ack { status: "error".into(), message: None };
        assert_eq!(ack.reason(), "unexpected status `error`");
        let ack = Ack { status: "error".into(), message: Some("URL unreachable".into()) };
        assert_eq!(ack.reason(), "URL unreachable");
    }
}
