//! In-process fake of the load-test engine for controller and client tests.

use crate::engine::wire::{
    PATH_PAUSE, PATH_REPORT, PATH_START, PATH_STATS, PATH_STOP, PATH_UPDATE_CONFIG,
};
use crate::model::RunStats;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub const REPORT_BYTES: &[u8] = b"%PDF-1.4 fake report";

#[derive(Debug)]
struct Inner {
    running: bool,
    paused: bool,
    /// Word used in the pause-toggle answer when resuming.
    resume_word: &'static str,
    start_reply: (StatusCode, Value),
    stats: RunStats,
    stats_failing: bool,
    stats_delay: Duration,
    last_start: Option<Value>,
    last_update: Option<Value>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            running: false,
            paused: false,
            resume_word: "resumed",
            start_reply: (
                StatusCode::OK,
                json!({"status": "started", "message": "Stress test started successfully"}),
            ),
            stats: RunStats::default(),
            stats_failing: false,
            stats_delay: Duration::ZERO,
            last_start: None,
            last_update: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeEngineState {
    inner: Arc<Mutex<Inner>>,
    start_hits: Arc<AtomicU64>,
    stats_hits: Arc<AtomicU64>,
    stats_in_flight: Arc<AtomicU64>,
    stats_max_in_flight: Arc<AtomicU64>,
}

impl FakeEngineState {
    fn with<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut guard)
    }

    pub fn start_hits(&self) -> u64 {
        self.start_hits.load(Ordering::SeqCst)
    }

    pub fn stats_hits(&self) -> u64 {
        self.stats_hits.load(Ordering::SeqCst)
    }

    /// Highest number of stats requests the engine has served at the same time.
    pub fn max_stats_in_flight(&self) -> u64 {
        self.stats_max_in_flight.load(Ordering::SeqCst)
    }

    pub fn set_stats(&self, stats: RunStats) {
        self.with(|i| i.stats = stats);
    }

    pub fn set_running(&self, running: bool) {
        self.with(|i| i.running = running);
    }

    pub fn set_stats_failing(&self, failing: bool) {
        self.with(|i| i.stats_failing = failing);
    }

    pub fn set_stats_delay(&self, delay: Duration) {
        self.with(|i| i.stats_delay = delay);
    }

    pub fn set_resume_word(&self, word: &'static str) {
        self.with(|i| i.resume_word = word);
    }

    pub fn reject_start(&self, message: &str) {
        self.with(|i| i.start_reply = (StatusCode::OK, json!({"status": "error", "message": message})));
    }

    pub fn reject_start_with_status(&self, status: u16, message: &str) {
        let code = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_REQUEST);
        self.with(|i| i.start_reply = (code, json!({"status": "error", "message": message})));
    }

    pub fn last_start(&self) -> Option<Value> {
        self.with(|i| i.last_start.clone())
    }

    pub fn last_update(&self) -> Option<Value> {
        self.with(|i| i.last_update.clone())
    }
}

async fn handle_start(State(state): State<FakeEngineState>, Json(body): Json<Value>) -> Response {
    state.start_hits.fetch_add(1, Ordering::SeqCst);
    let (code, reply) = state.with(|i| {
        i.last_start = Some(body);
        if i.start_reply.0.is_success() && i.start_reply.1["status"] == "started" {
            i.running = true;
            i.paused = false;
        }
        i.start_reply.clone()
    });
    (code, Json(reply)).into_response()
}

async fn handle_pause(State(state): State<FakeEngineState>) -> Json<Value> {
    let status = state.with(|i| {
        i.paused = !i.paused;
        if i.paused {
            "paused"
        } else {
            i.resume_word
        }
    });
    Json(json!({ "status": status }))
}

async fn handle_stop(State(state): State<FakeEngineState>) -> Json<Value> {
    state.with(|i| {
        i.running = false;
        i.paused = false;
    });
    Json(json!({"status": "stopped", "message": "Test stopped successfully"}))
}

async fn handle_update(State(state): State<FakeEngineState>, Json(body): Json<Value>) -> Json<Value> {
    state.with(|i| i.last_update = Some(body.clone()));
    Json(json!({"status": "updated", "config": body}))
}

/// Decrements the in-flight count even when the client abandons the request.
struct InFlight(Arc<AtomicU64>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn handle_stats(State(state): State<FakeEngineState>) -> Response {
    state.stats_hits.fetch_add(1, Ordering::SeqCst);
    let now = state.stats_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state.stats_max_in_flight.fetch_max(now, Ordering::SeqCst);
    let _in_flight = InFlight(state.stats_in_flight.clone());
    let (delay, failing) = state.with(|i| (i.stats_delay, i.stats_failing));
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    if failing {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    let body = state.with(|i| {
        json!({
            "status": {"running": i.running, "paused": i.paused},
            "stats": i.stats,
        })
    });
    Json(body).into_response()
}

async fn handle_report() -> Response {
    ([(header::CONTENT_TYPE, "application/pdf")], REPORT_BYTES).into_response()
}

fn router(state: FakeEngineState) -> Router {
    Router::new()
        .route(PATH_START, post(handle_start))
        .route(PATH_PAUSE, post(handle_pause))
        .route(PATH_STOP, post(handle_stop))
        .route(PATH_UPDATE_CONFIG, post(handle_update))
        .route(PATH_STATS, get(handle_stats))
        .route(PATH_REPORT, post(handle_report))
        .with_state(state)
}

pub struct FakeEngine {
    base_url: String,
    state: FakeEngineState,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl FakeEngine {
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = FakeEngineState::default();
        let app = router(state.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = serve.await;
        });

        Ok(Self {
            base_url: format!("http://{addr}"),
            state,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn state(&self) -> &FakeEngineState {
        &self.state
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for FakeEngine {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// An address nothing is listening on.
pub async fn unreachable_base_url() -> String {
    let listener = match TcpListener::bind("127.0.0.1:0").await {
        Ok(l) => l,
        Err(_) => return "http://127.0.0.1:9".into(),
    };
    let addr = listener.local_addr().map(|a| a.to_string()).unwrap_or_default();
    drop(listener);
    format!("http://{addr}")
}
