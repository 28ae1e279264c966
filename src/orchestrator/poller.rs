//! Status poller.
//!
//! Fetches a stats snapshot once per period while a run is live. The fetch is awaited
//! before the next tick is taken, so at most one request is outstanding. The task ends
//! on its own when the engine reports the run finished or when the consecutive-failure
//! threshold is reached; the controller can also cancel it at any time.

use crate::engine::EngineClient;
use crate::error::ControllerError;
use crate::model::RunStats;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// `interval_at` rejects a zero period.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy)]
pub(crate) struct PollerSettings {
    pub interval: Duration,
    pub failure_threshold: u32,
}

/// A poll result tagged with the generation of the poller that produced it.
#[derive(Debug)]
pub(crate) struct PollMessage {
    pub generation: u64,
    pub update: PollUpdate,
}

#[derive(Debug)]
pub(crate) enum PollUpdate {
    Snapshot { stats: RunStats, running: bool },
    FetchFailed { consecutive: u32, error: ControllerError },
    ConnectivityLost { failures: u32 },
}

/// Handle to a live polling task.
pub(crate) struct Poller {
    generation: u64,
    handle: JoinHandle<()>,
}

impl Poller {
    pub fn spawn(
        client: EngineClient,
        settings: PollerSettings,
        generation: u64,
        tx: UnboundedSender<PollMessage>,
    ) -> Self {
        debug!(generation, interval = ?settings.interval, "starting status poller");
        let handle = tokio::spawn(poll_loop(client, settings, generation, tx));
        Self { generation, handle }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Abort the task. Its timer is dropped with it and an in-flight fetch is abandoned.
    pub fn cancel(self) {
        debug!(generation = self.generation, "cancelling status poller");
        self.handle.abort();
    }
}

async fn poll_loop(
    client: EngineClient,
    settings: PollerSettings,
    generation: u64,
    tx: UnboundedSender<PollMessage>,
) {
    let threshold = settings.failure_threshold.max(1);
    let period = settings.interval.max(MIN_POLL_INTERVAL);
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut failures = 0u32;

    loop {
        ticker.tick().await;

        let update = match client.fetch_stats().await {
            Ok(resp) => {
                failures = 0;
                PollUpdate::Snapshot {
                    stats: resp.stats,
                    running: resp.status.running,
                }
            }
            Err(error) => {
                failures += 1;
                warn!(generation, failures, "error polling stats: {error}");
                PollUpdate::FetchFailed {
                    consecutive: failures,
                    error,
                }
            }
        };

        let finished = matches!(update, PollUpdate::Snapshot { running: false, .. });
        if tx.send(PollMessage { generation, update }).is_err() {
            break;
        }
        if finished {
            debug!(generation, "engine reports run finished, poller exiting");
            break;
        }
        if failures >= threshold {
            let _ = tx.send(PollMessage {
                generation,
                update: PollUpdate::ConnectivityLost { failures },
            });
            break;
        }
    }
}
