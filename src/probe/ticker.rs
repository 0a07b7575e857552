//! Periodic emitter backing a single probe.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::probe::FetchRequest;

/// Read-only snapshot of a live probe.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeInfo {
    pub id: String,
    pub url: String,
    /// Tick interval in milliseconds.
    #[serde(rename = "interval_ms", serialize_with = "serialize_millis")]
    pub interval: Duration,
    pub emitter_id: uuid::Uuid,
    pub started_at: DateTime<Utc>,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis().min(u64::MAX as u128) as u64)
}

/// A live probe: its definition plus the owned stop signal and task handle.
///
/// Dropping a `Probe` without calling [`Probe::stop`] leaves the task running,
/// so the registry always stops before discarding.
pub(crate) struct Probe {
    info: ProbeInfo,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Probe {
    /// Spawn the emitter task. The first tick fires one full `interval` after start.
    pub(crate) fn spawn(
        id: impl Into<String>,
        url: impl Into<String>,
        interval: Duration,
        requests: mpsc::Sender<FetchRequest>,
    ) -> Self {
        let info = ProbeInfo {
            id: id.into(),
            url: url.into(),
            interval,
            emitter_id: uuid::Uuid::new_v4(),
            started_at: Utc::now(),
        };
        let token = CancellationToken::new();
        let handle = tokio::spawn(run_emitter(info.clone(), requests, token.clone()));

        tracing::debug!(
            probe_id = %info.id,
            emitter_id = %info.emitter_id,
            interval_ms = interval.as_millis(),
            "Probe emitter started"
        );

        Self {
            info,
            token,
            handle,
        }
    }

    pub(crate) fn info(&self) -> &ProbeInfo {
        &self.info
    }

    /// Signal the emitter to stop and wait for its task to exit.
    ///
    /// Once this returns no further request from this emitter reaches the queue.
    /// A fetch already handed to a worker still runs to completion.
    pub(crate) async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            tracing::warn!(probe_id = %self.info.id, error = %e, "Probe emitter task failed");
        }
        tracing::debug!(
            probe_id = %self.info.id,
            emitter_id = %self.info.emitter_id,
            "Probe emitter stopped"
        );
    }
}

impl std::fmt::Debug for Probe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Probe")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

async fn run_emitter(
    info: ProbeInfo,
    requests: mpsc::Sender<FetchRequest>,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + info.interval, info.interval);
    // A blocked hand-off delays ticks; missed ones fire back to back instead of being dropped.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let request = FetchRequest {
            url: info.url.clone(),
            probe_id: info.id.clone(),
            emitter_id: info.emitter_id,
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            sent = requests.send(request) => {
                if sent.is_err() {
                    tracing::debug!(probe_id = %info.id, "Request queue closed");
                    break;
                }
            }
        }
    }
}
