//! Result collector.
//!
//! The single consumer of the result queue. Every result is logged, then
//! delivered to each registered receiver in registration order. A failing
//! receiver is logged and skipped over; it never blocks the others or drops
//! the result.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::probe::FetchResult;
use crate::receiver::Receiver;

/// Ordered fan-out of results to receivers.
#[derive(Clone, Default)]
pub struct ResultCollector {
    receivers: Vec<Arc<dyn Receiver>>,
}

impl ResultCollector {
    /// Create a collector with no receivers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a receiver. Delivery follows registration order.
    pub fn register(&mut self, receiver: Arc<dyn Receiver>) {
        tracing::info!(receiver = receiver.name(), "Receiver registered");
        self.receivers.push(receiver);
    }

    /// Builder form of [`ResultCollector::register`].
    pub fn with_receiver(mut self, receiver: Arc<dyn Receiver>) -> Self {
        self.register(receiver);
        self
    }

    /// Names of registered receivers, in delivery order.
    pub fn receiver_names(&self) -> Vec<String> {
        self.receivers.iter().map(|r| r.name().to_string()).collect()
    }

    /// Log one result and hand it to every receiver in turn.
    ///
    /// Returns the number of receivers that accepted it.
    pub async fn process(&self, result: &FetchResult) -> usize {
        if result.is_success() {
            tracing::info!(
                probe_id = %result.probe_id,
                url = %result.url,
                status = result.status,
                latency_ms = result.latency.as_millis(),
                start_time = %result.start_time,
                "Fetch result"
            );
        } else {
            tracing::info!(
                probe_id = %result.probe_id,
                url = %result.url,
                status = result.status,
                latency_ms = result.latency.as_millis(),
                start_time = %result.start_time,
                error = result.error.as_deref().unwrap_or_default(),
                "Fetch result"
            );
        }

        let mut delivered = 0;
        for receiver in &self.receivers {
            match receiver.deliver(result).await {
                Ok(()) => delivered += 1,
                Err(e) => tracing::warn!(
                    receiver = receiver.name(),
                    probe_id = %result.probe_id,
                    error = %e,
                    "Failed to deliver result"
                ),
            }
        }
        delivered
    }

    /// Spawn the collector task draining `results` until every sender is gone.
    pub fn spawn(self, mut results: mpsc::Receiver<FetchResult>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(receivers = self.receivers.len(), "Result collector started");
            while let Some(result) = results.recv().await {
                self.process(&result).await;
            }
            tracing::info!("Result collector stopped");
        })
    }
}

impl std::fmt::Debug for ResultCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCollector")
            .field("receivers", &self.receiver_names())
            .finish()
    }
}
