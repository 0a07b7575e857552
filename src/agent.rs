//! Agent builder and handles.
//!
//! Wires the pipeline together: probe registry → request queue → worker pool
//! → result queue → collector → receivers.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::collector::ResultCollector;
use crate::config::{AppConfig, ConfigError};
use crate::control::ControlApi;
use crate::probe::ProbeRegistry;
use crate::receiver::{KestrelReceiver, LogReceiver, Receiver, ReceiverError};
use crate::worker::{WorkerError, WorkerPool};

/// Errors raised while assembling the agent.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error("receiver setup failed: {0}")]
    Receiver(#[from] ReceiverError),
}

/// Builder for the running agent.
pub struct AgentBuilder {
    config: AppConfig,
    extra_receivers: Vec<Arc<dyn Receiver>>,
}

impl AgentBuilder {
    /// Start from a configuration.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            extra_receivers: Vec::new(),
        }
    }

    /// Register an additional receiver after the configured ones.
    pub fn receiver(mut self, receiver: Arc<dyn Receiver>) -> Self {
        self.extra_receivers.push(receiver);
        self
    }

    /// Spawn the workers and the collector. Must run inside a tokio runtime.
    pub fn build(self) -> Result<AgentHandles, AgentError> {
        self.config.validate()?;

        let mut collector = ResultCollector::new();
        if self.config.receivers.log {
            collector.register(Arc::new(LogReceiver));
        }
        if self.config.receivers.kestrel.enabled {
            let kestrel = KestrelReceiver::new(&self.config.receivers.kestrel)?;
            tracing::info!(
                host = %self.config.receivers.kestrel.host,
                queue = %kestrel.queue(),
                "Kestrel receiver enabled"
            );
            collector.register(Arc::new(kestrel));
        }
        for receiver in self.extra_receivers {
            collector.register(receiver);
        }

        let (request_tx, request_rx) = mpsc::channel(self.config.queues.request_capacity);
        let (result_tx, result_rx) = mpsc::channel(self.config.queues.result_capacity);

        let collector_handle = collector.spawn(result_rx);
        let pool = WorkerPool::spawn(&self.config.fetch, request_rx, result_tx)?;
        let registry = ProbeRegistry::new(request_tx);

        Ok(AgentHandles {
            control: ControlApi::new(registry.clone()),
            registry,
            pool,
            collector: collector_handle,
        })
    }
}

/// Handles to the running agent.
pub struct AgentHandles {
    /// Control operations for the transport layer.
    pub control: ControlApi,
    /// Direct registry access.
    pub registry: ProbeRegistry,
    pool: WorkerPool,
    collector: JoinHandle<()>,
}

impl AgentHandles {
    /// Number of fetch workers.
    pub fn worker_count(&self) -> usize {
        self.pool.size()
    }

    /// Stop all probes, let in-flight fetches finish, then drain the collector.
    pub async fn shutdown(self) {
        tracing::info!("Stopping probes...");
        self.registry.shutdown().await;

        tracing::info!("Stopping fetch workers...");
        self.pool.shutdown().await;

        // Workers held the last result senders; the collector drains and exits.
        if let Err(e) = self.collector.await {
            tracing::error!(error = %e, "Result collector task failed");
        }
    }
}

impl std::fmt::Debug for AgentHandles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentHandles")
            .field("registry", &self.registry)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}
