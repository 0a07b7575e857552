//! Fetch worker pool.
//!
//! A fixed number of tokio tasks share the request queue receiver. Each worker
//! takes one [`FetchRequest`], runs a bounded GET, and sends exactly one
//! [`FetchResult`] to the collector before taking the next request.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use reqwest::Client;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::config::FetchConfig;
use crate::probe::{FetchRequest, FetchResult};

/// Errors raised while starting the pool.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// A pool needs at least one worker.
    #[error("worker pool size must be positive")]
    EmptyPool,
}

/// Executes single GETs bounded by a connect timeout and a whole-request timeout.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    request_timeout: Duration,
}

impl Fetcher {
    /// Build a fetcher from the pool configuration.
    pub fn new(config: &FetchConfig) -> Result<Self, WorkerError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            request_timeout: config.request_timeout,
        })
    }

    /// Run one fetch. Never fails: transport errors land in [`FetchResult::error`].
    pub async fn fetch(&self, request: &FetchRequest) -> FetchResult {
        let start_time = Utc::now();
        let start = Instant::now();

        // The outer timeout also bounds the body drain.
        let outcome = timeout(self.request_timeout, async {
            let response = self.client.get(&request.url).send().await?;
            let status = response.status().as_u16();
            response.bytes().await?;
            Ok::<u16, reqwest::Error>(status)
        })
        .await;
        let latency = start.elapsed();

        let (status, error) = match outcome {
            Ok(Ok(status)) => {
                tracing::debug!(
                    probe_id = %request.probe_id,
                    url = %request.url,
                    status,
                    latency_ms = latency.as_millis(),
                    "Fetch completed"
                );
                (status, None)
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    probe_id = %request.probe_id,
                    url = %request.url,
                    error = %e,
                    "Fetch failed"
                );
                (0, Some(describe_error(&e)))
            }
            Err(_) => {
                tracing::warn!(
                    probe_id = %request.probe_id,
                    url = %request.url,
                    timeout_ms = self.request_timeout.as_millis(),
                    "Fetch timed out"
                );
                (
                    0,
                    Some(format!(
                        "request timed out after {}ms",
                        self.request_timeout.as_millis()
                    )),
                )
            }
        };

        FetchResult {
            url: request.url.clone(),
            status,
            error,
            latency,
            start_time,
            probe_id: request.probe_id.clone(),
        }
    }
}

/// Flatten a reqwest error and its sources into one line.
fn describe_error(e: &reqwest::Error) -> String {
    let mut message = e.to_string();
    let mut source = std::error::Error::source(e);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

/// Fixed-size pool of fetch workers.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    shutdown: CancellationToken,
}

impl WorkerPool {
    /// Spawn `config.workers` workers draining `requests` into `results`.
    ///
    /// Workers exit once every request sender is dropped and the queue is empty.
    pub fn spawn(
        config: &FetchConfig,
        requests: mpsc::Receiver<FetchRequest>,
        results: mpsc::Sender<FetchResult>,
    ) -> Result<Self, WorkerError> {
        if config.workers == 0 {
            return Err(WorkerError::EmptyPool);
        }

        let fetcher = Fetcher::new(config)?;
        let requests = Arc::new(Mutex::new(requests));
        let shutdown = CancellationToken::new();

        let handles = (0..config.workers)
            .map(|worker_id| {
                tracing::debug!(worker_id, "Spawning fetch worker");
                tokio::spawn(run_worker(
                    worker_id,
                    fetcher.clone(),
                    Arc::clone(&requests),
                    results.clone(),
                    shutdown.clone(),
                ))
            })
            .collect();

        tracing::info!(
            workers = config.workers,
            connect_timeout_ms = config.connect_timeout.as_millis(),
            request_timeout_ms = config.request_timeout.as_millis(),
            "Fetch worker pool started"
        );

        Ok(Self { handles, shutdown })
    }

    /// Number of workers in the pool.
    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Stop taking new requests and wait for in-flight fetches to finish.
    ///
    /// Requests still queued are dropped.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        self.join().await;
    }

    /// Wait for every worker to exit.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Fetch worker task failed");
            }
        }
        tracing::info!("Fetch worker pool stopped");
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("size", &self.handles.len())
            .finish()
    }
}

async fn run_worker(
    worker_id: usize,
    fetcher: Fetcher,
    requests: Arc<Mutex<mpsc::Receiver<FetchRequest>>>,
    results: mpsc::Sender<FetchResult>,
    shutdown: CancellationToken,
) {
    loop {
        // The lock is released before fetching so other workers can take requests.
        let next = tokio::select! {
            biased;
            _ = shutdown.cancelled() => None,
            next = async { requests.lock().await.recv().await } => next,
        };
        let Some(request) = next else {
            break;
        };

        let result = fetcher.fetch(&request).await;
        if results.send(result).await.is_err() {
            tracing::warn!(worker_id, "Result queue closed, worker exiting");
            break;
        }
    }
    tracing::debug!(worker_id, "Fetch worker exited");
}
