//! Request and result records that flow through the pipeline.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single fetch emitted by a probe tick.
///
/// Always executed as a GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Target URL.
    pub url: String,
    /// Id of the probe that emitted this request.
    pub probe_id: String,
    /// Emitter generation that produced the tick.
    pub emitter_id: uuid::Uuid,
}

/// Outcome of one fetch, produced exactly once per [`FetchRequest`].
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Target URL.
    pub url: String,
    /// HTTP status code, `0` when the fetch failed before a response arrived.
    pub status: u16,
    /// Transport, connect or timeout error.
    pub error: Option<String>,
    /// Wall-clock time from request start to completion or failure.
    pub latency: Duration,
    /// When the request was started.
    pub start_time: DateTime<Utc>,
    /// Id of the probe that emitted the request.
    pub probe_id: String,
}

impl FetchResult {
    /// Whether the fetch completed with a response.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Convert into the flat wire record shipped to external receivers.
    pub fn to_record(&self) -> ResultRecord {
        ResultRecord {
            url: self.url.clone(),
            status: self.status,
            error: self.error.clone().unwrap_or_default(),
            response_time: self.latency.as_secs_f64() * 1000.0,
            start_time: self.start_time,
            probe_id: self.probe_id.clone(),
        }
    }
}

/// Self-describing record of a [`FetchResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub url: String,
    pub status: u16,
    /// Empty when the fetch succeeded.
    pub error: String,
    /// Latency in milliseconds.
    pub response_time: f64,
    pub start_time: DateTime<Utc>,
    pub probe_id: String,
}
