//! Core receiver trait and error type.

use thiserror::Error;

use crate::probe::FetchResult;

/// Errors returned by a single delivery.
#[derive(Debug, Error)]
pub enum ReceiverError {
    /// Network I/O error talking to the sink.
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    /// Delivery did not finish within the configured bound.
    #[error("delivery timed out")]
    Timeout,

    /// Failed to encode the result record.
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    /// The sink answered with something other than an acknowledgement.
    #[error("sink rejected record: {0}")]
    Rejected(String),

    /// Receiver configuration error.
    #[error("config error: {0}")]
    Config(String),
}

/// A pluggable sink for fetch results.
///
/// Delivery is best effort and at most once: the collector calls `deliver`
/// exactly once per result and never retries. Implementations must not buffer
/// results beyond the call.
#[async_trait::async_trait]
pub trait Receiver: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Deliver one result.
    async fn deliver(&self, result: &FetchResult) -> Result<(), ReceiverError>;
}
