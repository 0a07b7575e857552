//! Kestrel queue receiver.
//!
//! Pushes each result as a JSON record onto a Kestrel queue using the
//! memcache text protocol (`set <queue> 0 0 <len>`). One connection per
//! delivery, no retry, no local buffering.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::config::KestrelConfig;
use crate::probe::FetchResult;
use crate::receiver::{Receiver, ReceiverError};

/// Longest key the memcache protocol accepts.
const MAX_KEY_LEN: usize = 250;

/// Reply sent by the server once the item is queued.
const STORED: &str = "STORED";

/// Receiver that forwards results to an external Kestrel queue.
#[derive(Debug, Clone)]
pub struct KestrelReceiver {
    host: String,
    queue: String,
    timeout: Duration,
}

impl KestrelReceiver {
    /// Create a receiver for the configured host and queue.
    ///
    /// # Errors
    /// Returns `ReceiverError::Config` if the queue name is not a valid memcache key.
    pub fn new(config: &KestrelConfig) -> Result<Self, ReceiverError> {
        validate_key(&config.queue)?;
        if config.host.trim().is_empty() {
            return Err(ReceiverError::Config("kestrel host is empty".to_string()));
        }

        Ok(Self {
            host: config.host.clone(),
            queue: config.queue.clone(),
            timeout: config.timeout,
        })
    }

    /// Target queue name.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    async fn push(&self, payload: &[u8]) -> Result<(), ReceiverError> {
        let mut stream = TcpStream::connect(&self.host).await?;

        let header = format!("set {} 0 0 {}\r\n", self.queue, payload.len());
        stream.write_all(header.as_bytes()).await?;
        stream.write_all(payload).await?;
        stream.write_all(b"\r\n").await?;
        stream.flush().await?;

        let mut reader = BufReader::new(stream);
        let mut reply = String::new();
        reader.read_line(&mut reply).await?;

        match reply.trim_end() {
            STORED => Ok(()),
            "" => Err(ReceiverError::Rejected("connection closed".to_string())),
            other => Err(ReceiverError::Rejected(other.to_string())),
        }
    }
}

#[async_trait::async_trait]
impl Receiver for KestrelReceiver {
    fn name(&self) -> &str {
        "kestrel"
    }

    async fn deliver(&self, result: &FetchResult) -> Result<(), ReceiverError> {
        let payload = serde_json::to_vec(&result.to_record())?;

        timeout(self.timeout, self.push(&payload))
            .await
            .map_err(|_| ReceiverError::Timeout)??;

        tracing::trace!(
            queue = %self.queue,
            probe_id = %result.probe_id,
            bytes = payload.len(),
            "Result queued"
        );
        Ok(())
    }
}

fn validate_key(key: &str) -> Result<(), ReceiverError> {
    if key.is_empty() {
        return Err(ReceiverError::Config("kestrel queue name is empty".to_string()));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(ReceiverError::Config(format!(
            "kestrel queue name exceeds {MAX_KEY_LEN} bytes"
        )));
    }
    if key.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ReceiverError::Config(format!(
            "kestrel queue name '{key}' contains whitespace or control characters"
        )));
    }
    Ok(())
}
