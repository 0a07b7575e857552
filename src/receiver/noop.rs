//! Receivers that never leave the process.

use crate::probe::FetchResult;
use crate::receiver::{Receiver, ReceiverError};

/// Accepts and discards every result.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReceiver;

#[async_trait::async_trait]
impl Receiver for NoopReceiver {
    fn name(&self) -> &str {
        "noop"
    }

    async fn deliver(&self, _result: &FetchResult) -> Result<(), ReceiverError> {
        Ok(())
    }
}

/// Writes the JSON wire record of each result to the debug log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReceiver;

#[async_trait::async_trait]
impl Receiver for LogReceiver {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, result: &FetchResult) -> Result<(), ReceiverError> {
        let record = serde_json::to_string(&result.to_record())?;
        tracing::debug!(target: "piezo::results", %record, "Result record");
        Ok(())
    }
}
