//! Probe Layer
//!
//! Named, independently timed probes that emit [`FetchRequest`]s into the
//! shared request queue.
//!
//! # Architecture
//!
//! - [`ProbeRegistry`]: id to emitter mapping, at most one live emitter per id
//! - [`FetchRequest`] / [`FetchResult`]: the records flowing between stages
//! - [`ResultRecord`]: flat, serializable form of a result for external sinks

mod registry;
mod ticker;
mod types;

pub use registry::ProbeRegistry;
pub use ticker::ProbeInfo;
pub use types::{FetchRequest, FetchResult, ResultRecord};

pub(crate) use ticker::Probe;

use thiserror::Error;

/// Errors returned by registry operations.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Interval must be non-zero.
    #[error("probe interval must be greater than zero")]
    InvalidInterval,
}
