//! piezo - Periodic HTTP Probing Agent
//!
//! Keeps a dynamic set of named probes, each polling a URL on its own
//! interval. Fetches run on a bounded worker pool; results are gathered by a
//! single collector and fanned out to pluggable receivers.
//!
//! # Architecture
//!
//! - **Probes**: [`ProbeRegistry`] owns one periodic emitter per probe id
//! - **Workers**: [`WorkerPool`] executes bounded-timeout GETs
//! - **Collector**: [`ResultCollector`] delivers each result to every [`Receiver`]
//! - **Control**: [`ControlApi`] validates add/remove calls; [`server`] serves them over HTTP
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use piezo::{AgentBuilder, AppConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let handles = AgentBuilder::new(AppConfig::default()).build()?;
//! handles
//!     .registry
//!     .add_or_replace("api", "http://localhost:9000/", Duration::from_secs(1))
//!     .await?;
//! tokio::time::sleep(Duration::from_secs(5)).await;
//! handles.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod collector;
pub mod config;
pub mod control;
pub mod probe;
pub mod receiver;
pub mod server;
pub mod worker;

pub use agent::{AgentBuilder, AgentError, AgentHandles};
pub use collector::ResultCollector;
pub use config::{AppConfig, ConfigError, FetchConfig, KestrelConfig};
pub use control::{ControlApi, ControlError, ControlParams};
pub use probe::{FetchRequest, FetchResult, ProbeError, ProbeInfo, ProbeRegistry, ResultRecord};
pub use receiver::{KestrelReceiver, LogReceiver, NoopReceiver, Receiver, ReceiverError};
pub use worker::{Fetcher, WorkerError, WorkerPool};
