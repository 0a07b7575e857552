//! Receiver Layer
//!
//! Pluggable sinks for fetch results. The collector holds an ordered list of
//! `Arc<dyn Receiver>` and calls each one per result.
//!
//! - [`NoopReceiver`]: discards results
//! - [`LogReceiver`]: logs the JSON record
//! - [`KestrelReceiver`]: pushes the JSON record onto a Kestrel queue

mod kestrel;
mod noop;
mod traits;

pub use kestrel::KestrelReceiver;
pub use noop::{LogReceiver, NoopReceiver};
pub use traits::{Receiver, ReceiverError};
