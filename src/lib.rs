//! A bounded, blocking work queue shared by concurrent producers and consumers,
//! plus the small thread-control scenarios that exercise it.
//!
//! - [`queue`]: the bounded queue itself (blocking, timed and non-blocking put/get, close)
//! - [`producer`] / [`consumer`]: the two roles on either side of the queue
//! - [`serving`]: starts producers and consumers and joins them all
//! - [`signal`]: atomic stop signal for busy worker loops
//! - [`worker`] / [`lifecycle`]: named threads, deferred start, is-alive and join

pub mod config;
pub mod consumer;
pub mod error;
pub mod lifecycle;
pub mod producer;
pub mod queue;
pub mod serving;
pub mod signal;
pub mod worker;

pub use config::Config;
pub use error::{ConfigError, QueueError, Rejected, ScenarioError, WorkerError};
pub use queue::{BoundedQueue, Message};

use tracing_subscriber::EnvFilter;

/// Installs the `tracing` subscriber used by the binaries.
///
/// Honours `RUST_LOG`, defaulting to `info`. Calling it twice is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_target(false)
        .try_init();
}
