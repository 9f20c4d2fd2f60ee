use std::fmt;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Queue errors
// =============================================================================

/// Why a queue operation did not complete.
///
/// None of these are fatal: a full queue is ordinary backpressure and a closed
/// queue is how a run tells its consumers there is nothing left to do.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue is full (capacity {capacity})")]
    Full { capacity: usize },

    #[error("queue is empty")]
    Empty,

    #[error("timed out after {0:?} waiting on the queue")]
    Timeout(Duration),

    #[error("queue is closed")]
    Closed,
}

/// A put that failed. Carries the item back so the caller decides what to do with it.
pub struct Rejected<T> {
    pub item: T,
    pub error: QueueError,
}

impl<T> Rejected<T> {
    pub fn new(item: T, error: QueueError) -> Self {
        Self { item, error }
    }
}

impl<T> fmt::Debug for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected").field("error", &self.error).finish_non_exhaustive()
    }
}

impl<T> fmt::Display for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "put rejected: {}", self.error)
    }
}

impl<T> std::error::Error for Rejected<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl<T> From<Rejected<T>> for QueueError {
    fn from(rejected: Rejected<T>) -> Self {
        rejected.error
    }
}

// =============================================================================
// Worker errors
// =============================================================================

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("failed to spawn worker '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("worker '{name}' panicked: {message}")]
    Panicked { name: String, message: String },

    #[error("worker '{name}' failed: {source}")]
    Queue {
        name: String,
        #[source]
        source: QueueError,
    },

    #[error("task '{name}' was already started")]
    AlreadyStarted { name: String },

    #[error("task '{name}' was never started")]
    NotStarted { name: String },

    #[error("task '{name}' was already joined")]
    AlreadyJoined { name: String },
}

impl WorkerError {
    pub fn queue(name: impl Into<String>, source: QueueError) -> Self {
        Self::Queue {
            name: name.into(),
            source,
        }
    }
}

// =============================================================================
// Config errors
// =============================================================================

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for '{field}': {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Scenario errors
// =============================================================================

/// Everything a scenario run can fail with.
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error("worker '{name}' reported a count of zero")]
    Idle { name: String },

    #[error("worker '{name}' still running {grace:?} after the stop signal")]
    GraceExceeded { name: String, grace: Duration },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_keeps_item_and_reason() {
        let rejected = Rejected::new(String::from("Bowl #3"), QueueError::Full { capacity: 5 });
        assert_eq!(rejected.to_string(), "put rejected: queue is full (capacity 5)");
        assert_eq!(rejected.error, QueueError::Full { capacity: 5 });
        assert_eq!(rejected.item, "Bowl #3");
    }

    #[test]
    fn test_rejected_converts_to_queue_error() {
        let err: QueueError = Rejected::new(1u8, QueueError::Closed).into();
        assert_eq!(err, QueueError::Closed);
    }

    #[test]
    fn test_worker_error_messages() {
        let err = WorkerError::queue("consumer-0", QueueError::Empty);
        assert_eq!(err.to_string(), "worker 'consumer-0' failed: queue is empty");

        let err = WorkerError::Panicked {
            name: "Sid".into(),
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "worker 'Sid' panicked: boom");
    }

    #[test]
    fn test_scenario_error_is_transparent() {
        let err: ScenarioError = ConfigError::invalid("serving.capacity", "must be at least 1").into();
        assert_eq!(
            err.to_string(),
            "invalid value for 'serving.capacity': must be at least 1"
        );
    }
}
