//! Named units of work running on their own OS thread.
//!
//! A `Worker` is the handle the rest of the crate uses to start something,
//! ask whether it is still running, and wait for its result.

use std::any::Any;
use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::error::WorkerError;

pub struct Worker<R> {
    name: String,
    handle: JoinHandle<R>,
}

/// Starts `task` on a new thread named `name`.
pub fn spawn<F, R>(name: impl Into<String>, task: F) -> Result<Worker<R>, WorkerError>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let name = name.into();
    let handle = thread::Builder::new()
        .name(name.clone())
        .spawn(task)
        .map_err(|source| WorkerError::Spawn {
            name: name.clone(),
            source,
        })?;
    debug!(worker = %name, "started");
    Ok(Worker { name, handle })
}

impl<R> Worker<R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `true` until the task has returned (or panicked).
    pub fn is_alive(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Waits for the task to finish and returns what it produced.
    pub fn join(self) -> Result<R, WorkerError> {
        let Worker { name, handle } = self;
        let result = handle.join().map_err(|payload| WorkerError::Panicked {
            message: panic_message(payload.as_ref()),
            name: name.clone(),
        });
        debug!(worker = %name, ok = result.is_ok(), "joined");
        result
    }
}

// =============================================================================
// Deferred start
// =============================================================================

type Job<R> = Box<dyn FnOnce() -> R + Send + 'static>;

enum Stage<R> {
    Ready(Job<R>),
    Running(Worker<R>),
    Joined,
}

/// A unit of work packaged up front and started later, for callers that want
/// to watch a thread go through not-started, running and joined.
pub struct Task<R> {
    name: String,
    stage: Stage<R>,
}

impl<R: Send + 'static> Task<R> {
    pub fn new<F>(name: impl Into<String>, job: F) -> Self
    where
        F: FnOnce() -> R + Send + 'static,
    {
        Self {
            name: name.into(),
            stage: Stage::Ready(Box::new(job)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&mut self) -> Result<(), WorkerError> {
        match std::mem::replace(&mut self.stage, Stage::Joined) {
            Stage::Ready(job) => {
                self.stage = Stage::Running(spawn(self.name.clone(), job)?);
                Ok(())
            }
            Stage::Running(worker) => {
                self.stage = Stage::Running(worker);
                Err(WorkerError::AlreadyStarted {
                    name: self.name.clone(),
                })
            }
            Stage::Joined => Err(WorkerError::AlreadyStarted {
                name: self.name.clone(),
            }),
        }
    }

    pub fn is_alive(&self) -> bool {
        match &self.stage {
            Stage::Running(worker) => worker.is_alive(),
            Stage::Ready(_) | Stage::Joined => false,
        }
    }

    /// Waits for the job. A task can be joined once, and only after `start`.
    pub fn join(&mut self) -> Result<R, WorkerError> {
        match std::mem::replace(&mut self.stage, Stage::Joined) {
            Stage::Running(worker) => worker.join(),
            Stage::Ready(job) => {
                self.stage = Stage::Ready(job);
                Err(WorkerError::NotStarted {
                    name: self.name.clone(),
                })
            }
            Stage::Joined => Err(WorkerError::AlreadyJoined {
                name: self.name.clone(),
            }),
        }
    }
}

/// Joins every worker in order, then reports the first failure.
///
/// Every thread has finished by the time this returns, even when an earlier
/// one panicked.
pub fn join_all<R>(workers: Vec<Worker<R>>) -> Result<Vec<R>, WorkerError> {
    let mut results = Vec::with_capacity(workers.len());
    let mut first_err = None;
    for worker in workers {
        match worker.join() {
            Ok(result) => results.push(result),
            Err(err) => {
                first_err.get_or_insert(err);
            }
        }
    }
    match first_err {
        Some(err) => Err(err),
        None => Ok(results),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_worker_runs_on_named_thread() {
        let worker = spawn("Sid", || thread::current().name().map(str::to_string)).unwrap();
        assert_eq!(worker.name(), "Sid");
        assert_eq!(worker.join().unwrap(), Some("Sid".to_string()));
    }

    #[test]
    fn test_is_alive_follows_task_lifetime() {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let worker = spawn("waiter", move || {
            release_rx.recv().ok();
            7
        })
        .unwrap();

        assert!(worker.is_alive());
        release_tx.send(()).unwrap();

        while worker.is_alive() {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(worker.join().unwrap(), 7);
    }

    #[test]
    fn test_panic_surfaces_as_error() {
        let worker = spawn("clumsy", || -> u32 { panic!("dropped the soup") }).unwrap();
        match worker.join() {
            Err(WorkerError::Panicked { name, message }) => {
                assert_eq!(name, "clumsy");
                assert_eq!(message, "dropped the soup");
            }
            other => panic!("expected a panic error, got {other:?}"),
        }
    }

    #[test]
    fn test_formatted_panic_message() {
        let worker = spawn("counter", || -> u32 { panic!("bad count {}", 3) }).unwrap();
        match worker.join() {
            Err(WorkerError::Panicked { message, .. }) => assert_eq!(message, "bad count 3"),
            other => panic!("expected a panic error, got {other:?}"),
        }
    }

    #[test]
    fn test_task_lifecycle() {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let mut task = Task::new("Sid", move || {
            release_rx.recv().ok();
            "sausage cut"
        });

        assert_eq!(task.name(), "Sid");
        assert!(!task.is_alive());

        task.start().unwrap();
        assert!(task.is_alive());
        assert!(matches!(task.start(), Err(WorkerError::AlreadyStarted { .. })));
        assert!(task.is_alive());

        release_tx.send(()).unwrap();
        assert_eq!(task.join().unwrap(), "sausage cut");
        assert!(!task.is_alive());
        assert!(matches!(task.join(), Err(WorkerError::AlreadyJoined { .. })));
    }

    #[test]
    fn test_task_join_before_start() {
        let mut task = Task::new("Bob", || 1);
        assert!(matches!(task.join(), Err(WorkerError::NotStarted { .. })));
        task.start().unwrap();
        assert_eq!(task.join().unwrap(), 1);
    }

    #[test]
    fn test_join_all_keeps_spawn_order() {
        let workers: Vec<_> = (0..4)
            .map(|i| spawn(format!("worker-{i}"), move || i * 2).unwrap())
            .collect();
        assert_eq!(join_all(workers).unwrap(), vec![0, 2, 4, 6]);
    }

    #[test]
    fn test_join_all_waits_for_everyone_after_a_panic() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let finished = Arc::new(AtomicBool::new(false));
        let slow_finished = Arc::clone(&finished);
        let workers: Vec<Worker<()>> = vec![
            spawn("clumsy", || panic!("dropped the soup")).unwrap(),
            spawn("slow", move || {
                thread::sleep(Duration::from_millis(300));
                slow_finished.store(true, Ordering::SeqCst);
            })
            .unwrap(),
        ];

        match join_all(workers) {
            Err(WorkerError::Panicked { name, .. }) => assert_eq!(name, "clumsy"),
            other => panic!("expected a panic error, got {other:?}"),
        }
        assert!(finished.load(Ordering::SeqCst));
    }

    #[test]
    fn test_join_all_reports_first_failure_in_order() {
        let workers = vec![
            spawn("first", || -> u8 { panic!("one") }).unwrap(),
            spawn("second", || -> u8 { panic!("two") }).unwrap(),
            spawn("third", || 3u8).unwrap(),
        ];
        match join_all(workers) {
            Err(WorkerError::Panicked { name, message }) => {
                assert_eq!(name, "first");
                assert_eq!(message, "one");
            }
            other => panic!("expected a panic error, got {other:?}"),
        }
    }
}
