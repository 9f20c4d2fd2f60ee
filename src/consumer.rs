//! The eating side of the line.

use std::fmt::Display;
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::QueueError;
use crate::queue::{BoundedQueue, Message};

/// Iterations in one unit of simulated work.
pub const WORK_UNIT: u64 = 1_000_000;

/// Burns CPU for `units` work units and returns the (meaningless) result.
pub fn cpu_work(units: u32) -> u64 {
    let mut acc = 0u64;
    for i in 0..WORK_UNIT * u64::from(units) {
        acc = acc.wrapping_add(black_box(i).wrapping_mul(i));
    }
    acc
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Idle,
    Waiting,
    Processing,
    Terminated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerReport<T> {
    pub name: String,
    /// Items in the order this consumer ate them.
    pub processed: Vec<T>,
    pub state: ConsumerState,
}

pub struct Consumer<T> {
    name: String,
    queue: Arc<BoundedQueue<Message<T>>>,
    work_units: u32,
    patience: Option<Duration>,
    state: ConsumerState,
}

impl<T: Display> Consumer<T> {
    pub fn new(name: impl Into<String>, queue: Arc<BoundedQueue<Message<T>>>, work_units: u32) -> Self {
        Self {
            name: name.into(),
            queue,
            work_units,
            patience: None,
            state: ConsumerState::Idle,
        }
    }

    /// Give up with `QueueError::Timeout` if nothing arrives within `patience`.
    pub fn with_patience(mut self, patience: Duration) -> Self {
        self.patience = Some(patience);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    fn enter(&mut self, next: ConsumerState) {
        debug!(consumer = %self.name, from = ?self.state, to = ?next, "state change");
        self.state = next;
    }

    fn next_message(&self) -> Result<Message<T>, QueueError> {
        match self.patience {
            Some(patience) => self.queue.get_timeout(patience),
            None => self.queue.get(),
        }
    }

    /// Eats until a sentinel arrives or the queue is closed and drained.
    pub fn run(mut self) -> Result<ConsumerReport<T>, QueueError> {
        let mut processed = Vec::new();
        loop {
            self.enter(ConsumerState::Waiting);
            let item = match self.next_message() {
                Ok(Message::Work(item)) => item,
                Ok(Message::Done) | Err(QueueError::Closed) => break,
                Err(err) => return Err(err),
            };

            self.enter(ConsumerState::Processing);
            info!(consumer = %self.name, item = %item, "ate");
            black_box(cpu_work(self.work_units));
            processed.push(item);
        }

        self.enter(ConsumerState::Terminated);
        Ok(ConsumerReport {
            processed,
            state: self.state,
            name: self.name,
        })
    }
}
