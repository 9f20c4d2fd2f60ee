//! The serving side of the line: puts a finite run of items on the queue and
//! then tells the consumers there is nothing more coming.

use std::fmt::Display;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{QueueError, Rejected};
use crate::queue::{BoundedQueue, Message};

// =============================================================================
// Put policy and stream termination
// =============================================================================

/// How a producer behaves when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PutMode {
    /// Wait for room as long as it takes.
    #[default]
    Blocking,
    /// Wait for room at most this long, then fail with `Timeout`.
    Within(Duration),
    /// Fail with `Full` straight away.
    NonBlocking,
}

impl PutMode {
    pub fn put<T>(self, queue: &BoundedQueue<T>, item: T) -> Result<(), Rejected<T>> {
        match self {
            PutMode::Blocking => queue.put(item),
            PutMode::Within(timeout) => queue.put_timeout(item, timeout),
            PutMode::NonBlocking => queue.try_put(item),
        }
    }
}

/// How the end of the stream is announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// One `Message::Done` per consumer reading the queue.
    Sentinels(usize),
    /// Close the queue; every consumer sees `Closed` once it is drained.
    Close,
    /// Leave it to whoever coordinates several producers.
    Detached,
}

/// Announces the end of the stream. Returns how many sentinels were sent.
pub fn terminate<T>(
    queue: &BoundedQueue<Message<T>>,
    termination: Termination,
    mode: PutMode,
) -> Result<usize, QueueError> {
    match termination {
        Termination::Sentinels(count) => {
            for _ in 0..count {
                mode.put(queue, Message::Done)?;
            }
            Ok(count)
        }
        Termination::Close => {
            queue.close();
            Ok(0)
        }
        Termination::Detached => Ok(0),
    }
}

// =============================================================================
// Producer
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerState {
    Idle,
    Producing,
    Draining,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerConfig {
    pub items: usize,
    pub delay: Duration,
    pub mode: PutMode,
    pub termination: Termination,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            items: 20,
            delay: Duration::from_millis(200),
            mode: PutMode::Blocking,
            termination: Termination::Sentinels(2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerReport {
    pub name: String,
    pub produced: usize,
    pub sentinels: usize,
    pub state: ProducerState,
}

pub struct Producer<T, F> {
    name: String,
    queue: Arc<BoundedQueue<Message<T>>>,
    config: ProducerConfig,
    make_item: F,
    state: ProducerState,
}

impl<T, F> Producer<T, F>
where
    T: Display,
    F: FnMut(usize) -> T,
{
    pub fn new(
        name: impl Into<String>,
        queue: Arc<BoundedQueue<Message<T>>>,
        config: ProducerConfig,
        make_item: F,
    ) -> Self {
        Self {
            name: name.into(),
            queue,
            config,
            make_item,
            state: ProducerState::Idle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ProducerState {
        self.state
    }

    fn enter(&mut self, next: ProducerState) {
        debug!(producer = %self.name, from = ?self.state, to = ?next, "state change");
        self.state = next;
    }

    /// Serves every item, then terminates the stream.
    pub fn run(mut self) -> Result<ProducerReport, QueueError> {
        self.enter(ProducerState::Producing);
        for index in 0..self.config.items {
            let item = (self.make_item)(index);
            let label = item.to_string();
            self.config.mode.put(&self.queue, Message::Work(item))?;
            info!(
                producer = %self.name,
                item = %label,
                remaining = self.queue.remaining_capacity(),
                "served"
            );
            if !self.config.delay.is_zero() {
                thread::sleep(self.config.delay);
            }
        }

        self.enter(ProducerState::Draining);
        let sentinels = terminate(&self.queue, self.config.termination, self.config.mode)?;

        self.enter(ProducerState::Done);
        Ok(ProducerReport {
            produced: self.config.items,
            sentinels,
            state: self.state,
            name: self.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn config(items: usize, termination: Termination) -> ProducerConfig {
        ProducerConfig {
            items,
            delay: Duration::ZERO,
            mode: PutMode::Blocking,
            termination,
        }
    }

    fn drain<T>(queue: &BoundedQueue<Message<T>>) -> Vec<Message<T>> {
        std::iter::from_fn(|| queue.try_get().ok()).collect()
    }

    #[test]
    fn test_items_then_one_sentinel_per_consumer() {
        let queue = Arc::new(BoundedQueue::new(10));
        let producer = Producer::new("server", Arc::clone(&queue), config(3, Termination::Sentinels(2)), |i| i);
        assert_eq!(producer.state(), ProducerState::Idle);
        assert_eq!(producer.name(), "server");

        let report = producer.run().unwrap();
        assert_eq!(report.produced, 3);
        assert_eq!(report.sentinels, 2);
        assert_eq!(report.state, ProducerState::Done);

        assert_eq!(
            drain(&queue),
            vec![
                Message::Work(0),
                Message::Work(1),
                Message::Work(2),
                Message::Done,
                Message::Done
            ]
        );
        assert!(!queue.is_closed());
    }

    #[test]
    fn test_close_termination_sends_no_sentinels() {
        let queue = Arc::new(BoundedQueue::new(4));
        let report = Producer::new("server", Arc::clone(&queue), config(2, Termination::Close), |i| i * 10)
            .run()
            .unwrap();

        assert_eq!(report.sentinels, 0);
        assert!(queue.is_closed());
        assert_eq!(queue.get(), Ok(Message::Work(0)));
        assert_eq!(queue.get(), Ok(Message::Work(10)));
        assert_eq!(queue.get(), Err(QueueError::Closed));
    }

    #[test]
    fn test_detached_producer_leaves_stream_open() {
        let queue = Arc::new(BoundedQueue::new(4));
        Producer::new("server", Arc::clone(&queue), config(1, Termination::Detached), |i| i)
            .run()
            .unwrap();

        assert!(!queue.is_closed());
        assert_eq!(drain(&queue), vec![Message::Work(0)]);
    }

    #[test]
    fn test_non_blocking_producer_fails_loudly_when_full() {
        let queue = Arc::new(BoundedQueue::new(2));
        let config = ProducerConfig {
            mode: PutMode::NonBlocking,
            ..config(3, Termination::Sentinels(1))
        };

        let err = Producer::new("server", Arc::clone(&queue), config, |i| i).run().unwrap_err();
        assert_eq!(err, QueueError::Full { capacity: 2 });
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_bounded_wait_producer_times_out() {
        let queue = Arc::new(BoundedQueue::new(1));
        let config = ProducerConfig {
            mode: PutMode::Within(Duration::from_millis(10)),
            ..config(2, Termination::Close)
        };

        let err = Producer::new("server", Arc::clone(&queue), config, |i| i).run().unwrap_err();
        assert_eq!(err, QueueError::Timeout(Duration::from_millis(10)));
        assert!(!queue.is_closed());
    }

    #[test]
    fn test_producer_on_closed_queue_stops() {
        let queue = Arc::new(BoundedQueue::new(2));
        queue.close();
        let err = Producer::new("server", queue, config(1, Termination::Close), |i| i)
            .run()
            .unwrap_err();
        assert_eq!(err, QueueError::Closed);
    }

    #[test]
    fn test_blocking_producer_waits_for_consumer() {
        let queue = Arc::new(BoundedQueue::new(1));
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let mut got = Vec::new();
                while let Ok(Message::Work(item)) = queue.get() {
                    got.push(item);
                    thread::sleep(Duration::from_millis(2));
                }
                got
            })
        };

        let report = Producer::new("server", Arc::clone(&queue), config(5, Termination::Sentinels(1)), |i| i)
            .run()
            .unwrap();
        assert_eq!(report.produced, 5);
        assert_eq!(consumer.join().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_delay_paces_production() {
        let queue = Arc::new(BoundedQueue::new(5));
        let config = ProducerConfig {
            delay: Duration::from_millis(15),
            ..config(3, Termination::Close)
        };

        let started = Instant::now();
        Producer::new("server", queue, config, |i| i).run().unwrap();
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_terminate_with_zero_sentinels() {
        let queue = BoundedQueue::<Message<u8>>::new(1);
        assert_eq!(terminate(&queue, Termination::Sentinels(0), PutMode::Blocking), Ok(0));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_default_config_matches_reference_scenario() {
        let config = ProducerConfig::default();
        assert_eq!(config.items, 20);
        assert_eq!(config.delay, Duration::from_millis(200));
        assert_eq!(config.termination, Termination::Sentinels(2));
    }
}
