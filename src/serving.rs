//! The soup kitchen: producers serve bowls into a bounded serving line,
//! consumers eat them, and the run ends only once every worker has been joined.

use std::fmt;
use std::sync::Arc;
use std::thread;

use tracing::{info, warn};

use crate::config::{ServingConfig, TerminationStyle};
use crate::consumer::{Consumer, ConsumerReport, ConsumerState};
use crate::error::{QueueError, ScenarioError, WorkerError};
use crate::producer::{self, Producer, ProducerConfig, ProducerReport, ProducerState, Termination};
use crate::queue::{BoundedQueue, Message};
use crate::worker::{self, Worker};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bowl(pub usize);

impl fmt::Display for Bowl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bowl #{}", self.0)
    }
}

type Line = Arc<BoundedQueue<Message<Bowl>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServingReport {
    pub producers: Vec<ProducerReport>,
    pub consumers: Vec<ConsumerReport<Bowl>>,
}

impl ServingReport {
    pub fn total_served(&self) -> usize {
        self.producers.iter().map(|p| p.produced).sum()
    }

    pub fn total_eaten(&self) -> usize {
        self.consumers.iter().map(|c| c.processed.len()).sum()
    }

    /// Every bowl eaten, across all consumers.
    pub fn eaten(&self) -> impl Iterator<Item = &Bowl> {
        self.consumers.iter().flat_map(|c| c.processed.iter())
    }

    pub fn all_finished(&self) -> bool {
        self.producers.iter().all(|p| p.state == ProducerState::Done)
            && self.consumers.iter().all(|c| c.state == ConsumerState::Terminated)
    }
}

/// Closes the line if the owning worker fails or panics, so nobody else
/// stays parked on it forever.
struct CloseOnFailure {
    line: Line,
}

impl CloseOnFailure {
    fn watch<R>(&self, result: Result<R, QueueError>) -> Result<R, QueueError> {
        if result.is_err() {
            self.line.close();
        }
        result
    }
}

impl Drop for CloseOnFailure {
    fn drop(&mut self) {
        if thread::panicking() {
            self.line.close();
        }
    }
}

pub struct ServingLine {
    config: ServingConfig,
}

impl ServingLine {
    pub fn new(config: ServingConfig) -> Result<Self, ScenarioError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ServingConfig {
        &self.config
    }

    /// Termination for the producers themselves and for the coordinator.
    ///
    /// A lone producer ends the stream itself. With several, none of them knows
    /// when the others are done, so the coordinator does it after joining them.
    fn terminations(&self) -> (Termination, Termination) {
        let stream_end = match self.config.termination {
            TerminationStyle::Sentinels => Termination::Sentinels(self.config.consumers),
            TerminationStyle::Close => Termination::Close,
        };
        if self.config.producers == 1 {
            (stream_end, Termination::Detached)
        } else {
            (Termination::Detached, stream_end)
        }
    }

    fn spawn_consumers(
        &self,
        line: &Line,
    ) -> Result<Vec<Worker<Result<ConsumerReport<Bowl>, QueueError>>>, WorkerError> {
        spawn_crew(line, self.config.consumers, |i| {
            let name = format!("consumer-{i}");
            let mut consumer =
                Consumer::new(name.clone(), Arc::clone(line), self.config.work_units);
            if let Some(patience) = self.config.get_timeout() {
                consumer = consumer.with_patience(patience);
            }
            let guard = CloseOnFailure {
                line: Arc::clone(line),
            };
            worker::spawn(name, move || guard.watch(consumer.run()))
        })
    }

    fn spawn_producers(
        &self,
        line: &Line,
        termination: Termination,
    ) -> Result<Vec<Worker<Result<ProducerReport, QueueError>>>, WorkerError> {
        let bowls = self.config.bowls;
        spawn_crew(line, self.config.producers, |p| {
            let name = format!("producer-{p}");
            let config = ProducerConfig {
                items: bowls,
                delay: self.config.serve_delay(),
                mode: self.config.put_mode(),
                termination,
            };
            let first = p * bowls;
            let producer =
                Producer::new(name.clone(), Arc::clone(line), config, move |i| Bowl(first + i));
            let guard = CloseOnFailure {
                line: Arc::clone(line),
            };
            worker::spawn(name, move || guard.watch(producer.run()))
        })
    }

    /// Runs the whole kitchen and waits for every producer and consumer.
    pub fn run(&self) -> Result<ServingReport, ScenarioError> {
        let line: Line = Arc::new(BoundedQueue::new(self.config.capacity));
        let (own_termination, coordinator_termination) = self.terminations();
        info!(
            capacity = self.config.capacity,
            producers = self.config.producers,
            consumers = self.config.consumers,
            bowls = self.config.bowls,
            "opening serving line"
        );

        let consumers = self.spawn_consumers(&line)?;
        let producers = match self.spawn_producers(&line, own_termination) {
            Ok(producers) => producers,
            Err(err) => {
                let _ = join_reports(consumers);
                return Err(err.into());
            }
        };

        let producer_results = join_reports(producers);
        let coordination = if producer_results.iter().all(Result::is_ok) {
            producer::terminate(&line, coordinator_termination, self.config.put_mode())
                .map(|_| ())
                .map_err(|err| WorkerError::queue("coordinator", err))
        } else {
            Ok(())
        };
        if coordination.is_err() {
            line.close();
        }

        let consumer_results = join_reports(consumers);

        let mut errors = Vec::new();
        let producers = keep_ok(producer_results, &mut errors);
        if let Err(err) = coordination {
            errors.push(err);
        }
        let consumers = keep_ok(consumer_results, &mut errors);
        if let Some(err) = root_cause(errors) {
            warn!(error = %err, "serving line failed");
            return Err(err.into());
        }

        let report = ServingReport { producers, consumers };
        info!(
            served = report.total_served(),
            eaten = report.total_eaten(),
            "serving line closed"
        );
        Ok(report)
    }
}

/// Starts `count` workers on the line. If one fails to start, the line is
/// closed and the ones already running are joined before the error is returned.
fn spawn_crew<R, F>(
    line: &Line,
    count: usize,
    mut launch: F,
) -> Result<Vec<Worker<Result<R, QueueError>>>, WorkerError>
where
    F: FnMut(usize) -> Result<Worker<Result<R, QueueError>>, WorkerError>,
{
    let mut workers = Vec::with_capacity(count);
    for i in 0..count {
        match launch(i) {
            Ok(worker) => workers.push(worker),
            Err(err) => {
                line.close();
                let _ = join_reports(workers);
                return Err(err);
            }
        }
    }
    Ok(workers)
}

/// Joins every worker, even after one has failed, so no thread is left behind.
fn join_reports<R>(workers: Vec<Worker<Result<R, QueueError>>>) -> Vec<Result<R, WorkerError>> {
    workers
        .into_iter()
        .map(|worker| {
            let name = worker.name().to_string();
            worker.join()?.map_err(|err| WorkerError::queue(name, err))
        })
        .collect()
}

fn keep_ok<R>(results: Vec<Result<R, WorkerError>>, errors: &mut Vec<WorkerError>) -> Vec<R> {
    let mut reports = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(report) => reports.push(report),
            Err(err) => errors.push(err),
        }
    }
    reports
}

// A failing worker closes the line, which makes everyone else fail with
// `Closed`; report the failure that started it.
fn root_cause(errors: Vec<WorkerError>) -> Option<WorkerError> {
    let is_knock_on = |err: &WorkerError| {
        matches!(
            err,
            WorkerError::Queue {
                source: QueueError::Closed,
                ..
            }
        )
    };
    let first_real = errors.iter().position(|err| !is_knock_on(err));
    let mut errors = errors;
    match first_real {
        Some(index) => Some(errors.swap_remove(index)),
        None => errors.into_iter().next(),
    }
}
