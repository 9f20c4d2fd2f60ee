//! Stop signal broadcast to busy worker loops, and the vegetable-chopping run
//! built on it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, trace, warn};

use crate::config::ChoppingConfig;
use crate::error::ScenarioError;
use crate::worker::{self, Worker};

/// A one-way "stop now" flag shared by any number of workers.
///
/// `stop` is a release store and `is_stopped` an acquire load, so whatever the
/// controller wrote before stopping is visible to a worker that sees the flag.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    stopped: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChopReport {
    pub name: String,
    pub chopped: u64,
}

/// Chops as fast as possible until told to stop. Returns the count.
pub fn chop_until_stopped(name: &str, signal: &StopSignal) -> u64 {
    let mut chopped = 0u64;
    while !signal.is_stopped() {
        trace!(worker = name, "chopped a veg");
        chopped += 1;
    }
    info!(worker = name, chopped, "done chopping");
    chopped
}

fn spawn_choppers(
    names: &[String],
    signal: &StopSignal,
) -> Result<Vec<Worker<ChopReport>>, ScenarioError> {
    let mut workers = Vec::with_capacity(names.len());
    for name in names {
        let worker_signal = signal.clone();
        let worker_name = name.clone();
        let spawned = worker::spawn(name.clone(), move || ChopReport {
            chopped: chop_until_stopped(&worker_name, &worker_signal),
            name: worker_name,
        });
        match spawned {
            Ok(worker) => workers.push(worker),
            Err(err) => {
                // Let the ones already running wind down before bailing out.
                signal.stop();
                let _ = worker::join_all(workers);
                return Err(err.into());
            }
        }
    }
    Ok(workers)
}

fn wait_for_exit<R>(workers: &[Worker<R>], grace: Duration) -> Result<(), ScenarioError> {
    let deadline = Instant::now() + grace;
    while let Some(straggler) = workers.iter().find(|w| w.is_alive()) {
        if Instant::now() >= deadline {
            return Err(ScenarioError::GraceExceeded {
                name: straggler.name().to_string(),
                grace,
            });
        }
        thread::sleep(Duration::from_millis(1));
    }
    Ok(())
}

/// Lets every named worker chop for `run_for`, then stops them all.
///
/// Fails if a worker outlives the grace period or never chopped anything.
/// Stragglers are still joined before the grace error is returned.
pub fn run_choppers(config: &ChoppingConfig) -> Result<Vec<ChopReport>, ScenarioError> {
    config.validate()?;
    let signal = StopSignal::new();
    let workers = spawn_choppers(&config.workers, &signal)?;

    thread::sleep(config.run_for());
    signal.stop();
    if let Err(err) = wait_for_exit(&workers, config.grace()) {
        warn!(%err, "joining stragglers anyway");
        let _ = worker::join_all(workers);
        return Err(err);
    }

    let reports = worker::join_all(workers)?;
    if let Some(idle) = reports.iter().find(|r| r.chopped == 0) {
        return Err(ScenarioError::Idle {
            name: idle.name.clone(),
        });
    }
    Ok(reports)
}
