//! Thread lifecycle walk-throughs: watching one helper go from not-started to
//! running to joined, and a handful of tagged threads writing interleaved lines.

use std::thread;

use tracing::info;

use crate::config::LifecycleConfig;
use crate::error::{ScenarioError, WorkerError};
use crate::worker::{self, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub label: &'static str,
    pub alive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleReport {
    pub helper: String,
    pub checkpoints: Vec<Checkpoint>,
}

impl LifecycleReport {
    pub fn alive_at(&self, label: &str) -> Option<bool> {
        self.checkpoints.iter().find(|c| c.label == label).map(|c| c.alive)
    }
}

/// Hands a slow job to a helper thread and checks on it along the way.
pub fn run_helper(config: &LifecycleConfig) -> Result<LifecycleReport, ScenarioError> {
    let task_time = config.task();
    let helper = config.helper.clone();
    let mut checkpoints = Vec::with_capacity(4);

    info!("requesting {helper}'s help");
    let mut task = Task::new(helper.clone(), move || {
        info!("started, waiting for the sausage to thaw");
        thread::sleep(task_time);
        info!("done cutting the sausage");
    });
    let mut check = |label: &'static str, task: &Task<()>| {
        let alive = task.is_alive();
        info!(helper = task.name(), label, alive, "alive?");
        checkpoints.push(Checkpoint { label, alive });
    };

    check("before start", &task);
    task.start()?;
    check("after start", &task);

    info!("continuing to cook soup");
    thread::sleep(config.check_after());
    check("while cooking", &task);

    info!("waiting for {helper} to finish and join");
    task.join()?;
    check("after join", &task);

    Ok(LifecycleReport { helper, checkpoints })
}

/// Runs one thread per tag, each writing `count` numbered lines, and joins
/// them all. Lines from different threads interleave freely on stdout.
pub fn run_tagged(tags: &[&str], count: usize) -> Result<Vec<Vec<String>>, WorkerError> {
    let mut workers = Vec::with_capacity(tags.len());
    for (i, tag) in tags.iter().enumerate() {
        let tag = tag.to_string();
        let spawned = worker::spawn(format!("tagged-{i}"), move || {
            (0..count)
                .map(|n| {
                    let line = format!("{tag}{n}");
                    // One write per line keeps each line intact.
                    println!("{line}");
                    line
                })
                .collect::<Vec<_>>()
        });
        match spawned {
            Ok(worker) => workers.push(worker),
            Err(err) => {
                let _ = worker::join_all(workers);
                return Err(err);
            }
        }
    }
    worker::join_all(workers)
}

/// The smallest possible concurrent program: one thread, one greeting, one join.
pub fn hello_concurrent_world() -> Result<String, WorkerError> {
    worker::spawn("hello", || {
        let greeting = "Hello Concurrent World".to_string();
        println!("{greeting}");
        greeting
    })?
    .join()
}
