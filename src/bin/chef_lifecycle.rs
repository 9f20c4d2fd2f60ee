//! One chef hands a slow job to a helper and checks whether the helper is alive.
//!
//! Run with: cargo run --bin chef_lifecycle

use colored::Colorize;
use soup_line::lifecycle::run_helper;
use soup_line::{init_tracing, Config, ScenarioError};

fn main() -> Result<(), ScenarioError> {
    init_tracing();
    let config = Config::from_env()?;

    println!("{}", "=== Thread Lifecycle ===".bold());
    let report = run_helper(&config.lifecycle)?;

    for checkpoint in &report.checkpoints {
        let alive = if checkpoint.alive {
            "alive".green()
        } else {
            "not alive".yellow()
        };
        println!("  {:<14} {} {}", checkpoint.label, report.helper.cyan(), alive);
    }
    println!("\n{}", "Both chefs are done!".bold());
    Ok(())
}
