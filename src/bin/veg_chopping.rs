//! Two chefs chop until a stop signal arrives one second later.
//!
//! Run with: cargo run --bin veg_chopping

use colored::Colorize;
use soup_line::signal::run_choppers;
use soup_line::{init_tracing, Config, ScenarioError};

fn main() -> Result<(), ScenarioError> {
    init_tracing();
    let config = Config::from_env()?;

    println!("{}", "=== Vegetable Chopping ===".bold());
    let reports = run_choppers(&config.chopping)?;

    for report in &reports {
        println!("  {} chopped {} vegs", report.name.cyan(), report.chopped.to_string().green());
    }
    Ok(())
}
