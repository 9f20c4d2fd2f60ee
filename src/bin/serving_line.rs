//! Producers serve soup, consumers eat it, everyone is joined before exit.
//!
//! Run with: cargo run --bin serving_line
//! Settings come from the TOML file named by `SOUP_LINE_CONFIG`, if any.

use colored::Colorize;
use soup_line::serving::ServingLine;
use soup_line::{init_tracing, Config, ScenarioError};

fn main() -> Result<(), ScenarioError> {
    init_tracing();
    let config = Config::from_env()?;

    println!("{}", "=== Serving Line ===".bold());
    let report = ServingLine::new(config.serving)?.run()?;

    println!("\n{}", "=== Summary ===".bold());
    for producer in &report.producers {
        println!(
            "  {} served {} bowls, {} sentinels",
            producer.name.cyan(),
            producer.produced,
            producer.sentinels
        );
    }
    for consumer in &report.consumers {
        println!(
            "  {} ate {} bowls ({:?})",
            consumer.name.cyan(),
            consumer.processed.len(),
            consumer.state
        );
    }

    let verdict = format!(
        "{} served, {} eaten",
        report.total_served(),
        report.total_eaten()
    );
    if report.total_served() == report.total_eaten() && report.all_finished() {
        println!("\n{}", verdict.green());
    } else {
        println!("\n{}", verdict.red());
    }
    Ok(())
}
