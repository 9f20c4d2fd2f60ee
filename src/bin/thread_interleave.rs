//! Hello from a thread, then three tagged threads printing interleaved lines.
//!
//! Run with: cargo run --bin thread_interleave

use colored::Colorize;
use soup_line::lifecycle::{hello_concurrent_world, run_tagged};
use soup_line::{init_tracing, WorkerError};

fn main() -> Result<(), WorkerError> {
    init_tracing();

    println!("{}", "=== Hello ===".bold());
    hello_concurrent_world()?;

    println!("\n{}", "=== Interleaved ===".bold());
    let lines = run_tagged(&["A", "\tB", "\t\tC"], 10)?;
    let total: usize = lines.iter().map(Vec::len).sum();
    println!("\n{} lines from {} threads", total.to_string().green(), lines.len());
    Ok(())
}
