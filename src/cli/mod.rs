//! Command line interface for node_release_base.

mod args;
pub mod commands;
mod output;

pub use args::{Args, RuntimeConfig, Task};
pub use commands::execute_command;
pub use output::OutputManager;

use crate::error::Result;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute_command(args).await
}
