//! Command execution: run the requested task and report the outcome.

mod task;

pub use task::{TaskSummary, execute_task, print_summary};

use crate::cli::{Args, RuntimeConfig};
use crate::error::Result;

/// Execute the task named by the parsed arguments; returns the exit code
pub async fn execute_command(args: Args) -> Result<i32> {
    if let Err(validation_error) = args.validate() {
        let output = super::OutputManager::new();
        output.error(&format!("Invalid arguments: {}", validation_error));
        return Ok(1);
    }

    let project_root = std::env::current_dir()?;
    let config = RuntimeConfig::new(&project_root);
    let kind = args.task().kind();

    match execute_task(kind, args.message.clone(), &config).await {
        Ok(summary) => {
            print_summary(&summary, &config);
            Ok(0)
        }
        Err(e) => {
            config.error_println(&format!("Task '{}' failed: {}", kind, e));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                config.println("\n💡 Recovery suggestions:");
                for suggestion in suggestions {
                    config.println(&format!("  • {}", suggestion));
                }
            }

            Ok(1)
        }
    }
}
