//! Task listing: runs the scheduler tool in query mode and parses its CSV.

use serde::Serialize;

use crate::error::{Result, TaskError};
use crate::process::CommandRunner;
use crate::scheduler::tool::SchedulerTool;

/// One task as reported by the scheduler tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRecord {
    /// Full task name (usually the rooted path, e.g. `\Folder\Task`).
    pub name: String,
    /// Scheduler-reported state such as `Ready`, `Disabled` or `Running`.
    pub status: String,
    /// Next scheduled run time, as printed by the tool.
    pub next_run: String,
}

/// Parse headerless CSV query output, preserving line order.
///
/// Column order is name, next run, status. Lines with fewer than three
/// fields (blank lines, banners, malformed rows) are skipped.
pub fn parse_task_csv(output: &str) -> Vec<TaskRecord> {
    output
        .split('\n')
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(',').collect();
            if fields.len() < 3 {
                return None;
            }
            Some(TaskRecord {
                name: strip_quotes(fields[0]),
                next_run: strip_quotes(fields[1]),
                status: strip_quotes(fields[2]).replace('\r', ""),
            })
        })
        .collect()
}

fn strip_quotes(field: &str) -> String {
    field.replace('"', "")
}

/// Reads the current task list of a folder through the scheduler tool.
pub struct TaskQuery<'a> {
    runner: &'a dyn CommandRunner,
    tool: &'a SchedulerTool,
}

impl<'a> TaskQuery<'a> {
    /// Create a query bound to a runner and tool.
    pub fn new(runner: &'a dyn CommandRunner, tool: &'a SchedulerTool) -> Self {
        Self { runner, tool }
    }

    /// List the tasks in `folder` (blank means root), in tool order.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::ExternalToolFailure`] if the tool cannot be run
    /// or times out. A folder the tool reports as missing or empty yields an
    /// empty list rather than an error.
    pub fn list(&self, folder: &str) -> Result<Vec<TaskRecord>> {
        let invocation = self.tool.query(folder);
        let output = self.runner.run(&invocation)?;
        if output.timed_out {
            return Err(TaskError::ExternalToolFailure {
                action: "query tasks",
                reason: format!("timed out after {}s", invocation.timeout.as_secs()),
                output: Some(output),
            });
        }
        if !output.success() {
            // schtasks exits non-zero when the folder does not exist, but also
            // on access denied. Both read as "no tasks" to callers.
            tracing::warn!(
                folder = folder,
                exit_code = ?output.exit_code,
                stderr = %output.stderr.trim(),
                "task query failed; treating folder as empty"
            );
        }
        let tasks = parse_task_csv(&output.stdout);
        tracing::debug!(folder = folder, count = tasks.len(), "queried tasks");
        Ok(tasks)
    }
}
