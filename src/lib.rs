//! schedctl: manage OS scheduled tasks through the system task-scheduler tool.
//!
//! The crate drives `schtasks` (or a compatible tool) as a child process and
//! normalises its CSV output into [`TaskRecord`]s. Each operation is a
//! one-shot, synchronous request: validate locally, re-read scheduler state,
//! then issue at most one mutating call.
//!
//! # Architecture
//!
//! - **Process layer**: [`process::CommandRunner`] launches the tool without
//!   a shell, with a timeout, capturing exit code, stdout and stderr
//! - **Scheduler layer**: [`scheduler::TaskRegistry`] validates requests
//!   against the [`scheduler::ScheduleCatalog`] and classifies tool results
//! - **Presentation**: [`scheduler::ReportFormatter`] renders fixed-width tables

pub mod app_dirs;
pub mod config;
pub mod error;
pub mod process;
pub mod scheduler;

pub use config::SchedctlConfig;
pub use error::{Result, TaskError};
pub use process::{CommandRunner, SystemRunner, ToolInvocation, ToolOutput};
pub use scheduler::{TaskRecord, TaskRegistry};
