//! Scheduled-task management through the OS task-scheduler tool.
//!
//! Components, leaf first:
//! - [`catalog`]: recognised schedule kinds and modifier limits
//! - [`path`]: `Folder\Task` decomposition
//! - [`tool`]: scheduler tool argument builders
//! - [`query`]: task listing and CSV parsing
//! - [`registry`]: create/run/delete/edit/exists orchestration
//! - [`report`]: fixed-width table rendering

pub mod catalog;
pub mod path;
pub mod query;
pub mod registry;
pub mod report;
pub mod tool;

pub use catalog::{ScheduleCatalog, ScheduleDefinition};
pub use path::{ExplodedPath, explode, join};
pub use query::{TaskQuery, TaskRecord, parse_task_csv};
pub use registry::{ActionOutcome, MatchResult, TaskAction, TaskRegistry, filter_by_name};
pub use report::ReportFormatter;
pub use tool::{Credentials, SchedulerTool, Toggle};
