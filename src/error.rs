//! Error types for scheduled-task management.

use crate::process::ToolOutput;

/// Top-level error type for scheduled-task operations.
///
/// Validation variants are produced locally before the scheduler tool is
/// ever invoked. Only [`TaskError::ExternalToolFailure`] reflects something
/// the external tool did.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The schedule kind is not in the catalog.
    #[error("Invalid value for 'Schedule': {0}")]
    InvalidScheduleType(String),

    /// The modifier is not an integer.
    #[error("Invalid value for 'Modifier': {0}")]
    InvalidModifier(String),

    /// The modifier exceeds the schedule kind's maximum.
    #[error("Modifier for task exceeds maximum value ({modifier}). {definition}")]
    ModifierOutOfRange {
        /// Parsed modifier value.
        modifier: i64,
        /// Rendered schedule definition the modifier was checked against.
        definition: String,
    },

    /// The path has no task name (empty, or ends with a separator).
    #[error("invalid task path: {0:?}")]
    InvalidPath(String),

    /// No task exists at the given path.
    #[error("scheduled task not found: {0}")]
    PathNotFound(String),

    /// Toggle was neither `enable` nor `disable`.
    #[error("Invalid value for 'Toggle': {0} (expected enable or disable)")]
    ToggleInvalid(String),

    /// A task already exists at the given path.
    #[error("Failed to create task. Task already exists: {0}")]
    AlreadyExists(String),

    /// The scheduler tool could not be run, timed out, exited non-zero or
    /// did not report success.
    ///
    /// The captured output is kept for diagnostics. Invocation arguments are
    /// never part of this error, so run-as credentials cannot leak through it.
    #[error("scheduler tool failed to {action}: {reason}")]
    ExternalToolFailure {
        /// Verb describing the attempted action (e.g. `"create task"`).
        action: &'static str,
        /// Short human-readable cause.
        reason: String,
        /// Captured process output, when the process ran at all.
        output: Option<ToolOutput>,
    },

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TaskError {
    /// Build an [`TaskError::ExternalToolFailure`] without captured output.
    pub fn tool_failure(action: &'static str, reason: impl Into<String>) -> Self {
        Self::ExternalToolFailure {
            action,
            reason: reason.into(),
            output: None,
        }
    }

    /// Captured tool output attached to this error, if any.
    pub fn tool_output(&self) -> Option<&ToolOutput> {
        match self {
            Self::ExternalToolFailure { output, .. } => output.as_ref(),
            _ => None,
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, TaskError>;
