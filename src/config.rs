//! Configuration types for schedctl.
//!
//! Loaded once from TOML and passed into [`TaskRegistry`](crate::scheduler::TaskRegistry);
//! nothing here is global.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskError};
use crate::scheduler::catalog::{ScheduleCatalog, ScheduleDefinition, standard_schedules};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedctlConfig {
    /// External scheduler tool settings.
    pub tool: ToolConfig,
    /// Report table layout.
    pub report: ReportLayout,
    /// Recognised schedule kinds and their modifier limits.
    pub schedules: Vec<ScheduleDefinition>,
}

impl Default for SchedctlConfig {
    fn default() -> Self {
        Self {
            tool: ToolConfig::default(),
            report: ReportLayout::default(),
            schedules: standard_schedules(),
        }
    }
}

/// Settings for invoking the external scheduler tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Program name or path. Bare names are resolved through `PATH`.
    pub program: String,
    /// Per-invocation timeout in seconds. Expiry kills the process.
    pub timeout_secs: u64,
    /// Literal marker the tool prints on a successful create.
    ///
    /// Checked only after a zero exit code; see
    /// [`TaskRegistry::create`](crate::scheduler::TaskRegistry::create).
    pub success_token: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: "schtasks.exe".to_owned(),
            timeout_secs: 60,
            success_token: "SUCCESS".to_owned(),
        }
    }
}

impl ToolConfig {
    /// Invocation timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolve [`program`](Self::program) to an executable path.
    ///
    /// Paths and names not found on `PATH` are returned as given so the
    /// spawn error names what the user configured.
    pub fn resolve_program(&self) -> PathBuf {
        let program = Path::new(&self.program);
        if program.components().count() > 1 {
            return program.to_path_buf();
        }
        which::which(&self.program).unwrap_or_else(|_| program.to_path_buf())
    }
}

/// Column layout of the task report table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportLayout {
    /// Width of the task-name column; longer names are truncated with `ellipsis`.
    pub name_width: usize,
    /// Width of the status column.
    pub status_width: usize,
    /// Width of the next-run column.
    pub next_run_width: usize,
    /// Suffix appended to truncated names.
    pub ellipsis: String,
}

impl Default for ReportLayout {
    fn default() -> Self {
        Self {
            name_width: 100,
            status_width: 10,
            next_run_width: 20,
            ellipsis: "...".to_owned(),
        }
    }
}

impl SchedctlConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or contains an
    /// invalid schedule table.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| TaskError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the default path, or defaults if no file exists there.
    ///
    /// # Errors
    ///
    /// Returns an error if a file exists but cannot be loaded.
    pub fn load_or_default() -> Result<Self> {
        let path = Self::default_config_path();
        if path.is_file() {
            tracing::debug!(path = %path.display(), "loading config");
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| TaskError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `<config_dir>/config.toml`.
    pub fn default_config_path() -> PathBuf {
        crate::app_dirs::config_dir().join("config.toml")
    }

    /// Check invariants that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Config`] on an invalid schedule table or layout.
    pub fn validate(&self) -> Result<()> {
        self.catalog()?;
        if self.report.name_width <= self.report.ellipsis.chars().count() {
            return Err(TaskError::Config(format!(
                "report.name_width ({}) must exceed the ellipsis length",
                self.report.name_width
            )));
        }
        if self.tool.program.trim().is_empty() {
            return Err(TaskError::Config("tool.program is empty".to_owned()));
        }
        Ok(())
    }

    /// Build the immutable schedule catalog from [`schedules`](Self::schedules).
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Config`] if the table is empty or has duplicates.
    pub fn catalog(&self) -> Result<ScheduleCatalog> {
        ScheduleCatalog::new(self.schedules.clone())
    }
}
