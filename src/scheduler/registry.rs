//! Create/run/delete/edit/exists operations on scheduled tasks.
//!
//! Every operation re-reads scheduler state through [`TaskQuery`]; nothing is
//! cached between calls. The existence check and the mutating call are two
//! separate tool invocations, so two callers racing on the same path can both
//! pass the check. The scheduler tool's own behaviour decides that race.

use std::fmt;

use crate::config::SchedctlConfig;
use crate::error::{Result, TaskError};
use crate::process::{CommandRunner, ToolInvocation, ToolOutput};
use crate::scheduler::catalog::ScheduleCatalog;
use crate::scheduler::path::{ExplodedPath, explode};
use crate::scheduler::query::{TaskQuery, TaskRecord};
use crate::scheduler::tool::{Credentials, SchedulerTool, Toggle};

/// Name that matches every task in [`filter_by_name`].
pub const WILDCARD: &str = "*";

/// Outcome of [`filter_by_name`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult<'a> {
    /// Wildcard: the whole list, unfiltered.
    All(&'a [TaskRecord]),
    /// First record whose name contains the requested name.
    Single(&'a TaskRecord),
    /// No record matched.
    NotFound(String),
}

impl MatchResult<'_> {
    /// Message shown when nothing matched.
    pub fn not_found_message(name: &str) -> String {
        format!("Unable to locate any scheduled tasks matching name: {name}")
    }
}

/// Select tasks by name.
///
/// `"*"` returns the full list. Any other name returns the first record whose
/// name contains it, or [`MatchResult::NotFound`]; it never falls back to the
/// full list.
pub fn filter_by_name<'a>(tasks: &'a [TaskRecord], name: &str) -> MatchResult<'a> {
    if name == WILDCARD {
        return MatchResult::All(tasks);
    }
    match tasks.iter().find(|task| task.name.contains(name)) {
        Some(task) => MatchResult::Single(task),
        None => MatchResult::NotFound(name.to_owned()),
    }
}

/// Mutating request issued to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    /// Task created.
    Create,
    /// Task started immediately.
    Run,
    /// Task deleted.
    Delete,
    /// Task command, state or account changed.
    Edit,
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Run => "run",
            Self::Delete => "delete",
            Self::Edit => "edit",
        })
    }
}

/// Successful result of a mutating operation.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    /// What was done.
    pub action: TaskAction,
    /// Full task path acted on.
    pub path: String,
    /// Raw tool output.
    pub output: ToolOutput,
}

impl ActionOutcome {
    /// Tool stdout, trimmed.
    pub fn message(&self) -> &str {
        self.output.stdout.trim()
    }
}

/// Orchestrates validation, existence checks and scheduler tool calls.
pub struct TaskRegistry<R> {
    runner: R,
    tool: SchedulerTool,
    catalog: ScheduleCatalog,
    success_token: String,
}

impl<R: CommandRunner> TaskRegistry<R> {
    /// Build a registry from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Config`] if the schedule table is invalid.
    pub fn new(config: &SchedctlConfig, runner: R) -> Result<Self> {
        Ok(Self::with_parts(
            runner,
            SchedulerTool::from_config(&config.tool),
            config.catalog()?,
            config.tool.success_token.clone(),
        ))
    }

    /// Build a registry from already-constructed parts.
    pub fn with_parts(
        runner: R,
        tool: SchedulerTool,
        catalog: ScheduleCatalog,
        success_token: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            tool,
            catalog,
            success_token: success_token.into(),
        }
    }

    /// The schedule catalog used for validation.
    pub fn catalog(&self) -> &ScheduleCatalog {
        &self.catalog
    }

    fn query(&self) -> TaskQuery<'_> {
        TaskQuery::new(&self.runner, &self.tool)
    }

    /// Tasks in `folder`, in tool order.
    ///
    /// # Errors
    ///
    /// Propagates tool failures from [`TaskQuery::list`].
    pub fn list(&self, folder: &str) -> Result<Vec<TaskRecord>> {
        self.query().list(folder)
    }

    /// `true` if `folder` contains at least one task.
    ///
    /// # Errors
    ///
    /// Propagates tool failures from [`TaskQuery::list`].
    pub fn folder_exists(&self, folder: &str) -> Result<bool> {
        Ok(!self.list(folder)?.is_empty())
    }

    /// `true` if a task in `folder` matches `name`.
    ///
    /// With the wildcard this is the same as [`folder_exists`](Self::folder_exists).
    ///
    /// # Errors
    ///
    /// Propagates tool failures from [`TaskQuery::list`].
    pub fn task_exists(&self, folder: &str, name: &str) -> Result<bool> {
        let tasks = self.list(folder)?;
        Ok(match filter_by_name(&tasks, name) {
            MatchResult::Single(_) => true,
            MatchResult::All(all) => !all.is_empty(),
            MatchResult::NotFound(_) => false,
        })
    }

    /// `true` if a task exists at `full_path`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::InvalidPath`] for a path with no task name, or
    /// propagates tool failures.
    pub fn exists(&self, full_path: &str) -> Result<bool> {
        let path = split_task_path(full_path)?;
        self.task_exists(&path.folder, &path.name)
    }

    /// Create a task unless one already exists at `full_path`.
    ///
    /// Validation order: schedule kind, modifier, path, existence. The
    /// scheduler tool is only invoked once all of them pass.
    ///
    /// # Errors
    ///
    /// - [`TaskError::InvalidScheduleType`] for an unknown kind
    /// - [`TaskError::InvalidModifier`] / [`TaskError::ModifierOutOfRange`]
    /// - [`TaskError::AlreadyExists`] if the task exists; nothing is created
    /// - [`TaskError::ExternalToolFailure`] if the tool fails or does not
    ///   report success
    pub fn create(
        &self,
        schedule_kind: &str,
        modifier: &str,
        full_path: &str,
        run_command: &str,
    ) -> Result<ActionOutcome> {
        let definition = self
            .catalog
            .lookup(schedule_kind)
            .ok_or_else(|| TaskError::InvalidScheduleType(schedule_kind.to_owned()))?;

        let modifier_value: i64 = modifier
            .trim()
            .parse()
            .map_err(|_| TaskError::InvalidModifier(modifier.to_owned()))?;
        if !definition.accepts(modifier_value) {
            return Err(TaskError::ModifierOutOfRange {
                modifier: modifier_value,
                definition: definition.to_string(),
            });
        }

        let path = split_task_path(full_path)?;
        if self.task_exists(&path.folder, &path.name)? {
            return Err(TaskError::AlreadyExists(full_path.to_owned()));
        }

        let full_path = path.full_path();
        let invocation =
            self.tool
                .create(&definition.name, modifier_value, &full_path, run_command);
        let output = self.invoke(
            "create task",
            &invocation,
            Some(self.success_token.as_str()),
        )?;

        tracing::info!(
            path = %full_path,
            schedule = %definition.name,
            modifier = modifier_value,
            "scheduled task created"
        );
        Ok(ActionOutcome {
            action: TaskAction::Create,
            path: full_path,
            output,
        })
    }

    /// Start an existing task now.
    ///
    /// # Errors
    ///
    /// [`TaskError::PathNotFound`] if no task exists, or
    /// [`TaskError::ExternalToolFailure`].
    pub fn run(&self, full_path: &str) -> Result<ActionOutcome> {
        self.require_existing(full_path)?;
        let output = self.invoke("run task", &self.tool.run(full_path), None)?;
        tracing::info!(path = full_path, "scheduled task started");
        Ok(ActionOutcome {
            action: TaskAction::Run,
            path: full_path.to_owned(),
            output,
        })
    }

    /// Delete an existing task without confirmation.
    ///
    /// # Errors
    ///
    /// [`TaskError::PathNotFound`] if no task exists, or
    /// [`TaskError::ExternalToolFailure`].
    pub fn delete(&self, full_path: &str) -> Result<ActionOutcome> {
        self.require_existing(full_path)?;
        let output = self.invoke("delete task", &self.tool.delete(full_path), None)?;
        tracing::info!(path = full_path, "scheduled task deleted");
        Ok(ActionOutcome {
            action: TaskAction::Delete,
            path: full_path.to_owned(),
            output,
        })
    }

    /// Enable or disable an existing task, optionally replacing its command
    /// and run-as account.
    ///
    /// `toggle` is validated before the scheduler is queried. The password in
    /// `credentials` is passed to the tool but never logged.
    ///
    /// # Errors
    ///
    /// [`TaskError::ToggleInvalid`], [`TaskError::PathNotFound`] or
    /// [`TaskError::ExternalToolFailure`].
    pub fn edit(
        &self,
        full_path: &str,
        toggle: &str,
        run_command: Option<&str>,
        credentials: Option<&Credentials>,
    ) -> Result<ActionOutcome> {
        let toggle = Toggle::parse(toggle).ok_or_else(|| TaskError::ToggleInvalid(toggle.to_owned()))?;
        self.require_existing(full_path)?;

        let invocation = self
            .tool
            .change(full_path, toggle, run_command, credentials);
        let output = self.invoke("edit task", &invocation, None)?;
        tracing::info!(
            path = full_path,
            toggle = ?toggle,
            run_as = credentials.map(|c| c.user.as_str()),
            "scheduled task changed"
        );
        Ok(ActionOutcome {
            action: TaskAction::Edit,
            path: full_path.to_owned(),
            output,
        })
    }

    fn require_existing(&self, full_path: &str) -> Result<()> {
        if self.exists(full_path)? {
            Ok(())
        } else {
            Err(TaskError::PathNotFound(full_path.to_owned()))
        }
    }

    /// Run a mutating invocation and classify the result.
    ///
    /// The exit code decides first. A required success token is only
    /// consulted after a zero exit, to catch tools that exit 0 on soft failures.
    fn invoke(
        &self,
        action: &'static str,
        invocation: &ToolInvocation,
        success_token: Option<&str>,
    ) -> Result<ToolOutput> {
        let output = self.runner.run(invocation)?;
        let reason = if output.timed_out {
            Some(format!("timed out after {}s", invocation.timeout.as_secs()))
        } else if !output.success() {
            Some(match output.exit_code {
                Some(code) => format!("exited with code {code}"),
                None => "terminated without an exit code".to_owned(),
            })
        } else {
            match success_token {
                Some(token) if !token.is_empty() && !output.stdout.contains(token) => {
                    Some(format!("success token {token:?} missing from output"))
                }
                _ => None,
            }
        };

        match reason {
            Some(reason) => {
                tracing::warn!(action, reason = %reason, "scheduler tool reported failure");
                Err(TaskError::ExternalToolFailure {
                    action,
                    reason,
                    output: Some(output),
                })
            }
            None => Ok(output),
        }
    }
}

fn split_task_path(full_path: &str) -> Result<ExplodedPath> {
    let path = explode(full_path);
    if path.name.trim().is_empty() {
        return Err(TaskError::InvalidPath(full_path.to_owned()));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    fn record(name: &str) -> TaskRecord {
        TaskRecord {
            name: name.to_owned(),
            status: "Ready".to_owned(),
            next_run: "N/A".to_owned(),
        }
    }

    /// Replies to queries with a fixed task list and to everything else
    /// with a fixed output, recording every argv.
    struct StubRunner {
        query_stdout: String,
        action_output: ToolOutput,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl StubRunner {
        fn new(query_stdout: &str, action_output: ToolOutput) -> Self {
            Self {
                query_stdout: query_stdout.to_owned(),
                action_output,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn verbs(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|args| args[0].clone())
                .collect()
        }
    }

    impl CommandRunner for StubRunner {
        fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput> {
            self.calls.lock().unwrap().push(invocation.args.clone());
            if invocation.args[0] == "/query" {
                return Ok(ToolOutput {
                    exit_code: Some(0),
                    stdout: self.query_stdout.clone(),
                    ..Default::default()
                });
            }
            Ok(self.action_output.clone())
        }
    }

    fn ok(stdout: &str) -> ToolOutput {
        ToolOutput {
            exit_code: Some(0),
            stdout: stdout.to_owned(),
            ..Default::default()
        }
    }

    fn registry(runner: StubRunner) -> TaskRegistry<StubRunner> {
        TaskRegistry::with_parts(
            runner,
            SchedulerTool::new("schtasks.exe", Duration::from_secs(5)),
            ScheduleCatalog::default(),
            "SUCCESS",
        )
    }

    const EXISTING: &str = "\"\\Folder\\MyTask\",\"01/01/2030 00:00:00\",\"Ready\"\r\n";

    #[test]
    fn wildcard_returns_full_list() {
        let tasks = vec![record("\\A"), record("\\B")];
        assert_eq!(filter_by_name(&tasks, "*"), MatchResult::All(&tasks));
        assert_eq!(filter_by_name(&[], "*"), MatchResult::All(&[]));
    }

    #[test]
    fn substring_match_returns_first() {
        let tasks = vec![record("\\Folder\\Backup"), record("\\Folder\\BackupWeekly")];
        assert_eq!(
            filter_by_name(&tasks, "Backup"),
            MatchResult::Single(&tasks[0])
        );
    }

    #[test]
    fn no_match_is_not_found_never_full_list() {
        let tasks = vec![record("\\A"), record("\\B")];
        assert_eq!(
            filter_by_name(&tasks, "NoSuchTask"),
            MatchResult::NotFound("NoSuchTask".to_owned())
        );
    }

    #[test]
    fn every_kind_accepts_max_and_rejects_max_plus_one() {
        for def in ScheduleCatalog::default().iter() {
            let reg = registry(StubRunner::new("", ok("SUCCESS: created")));
            let max = def.max_modifier.to_string();
            assert!(
                reg.create(&def.name, &max, "F\\T", "C:\\run.exe").is_ok(),
                "{} should accept {max}",
                def.name
            );

            let over = (def.max_modifier + 1).to_string();
            let err = reg.create(&def.name, &over, "F\\T", "C:\\run.exe").unwrap_err();
            assert!(matches!(err, TaskError::ModifierOutOfRange { .. }));
        }
    }

    #[test]
    fn invalid_kind_rejected_before_any_call() {
        let runner = StubRunner::new("", ok("SUCCESS"));
        let reg = registry(runner);
        let err = reg.create("YEARLY", "1", "F\\T", "x").unwrap_err();
        assert!(matches!(err, TaskError::InvalidScheduleType(k) if k == "YEARLY"));
        assert!(reg.runner.verbs().is_empty());
    }

    #[test]
    fn non_numeric_modifier_rejected() {
        let reg = registry(StubRunner::new("", ok("SUCCESS")));
        let err = reg.create("DAILY", "often", "F\\T", "x").unwrap_err();
        assert!(matches!(err, TaskError::InvalidModifier(_)));
    }

    #[test]
    fn out_of_range_message_names_definition() {
        let reg = registry(StubRunner::new("", ok("SUCCESS")));
        let err = reg.create("hourly", "24", "F\\T", "x").unwrap_err();
        assert!(err.to_string().contains("Option: Name=HOURLY | MaximumValue=23"));
    }

    #[test]
    fn create_existing_task_does_not_invoke_create() {
        let reg = registry(StubRunner::new(EXISTING, ok("SUCCESS")));
        let err = reg.create("DAILY", "1", "Folder\\MyTask", "C:\\run.exe").unwrap_err();
        assert!(matches!(err, TaskError::AlreadyExists(_)));
        assert_eq!(reg.runner.verbs(), ["/query"]);
    }

    #[test]
    fn create_requires_success_token_after_zero_exit() {
        let reg = registry(StubRunner::new("", ok("WARNING: something odd")));
        let err = reg.create("DAILY", "1", "Folder\\New", "C:\\run.exe").unwrap_err();
        match err {
            TaskError::ExternalToolFailure { output, reason, .. } => {
                assert!(reason.contains("SUCCESS"));
                assert_eq!(output.unwrap().stdout, "WARNING: something odd");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn create_nonzero_exit_fails_even_with_token() {
        let output = ToolOutput {
            exit_code: Some(1),
            stdout: "SUCCESS".to_owned(),
            ..Default::default()
        };
        let reg = registry(StubRunner::new("", output));
        let err = reg.create("DAILY", "1", "Folder\\New", "C:\\run.exe").unwrap_err();
        assert!(err.to_string().contains("exited with code 1"));
    }

    #[test]
    fn create_timeout_is_tool_failure() {
        let output = ToolOutput {
            timed_out: true,
            ..Default::default()
        };
        let reg = registry(StubRunner::new("", output));
        let err = reg.create("DAILY", "1", "Folder\\New", "C:\\run.exe").unwrap_err();
        assert!(err.to_string().contains("timed out after 5s"));
    }

    #[test]
    fn create_queries_parent_folder_then_creates() {
        let reg = registry(StubRunner::new("", ok("SUCCESS: The scheduled task was created.")));
        let outcome = reg.create("daily", "1", "Folder\\MyTask", "C:\\run.exe").unwrap();
        assert_eq!(outcome.action, TaskAction::Create);
        assert_eq!(outcome.message(), "SUCCESS: The scheduled task was created.");

        let calls = reg.runner.calls.lock().unwrap();
        assert_eq!(calls[0].last().map(String::as_str), Some("Folder\\"));
        assert_eq!(calls[1][0], "/create");
        // Kind is normalised to the catalog spelling.
        assert_eq!(calls[1][2], "DAILY");
    }

    #[test]
    fn run_missing_task_is_path_not_found() {
        let reg = registry(StubRunner::new("", ok("")));
        let err = reg.run("Folder\\Missing").unwrap_err();
        assert!(matches!(err, TaskError::PathNotFound(p) if p == "Folder\\Missing"));
        assert_eq!(reg.runner.verbs(), ["/query"]);
    }

    #[test]
    fn delete_existing_task_is_forced() {
        let reg = registry(StubRunner::new(EXISTING, ok("SUCCESS: deleted")));
        let outcome = reg.delete("Folder\\MyTask").unwrap();
        assert_eq!(outcome.action, TaskAction::Delete);
        let calls = reg.runner.calls.lock().unwrap();
        assert_eq!(calls[1], ["/delete", "/tn", "Folder\\MyTask", "/f"]);
    }

    #[test]
    fn edit_invalid_toggle_checked_first() {
        let reg = registry(StubRunner::new(EXISTING, ok("SUCCESS")));
        let err = reg.edit("Folder\\MyTask", "pause", None, None).unwrap_err();
        assert!(matches!(err, TaskError::ToggleInvalid(t) if t == "pause"));
        assert!(reg.runner.verbs().is_empty());
    }

    #[test]
    fn edit_failure_never_exposes_password() {
        let output = ToolOutput {
            exit_code: Some(1),
            stderr: "ERROR: The user name or password is incorrect.".to_owned(),
            ..Default::default()
        };
        let reg = registry(StubRunner::new(EXISTING, output));
        let creds = Credentials {
            user: "svc".to_owned(),
            password: "s3cret!".to_owned(),
        };
        let err = reg
            .edit("Folder\\MyTask", "Disable", Some("C:\\run.exe"), Some(&creds))
            .unwrap_err();
        assert!(!err.to_string().contains("s3cret!"));
        assert!(!format!("{err:?}").contains("s3cret!"));
        let calls = reg.runner.calls.lock().unwrap();
        assert!(calls[1].contains(&"/DISABLE".to_owned()));
        assert!(calls[1].contains(&"s3cret!".to_owned()));
    }

    #[test]
    fn blank_leaf_is_invalid_path() {
        let reg = registry(StubRunner::new(EXISTING, ok("")));
        assert!(matches!(reg.exists("Folder\\"), Err(TaskError::InvalidPath(_))));
        assert!(matches!(reg.run(""), Err(TaskError::InvalidPath(_))));
    }

    #[test]
    fn wildcard_exists_tracks_folder_contents() {
        let reg = registry(StubRunner::new(EXISTING, ok("")));
        assert!(reg.task_exists("Folder", "*").unwrap());
        assert!(reg.folder_exists("Folder").unwrap());

        let empty = registry(StubRunner::new("", ok("")));
        assert!(!empty.task_exists("Folder", "*").unwrap());
        assert!(!empty.folder_exists("Folder").unwrap());
    }
}
