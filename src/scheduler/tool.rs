//! Argument builders for the external scheduler tool (`schtasks`).
//!
//! Each builder returns a ready [`ToolInvocation`]. Arguments are passed as
//! an argv vector, so paths and commands containing spaces need no quoting
//! here; the OS process layer quotes them for the target program.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::ToolConfig;
use crate::process::ToolInvocation;
use crate::scheduler::path::{ROOT, SEPARATOR};

/// Enable/disable switch for an existing task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    /// Re-enable a disabled task.
    Enable,
    /// Disable the task without deleting it.
    Disable,
}

impl Toggle {
    /// Parse `"enable"` / `"disable"`, ignoring case and surrounding whitespace.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("enable") {
            Some(Self::Enable)
        } else if value.eq_ignore_ascii_case("disable") {
            Some(Self::Disable)
        } else {
            None
        }
    }

    fn flag(self) -> &'static str {
        match self {
            Self::Enable => "/ENABLE",
            Self::Disable => "/DISABLE",
        }
    }
}

/// Run-as account for a task change.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account name.
    pub user: String,
    /// Account password. Never logged.
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"********")
            .finish()
    }
}

/// Builds invocations of the scheduler tool from a [`ToolConfig`].
#[derive(Debug, Clone)]
pub struct SchedulerTool {
    program: PathBuf,
    timeout: Duration,
}

impl SchedulerTool {
    /// Resolve the configured program once.
    pub fn from_config(config: &ToolConfig) -> Self {
        Self {
            program: config.resolve_program(),
            timeout: config.timeout(),
        }
    }

    /// Use an explicit program path and timeout.
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn invocation(&self) -> ToolInvocation {
        ToolInvocation::new(self.program.clone(), self.timeout)
    }

    /// `/query /nh /fo csv /tn <folder>\`
    pub fn query(&self, folder: &str) -> ToolInvocation {
        self.invocation()
            .arg("/query")
            .arg("/nh")
            .arg("/fo")
            .arg("csv")
            .arg("/tn")
            .arg(query_folder(folder))
    }

    /// `/create /sc <kind> /mo <modifier> /tn <path> /tr <command>`
    pub fn create(&self, kind: &str, modifier: i64, full_path: &str, run: &str) -> ToolInvocation {
        self.invocation()
            .arg("/create")
            .arg("/sc")
            .arg(kind)
            .arg("/mo")
            .arg(modifier.to_string())
            .arg("/tn")
            .arg(full_path)
            .arg("/tr")
            .arg(run)
    }

    /// `/run /tn <path>`
    pub fn run(&self, full_path: &str) -> ToolInvocation {
        self.invocation().arg("/run").arg("/tn").arg(full_path)
    }

    /// `/delete /tn <path> /f`
    pub fn delete(&self, full_path: &str) -> ToolInvocation {
        self.invocation()
            .arg("/delete")
            .arg("/tn")
            .arg(full_path)
            .arg("/f")
    }

    /// `/change /tn <path> [/tr <command>] /ENABLE|/DISABLE [/ru <user> /rp <password>]`
    pub fn change(
        &self,
        full_path: &str,
        toggle: Toggle,
        run: Option<&str>,
        credentials: Option<&Credentials>,
    ) -> ToolInvocation {
        let mut inv = self.invocation().arg("/change").arg("/tn").arg(full_path);
        if let Some(run) = run {
            inv = inv.arg("/tr").arg(run);
        }
        inv = inv.arg(toggle.flag());
        if let Some(creds) = credentials {
            inv = inv
                .arg("/ru")
                .arg(creds.user.as_str())
                .arg("/rp")
                .secret_arg(creds.password.as_str());
        }
        inv
    }
}

/// Folder argument for a query: blank means root, otherwise trailing separator.
pub fn query_folder(folder: &str) -> String {
    let folder = folder.trim();
    if folder.is_empty() {
        ROOT.to_owned()
    } else if folder.ends_with(SEPARATOR) {
        folder.to_owned()
    } else {
        format!("{folder}{SEPARATOR}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> SchedulerTool {
        SchedulerTool::new("schtasks.exe", Duration::from_secs(30))
    }

    #[test]
    fn query_blank_folder_targets_root() {
        assert_eq!(query_folder(""), "\\");
        assert_eq!(query_folder("   "), "\\");
        assert_eq!(query_folder("\\"), "\\");
        assert_eq!(query_folder(" Folder "), "Folder\\");
        assert_eq!(query_folder("A\\B\\"), "A\\B\\");
    }

    #[test]
    fn query_requests_headerless_csv() {
        let inv = tool().query("Folder");
        assert_eq!(inv.args, ["/query", "/nh", "/fo", "csv", "/tn", "Folder\\"]);
    }

    #[test]
    fn create_arguments() {
        let inv = tool().create("DAILY", 1, "Folder\\My Task", "C:\\run me.exe");
        assert_eq!(
            inv.args,
            [
                "/create",
                "/sc",
                "DAILY",
                "/mo",
                "1",
                "/tn",
                "Folder\\My Task",
                "/tr",
                "C:\\run me.exe"
            ]
        );
    }

    #[test]
    fn delete_is_forced() {
        let inv = tool().delete("Folder\\Task");
        assert_eq!(inv.args, ["/delete", "/tn", "Folder\\Task", "/f"]);
    }

    #[test]
    fn change_with_credentials_redacts_password() {
        let creds = Credentials {
            user: "svc".to_owned(),
            password: "p@ss".to_owned(),
        };
        let inv = tool().change("Folder\\Task", Toggle::Disable, Some("C:\\x.exe"), Some(&creds));
        assert_eq!(
            inv.args,
            [
                "/change",
                "/tn",
                "Folder\\Task",
                "/tr",
                "C:\\x.exe",
                "/DISABLE",
                "/ru",
                "svc",
                "/rp",
                "p@ss"
            ]
        );
        assert!(!inv.to_string().contains("p@ss"));
        assert!(!format!("{creds:?}").contains("p@ss"));
    }

    #[test]
    fn change_without_optional_parts() {
        let inv = tool().change("Task", Toggle::Enable, None, None);
        assert_eq!(inv.args, ["/change", "/tn", "Task", "/ENABLE"]);
    }

    #[test]
    fn toggle_parse() {
        assert_eq!(Toggle::parse("ENABLE"), Some(Toggle::Enable));
        assert_eq!(Toggle::parse(" disable "), Some(Toggle::Disable));
        assert_eq!(Toggle::parse("off"), None);
        assert_eq!(Toggle::parse(""), None);
    }
}
