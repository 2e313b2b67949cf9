//! CLI binary for schedctl.
//!
//! Reports and JSON go to stdout; tracing output goes to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use schedctl::scheduler::{
    ActionOutcome, Credentials, MatchResult, ReportFormatter, TaskRecord, filter_by_name,
};
use schedctl::{SchedctlConfig, SystemRunner, TaskError, TaskRegistry};
use tracing_subscriber::EnvFilter;

/// schedctl: manage OS scheduled tasks through the system scheduler tool.
#[derive(Parser)]
#[command(name = "schedctl", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print task lists as JSON instead of a table.
    #[arg(long, global = true)]
    json: bool,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// List tasks in a folder (root when omitted).
    List {
        /// Task folder, e.g. `Microsoft\Windows\Defrag`.
        folder: Option<String>,
        /// Show only the first task whose name contains this text (`*` for all).
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Create a task unless one already exists at the path.
    Create {
        /// Schedule kind (MINUTE, HOURLY, DAILY, WEEKLY, MONTHLY, ONCE, ...).
        #[arg(short, long)]
        schedule: String,
        /// Interval modifier for the schedule kind.
        #[arg(short, long, default_value = "1")]
        modifier: String,
        /// Full task path, e.g. `Folder\MyTask`.
        #[arg(short, long)]
        path: String,
        /// Command line the task runs.
        #[arg(long = "command")]
        run: String,
    },

    /// Start an existing task now.
    Run {
        /// Full task path.
        path: String,
    },

    /// Delete an existing task without confirmation.
    Delete {
        /// Full task path.
        path: String,
    },

    /// Enable or disable a task, optionally changing its command and account.
    Edit {
        /// Full task path.
        path: String,
        /// `enable` or `disable`.
        #[arg(short, long)]
        toggle: String,
        /// New command line for the task.
        #[arg(long = "command")]
        run: Option<String>,
        /// Run-as account.
        #[arg(long, requires = "password")]
        user: Option<String>,
        /// Run-as password.
        #[arg(long, requires = "user")]
        password: Option<String>,
    },

    /// Exit 0 if a task exists at the path, 1 otherwise.
    Exists {
        /// Full task path.
        path: String,
    },

    /// Print the recognised schedule kinds.
    Schedules,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "schedctl=debug"
    } else {
        "schedctl=info"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let config = match cli.config {
        Some(ref path) => SchedctlConfig::from_file(path)?,
        None => SchedctlConfig::load_or_default()?,
    };
    let report = ReportFormatter::new(config.report.clone());
    let registry = TaskRegistry::new(&config, SystemRunner::new())?;

    let result = match cli.command {
        Command::List { folder, name } => {
            let tasks = registry.list(folder.as_deref().unwrap_or_default())?;
            return print_tasks(&tasks, name.as_deref(), cli.json, &report);
        }
        Command::Create {
            schedule,
            modifier,
            path,
            run,
        } => registry.create(&schedule, &modifier, &path, &run),
        Command::Run { path } => registry.run(&path),
        Command::Delete { path } => registry.delete(&path),
        Command::Edit {
            path,
            toggle,
            run,
            user,
            password,
        } => {
            let credentials = match (user, password) {
                (Some(user), Some(password)) => Some(Credentials { user, password }),
                _ => None,
            };
            registry.edit(&path, &toggle, run.as_deref(), credentials.as_ref())
        }
        Command::Exists { path } => {
            let exists = registry.exists(&path)?;
            println!("{}", if exists { "exists" } else { "not found" });
            return Ok(exit_code(exists));
        }
        Command::Schedules => {
            for def in registry.catalog().iter() {
                println!("{def}");
            }
            return Ok(ExitCode::SUCCESS);
        }
    };

    print_outcome(result)
}

fn print_tasks(
    tasks: &[TaskRecord],
    name: Option<&str>,
    json: bool,
    report: &ReportFormatter,
) -> anyhow::Result<ExitCode> {
    let selected: &[TaskRecord] = match name.map(|n| filter_by_name(tasks, n)) {
        None => tasks,
        Some(MatchResult::All(all)) => all,
        Some(MatchResult::Single(task)) => std::slice::from_ref(task),
        Some(MatchResult::NotFound(name)) => {
            eprintln!("{}", MatchResult::not_found_message(&name));
            return Ok(ExitCode::FAILURE);
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(selected)?);
    } else {
        print!("{}", report.format(selected));
    }
    Ok(ExitCode::SUCCESS)
}

fn print_outcome(result: schedctl::Result<ActionOutcome>) -> anyhow::Result<ExitCode> {
    match result {
        Ok(outcome) => {
            println!("{}", outcome.message());
            Ok(ExitCode::SUCCESS)
        }
        Err(err @ TaskError::ExternalToolFailure { .. }) => {
            eprintln!("{err}");
            if let Some(output) = err.tool_output() {
                let text = output.combined();
                if !text.trim().is_empty() {
                    eprintln!("{}", text.trim_end());
                }
            }
            Ok(ExitCode::FAILURE)
        }
        Err(err) => {
            eprintln!("{err}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
