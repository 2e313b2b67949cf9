//! Synchronous process execution for the scheduler tool.
//!
//! Every call launches the program directly (never through a shell), captures
//! stdout and stderr, and blocks until the process exits or the invocation's
//! timeout expires. On timeout the child is killed and reaped.

use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crate::error::{Result, TaskError};

/// Interval between `try_wait` polls while a child is running.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long to keep collecting output after the child exits or is killed.
///
/// Descendants that inherited the pipes can hold them open indefinitely;
/// whatever arrives before this grace period ends is kept.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Read buffer size for the pipe reader threads.
const READ_CHUNK: usize = 8 * 1024;

/// Placeholder printed in place of sensitive arguments.
const REDACTED: &str = "********";

/// A single program invocation: program, argv, timeout.
#[derive(Clone)]
pub struct ToolInvocation {
    /// Program to launch.
    pub program: PathBuf,
    /// Arguments passed verbatim to the program.
    pub args: Vec<String>,
    /// Maximum wall-clock time before the child is killed.
    pub timeout: Duration,
    /// Indexes into `args` that must never be logged or displayed.
    sensitive: Vec<usize>,
}

impl ToolInvocation {
    /// Create an invocation with no arguments.
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout,
            sensitive: Vec::new(),
        }
    }

    /// Append a plain argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append an argument that is redacted from logs and `Display` output.
    pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
        self.sensitive.push(self.args.len());
        self.args.push(arg.into());
        self
    }

    /// Arguments with sensitive values replaced by a placeholder.
    pub fn redacted_args(&self) -> Vec<&str> {
        self.args
            .iter()
            .enumerate()
            .map(|(i, a)| {
                if self.sensitive.contains(&i) {
                    REDACTED
                } else {
                    a.as_str()
                }
            })
            .collect()
    }
}

impl fmt::Debug for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolInvocation")
            .field("program", &self.program)
            .field("args", &self.redacted_args())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in self.redacted_args() {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of a finished (or killed) process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; `None` when the process was killed or ended by a signal.
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Whether the process was killed because it exceeded its timeout.
    pub timed_out: bool,
}

impl ToolOutput {
    /// Returns `true` if the process exited normally with code 0.
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Stdout followed by stderr, when stderr is non-empty.
    pub fn combined(&self) -> String {
        if self.stderr.trim().is_empty() {
            self.stdout.clone()
        } else if self.stdout.trim().is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n--- stderr ---\n{}", self.stdout, self.stderr)
        }
    }
}

/// Runs external programs on behalf of the scheduler components.
///
/// Implementations must not involve a shell. The production implementation
/// is [`SystemRunner`]; tests substitute scripted runners.
pub trait CommandRunner: Send + Sync {
    /// Run the invocation to completion and capture its output.
    ///
    /// A process that runs but fails or times out is reported through
    /// [`ToolOutput`]; only failure to launch it at all is an `Err`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::ExternalToolFailure`] if the program cannot be spawned.
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput> {
        (**self).run(invocation)
    }
}

/// [`CommandRunner`] backed by `std::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    /// Create a new system runner.
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput> {
        let program = invocation.program.display().to_string();
        tracing::debug!(
            program = %program,
            args = ?invocation.redacted_args(),
            timeout_secs = invocation.timeout.as_secs(),
            "spawning scheduler tool"
        );

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                TaskError::tool_failure("spawn", format!("failed to spawn {program}: {e}"))
            })?;

        // Drain both pipes concurrently so a chatty child cannot block on a
        // full pipe while we poll for exit.
        let stdout_reader = child.stdout.take().map(spawn_reader);
        let stderr_reader = child.stderr.take().map(spawn_reader);

        let start = Instant::now();
        let (exit_code, timed_out) = loop {
            match child.try_wait() {
                Ok(Some(status)) => break (status.code(), false),
                Ok(None) => {
                    if start.elapsed() > invocation.timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        tracing::warn!(
                            program = %program,
                            timeout_secs = invocation.timeout.as_secs(),
                            "scheduler tool timed out; process killed"
                        );
                        break (None, true);
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(TaskError::tool_failure(
                        "wait",
                        format!("failed to check {program} status: {e}"),
                    ));
                }
            }
        };

        // The pipes stay open as long as any descendant holds them, so output
        // collection is bounded by the invocation timeout plus a short grace.
        let deadline = (start + invocation.timeout).max(Instant::now()) + DRAIN_GRACE;
        let output = ToolOutput {
            exit_code,
            stdout: collect_output(stdout_reader, deadline),
            stderr: collect_output(stderr_reader, deadline),
            timed_out,
        };

        tracing::debug!(program = %program, exit_code = ?exit_code, "scheduler tool finished");
        Ok(output)
    }
}

/// Forward everything read from `stream` to a channel, chunk by chunk.
///
/// The channel disconnects once the stream reaches EOF or fails.
fn spawn_reader<S: Read + Send + 'static>(mut stream: S) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "failed to read scheduler tool output; output may be truncated"
                    );
                    break;
                }
            }
        }
    });
    rx
}

/// Gather the chunks a reader produced before `deadline`.
fn collect_output(reader: Option<Receiver<Vec<u8>>>, deadline: Instant) -> String {
    let Some(rx) = reader else {
        return String::new();
    };
    let mut bytes = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(chunk) => bytes.extend_from_slice(&chunk),
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    "scheduler tool output still open after exit; keeping partial output"
                );
                break;
            }
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}
