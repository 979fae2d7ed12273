//! External process execution
//!
//! Wraps one external tool invocation: argument list, working directory,
//! redirected output, and asynchronous typed completion. The fully
//! assembled command line is written as the first line of the log
//! destination before launch, to aid debugging.

use chrono::Local;
use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::errors::Result;
use crate::models::RunOutcome;

/// Where the child's output goes
#[derive(Debug, Clone)]
pub enum OutputDestination {
    /// stdout and stderr redirected to a log file; the file is created
    /// (truncated) with the command line as its first line
    LogFile(PathBuf),
    /// Like `LogFile`, but appends to an existing log; used for the
    /// second phase of a multi-phase flow sharing one log
    LogFileAppend(PathBuf),
    /// stdin/stdout piped back to the caller, stderr joined to stdout's
    /// terminal; used for interactive pass-through sessions
    Piped,
    /// Child inherits the parent's stdio
    Inherit,
}

/// One planned external tool invocation
#[derive(Debug, Clone)]
pub struct ProcessPlan {
    pub executable: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub output: OutputDestination,
}

impl ProcessPlan {
    /// The command line as a single display string, exactly what the log
    /// file records before execution.
    pub fn command_line(&self) -> String {
        let mut line = self.executable.display().to_string();
        for arg in &self.args {
            line.push(' ');
            if arg.contains(' ') {
                line.push('\'');
                line.push_str(arg);
                line.push('\'');
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

/// Handle to one launched external process
pub struct RunningProcess {
    child: Child,
    command_line: String,
    log_path: Option<PathBuf>,
}

/// Launches external executables and reports completion without blocking.
pub struct ProcessRunner;

impl ProcessRunner {
    /// Start the planned process immediately and return its handle.
    ///
    /// The exit status becomes available by awaiting
    /// [`RunningProcess::wait`]; nothing blocks the caller here.
    pub fn spawn(plan: &ProcessPlan) -> Result<RunningProcess> {
        let mut cmd = Command::new(&plan.executable);
        cmd.args(&plan.args).current_dir(&plan.working_dir);

        let command_line = plan.command_line();
        let mut log_path = None;

        match &plan.output {
            OutputDestination::LogFile(path) | OutputDestination::LogFileAppend(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let mut log = match &plan.output {
                    OutputDestination::LogFileAppend(_) => std::fs::OpenOptions::new()
                        .create(true)
                        .append(true)
                        .open(path)?,
                    _ => std::fs::File::create(path)?,
                };
                writeln!(log, "{}", command_line)?;
                writeln!(log, "# started {}", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
                log.flush()?;

                let err = log.try_clone()?;
                cmd.stdin(Stdio::null())
                    .stdout(Stdio::from(log))
                    .stderr(Stdio::from(err));
                log_path = Some(path.clone());
            }
            OutputDestination::Piped => {
                cmd.stdin(Stdio::piped())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::inherit());
            }
            OutputDestination::Inherit => {
                cmd.stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit());
            }
        }

        log::debug!("Launching: {}", command_line);
        let child = cmd.spawn()?;

        Ok(RunningProcess {
            child,
            command_line,
            log_path,
        })
    }
}

impl RunningProcess {
    /// The command line this process was launched with
    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    /// Log file receiving the process output, if any
    pub fn log_path(&self) -> Option<&std::path::Path> {
        self.log_path.as_deref()
    }

    /// Take the child's stdin pipe (Piped destination only)
    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.child.stdin.take()
    }

    /// Take the child's stdout pipe (Piped destination only)
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Await process termination and map the exit status to a typed
    /// outcome. Exit status zero is the only success.
    pub async fn wait(&mut self) -> Result<RunOutcome> {
        let status = self.child.wait().await?;
        if status.success() {
            Ok(RunOutcome::Success)
        } else {
            let code = status.code().unwrap_or(-1);
            log::warn!("Tool exited with status {}: {}", code, self.command_line);
            Ok(RunOutcome::ToolFailed(code))
        }
    }

    /// Terminate the process and wait for it to exit.
    ///
    /// Used on document teardown so a running child is never leaked past
    /// the in-memory state that owns it.
    pub async fn stop(&mut self) -> Result<()> {
        if let Err(e) = self.child.start_kill() {
            // Already exited is fine; anything else is still followed by
            // the wait below
            log::debug!("start_kill: {}", e);
        }
        self.child.wait().await?;
        Ok(())
    }
}
