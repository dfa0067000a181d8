//! Synchronous subprocess invocation with captured output.
//!
//! External tools are spawned from argument lists and waited on; the exit
//! status and captured stdout/stderr are the only feedback. The runner is
//! injectable so tests can fake tool invocations and count them.

use std::fmt;
use std::io;
use std::process::Command;
use std::sync::Arc;

use tracing::debug;

use crate::error::PluginError;

/// A program and its argument list. Never passed through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Outcome of one synchronous invocation.
#[derive(Debug, Clone)]
pub struct CommandReport {
    pub command: String,
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Spawns a [`CommandSpec`] and reports the outcome.
pub type CommandRunner = Arc<dyn Fn(&CommandSpec) -> io::Result<CommandReport> + Send + Sync>;

/// The real runner: spawn, wait, capture.
#[must_use]
pub fn system_runner() -> CommandRunner {
    Arc::new(|spec: &CommandSpec| {
        debug!(command = %spec, "running external command");
        let output = Command::new(&spec.program).args(&spec.args).output()?;
        Ok(CommandReport {
            command: spec.to_string(),
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    })
}

/// Run `spec` and error on failure, carrying the tool's output in the
/// message. `tool` labels the failing program in errors and logs.
pub fn run_checked(
    runner: &CommandRunner,
    spec: &CommandSpec,
    tool: &str,
) -> Result<CommandReport, PluginError> {
    let report = runner(spec).map_err(PluginError::Io)?;
    if report.success {
        return Ok(report);
    }
    let detail = if !report.stderr.trim().is_empty() {
        report.stderr.trim().to_string()
    } else if !report.stdout.trim().is_empty() {
        report.stdout.trim().to_string()
    } else {
        match report.exit_code {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        }
    };
    Err(PluginError::Tool {
        tool: tool.to_string(),
        message: detail,
    })
}

/// A runner that always succeeds with empty output, recording nothing.
/// Handy for tests that only care that an invocation happened.
#[cfg(test)]
pub(crate) fn ok_runner() -> CommandRunner {
    Arc::new(|spec: &CommandSpec| {
        Ok(CommandReport {
            command: spec.to_string(),
            success: true,
            exit_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        })
    })
}
