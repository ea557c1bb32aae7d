//! External command execution.
//!
//! The decompiler is an opaque external program. Running it through the
//! [`CommandExecutor`] trait keeps the pipeline testable without a real
//! apktool installation.

use std::io;
use std::process::{Command, Output};

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs a command with arguments, blocking until it exits, and returns
    /// the captured output.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while spawning or waiting on the command.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use apk_deep_extractor::command::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor;
    /// let output = executor.run("apktool", &["--version"])?;
    /// assert!(output.status.success());
    /// # Ok::<(), std::io::Error>(())
    /// ```
    fn run(&self, cmd: &str, args: &[&str]) -> io::Result<Output>;
}

impl<T: CommandExecutor + ?Sized> CommandExecutor for &T {
    fn run(&self, cmd: &str, args: &[&str]) -> io::Result<Output> {
        (**self).run(cmd, args)
    }
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> io::Result<Output> {
        Command::new(cmd).args(args).output()
    }
}

/// Describes how a process ended, for error messages.
#[must_use]
pub fn describe_status(output: &Output) -> String {
    match output.status.code() {
        Some(code) => format!("exit code {code}"),
        None => "termination by signal".to_owned(),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn system_executor_captures_exit_status() {
        let output = SystemCommandExecutor
            .run("sh", &["-c", "echo oops >&2; exit 3"])
            .expect("sh should be available");
        assert_eq!(describe_status(&output), "exit code 3");
        assert_eq!(String::from_utf8_lossy(&output.stderr).trim(), "oops");
    }

    #[test]
    fn system_executor_reports_missing_program() {
        let err = SystemCommandExecutor
            .run("/nonexistent/apktool", &[])
            .expect_err("spawn should fail");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
