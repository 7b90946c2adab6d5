// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! External program invocation.
//!
//! Provisioning is mostly a matter of driving other programs: composer, npm,
//! wp-cli, mysql, mkcert, and apachectl. All of them are invoked through the
//! [`Syscall`] trait so that the workflow never talks to [`Command`] directly.

use std::{
    ffi::{OsStr, OsString},
    fmt::{Display, Formatter, Result as FmtResult},
    io::Write,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};
use tracing::{debug, instrument};

/// Description of a single external program invocation.
///
/// Environment variables are never part of the displayed command line, which
/// makes them the place to put secrets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Call {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    envs: Vec<(OsString, OsString)>,
    stdin: Option<String>,
}

impl Call {
    /// Construct new call to target program.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a listing of arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<OsString>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run inside target directory instead of the current one.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Set environment variable for the child only.
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Feed `input` to the child's standard input.
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Directory the call runs in, if not the current one.
    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Value of environment variable `key` set for the child.
    pub fn env_value(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        self.envs
            .iter()
            .rev()
            .find(|(k, _)| k.as_os_str() == key.as_ref())
            .map(|(_, v)| v.as_os_str())
    }

    /// Text fed to the child's standard input.
    pub fn input(&self) -> Option<&str> {
        self.stdin.as_deref()
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command.envs(self.envs.iter().map(|(k, v)| (k, v)));
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }

        command
    }
}

impl Display for Call {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(&self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(fmt, " {}", arg.to_string_lossy())?;
        }

        Ok(())
    }
}

/// Run external programs.
pub trait Syscall {
    /// Run call attached to the current terminal, blocking until it exits.
    fn interactive(&self, call: &Call) -> Result<()>;

    /// Run call with captured output, returning its standard output.
    fn non_interactive(&self, call: &Call) -> Result<String>;
}

/// Run external programs on the host system.
#[derive(Debug, Default, Clone, Copy)]
pub struct System;

impl Syscall for System {
    #[instrument(skip(self, call), level = "debug")]
    fn interactive(&self, call: &Call) -> Result<()> {
        debug!("run {call}");
        let status = call
            .command()
            .status()
            .map_err(|err| SyscallError::Spawn {
                source: err,
                call: call.to_string(),
            })?;

        if !status.success() {
            return Err(SyscallError::Failed {
                call: call.to_string(),
                code: status.code(),
                message: String::new(),
            });
        }

        Ok(())
    }

    #[instrument(skip(self, call), level = "debug")]
    fn non_interactive(&self, call: &Call) -> Result<String> {
        debug!("run {call}");
        let spawn_error = |err| SyscallError::Spawn {
            source: err,
            call: call.to_string(),
        };

        let mut command = call.command();
        command
            .stdin(if call.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let mut child = command.spawn().map_err(spawn_error)?;

        if let (Some(input), Some(mut pipe)) = (&call.stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes()).map_err(spawn_error)?;
        }

        let output = child.wait_with_output().map_err(spawn_error)?;
        let stdout = chomp(String::from_utf8_lossy(&output.stdout).into_owned());
        let stderr = chomp(String::from_utf8_lossy(&output.stderr).into_owned());

        if !output.status.success() {
            let message = if stderr.is_empty() { stdout } else { stderr };
            return Err(SyscallError::Failed {
                call: call.to_string(),
                code: output.status.code(),
                message,
            });
        }

        Ok(stdout)
    }
}

// INVARIANT: Chomp trailing newlines.
fn chomp(message: String) -> String {
    message
        .strip_suffix("\r\n")
        .or(message.strip_suffix('\n'))
        .map(ToString::to_string)
        .unwrap_or(message)
}

#[derive(Debug, thiserror::Error)]
pub enum SyscallError {
    /// Program could not be started or talked to.
    #[error("failed to run {call:?}")]
    Spawn {
        #[source]
        source: std::io::Error,
        call: String,
    },

    /// Program exited unsuccessfully.
    #[error("command {call:?} failed with exit code {}:\n{message}", code.map_or("none".into(), |c| c.to_string()))]
    Failed {
        call: String,
        code: Option<i32>,
        message: String,
    },
}

/// Friendly result alias :3
pub type Result<T, E = SyscallError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_hides_environment() {
        let call = Call::new("mysql")
            .arg("--user=alice")
            .args(["--execute", "SELECT 1"])
            .env("MYSQL_PWD", "secret");

        assert_eq!(call.to_string(), "mysql --user=alice --execute SELECT 1");
        assert_eq!(call.env_value("MYSQL_PWD"), Some(OsStr::new("secret")));
    }

    #[cfg(unix)]
    #[test]
    fn non_interactive_captures_stdout_and_stdin() -> anyhow::Result<()> {
        let result = System.non_interactive(&Call::new("echo").arg("hello"))?;
        assert_eq!(result, "hello");

        let result = System.non_interactive(&Call::new("cat").stdin("piped\n"))?;
        assert_eq!(result, "piped");

        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn non_interactive_reports_failure() {
        let result = System.non_interactive(&Call::new("sh").args(["-c", "echo oops >&2; exit 3"]));
        match result {
            Err(SyscallError::Failed { code, message, .. }) => {
                assert_eq!(code, Some(3));
                assert_eq!(message, "oops");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let result = System.non_interactive(&Call::new("definitely-not-a-real-program-xyz"));
        assert!(matches!(result, Err(SyscallError::Spawn { .. })));
    }
}
