//! External process execution.
//!
//! Every tool the pipelines drive (compiler, test runner, npm, git) is invoked
//! through [`CommandRunner`], so tests can substitute a recording double.

use crate::error::{CliError, Result};
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};

/// A fully described process invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    /// Program name or path
    pub program: String,
    /// Arguments, in order
    pub args: Vec<String>,
    /// Working directory
    pub cwd: PathBuf,
}

impl ExternalCommand {
    /// Start a command for `program` running in `cwd`
    pub fn new(program: impl Into<String>, cwd: &Path) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.to_path_buf(),
        }
    }

    /// Build from a configured `[program, args...]` list
    pub fn from_parts(parts: &[String], cwd: &Path) -> Result<Self> {
        let (program, rest) = parts.split_first().ok_or_else(|| CliError::InvalidArguments {
            reason: "empty command".to_string(),
        })?;
        Ok(Self::new(program.clone(), cwd).args(rest.iter().cloned()))
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Whether the argument list contains `needle`
    pub fn has_arg(&self, needle: &str) -> bool {
        self.args.iter().any(|a| a == needle)
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (`None` when killed by a signal)
    pub code: Option<i32>,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

impl CommandOutput {
    /// A zero-exit output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed output with the given exit code and stderr
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Zero exit status
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// stdout and stderr joined, for diagnostics
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr.trim_end()),
            (false, true) => self.stdout.trim_end().to_string(),
            (true, false) => self.stderr.trim_end().to_string(),
            (true, true) => match self.code {
                Some(code) => format!("exited with status {}", code),
                None => "terminated by signal".to_string(),
            },
        }
    }
}

/// Runs external commands
pub trait CommandRunner {
    /// Run to completion and capture output. A non-zero exit is not an error
    /// at this level; only failing to start the process is.
    fn run(&self, command: &ExternalCommand) -> impl Future<Output = Result<CommandOutput>>;
}

/// Runs commands as real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    async fn run(&self, command: &ExternalCommand) -> Result<CommandOutput> {
        let program = which::which_in(
            &command.program,
            std::env::var_os("PATH"),
            &command.cwd,
        )
        .map_err(|e| CliError::ProgramNotFound {
            program: command.program.clone(),
            reason: e.to_string(),
        })?;

        log::debug!("Running `{}` in {}", command, command.cwd.display());

        let output = tokio::process::Command::new(program)
            .args(&command.args)
            .current_dir(&command.cwd)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CliError::ExecutionFailed {
                command: command.to_string(),
                reason: e.to_string(),
            })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Run a command, echo its output to the log, and fail on a non-zero exit
/// with the output embedded verbatim in the error.
pub async fn run_checked<R: CommandRunner>(
    runner: &R,
    command: &ExternalCommand,
) -> Result<CommandOutput> {
    let output = runner.run(command).await?;
    if !output.success() {
        return Err(CliError::ExecutionFailed {
            command: command.to_string(),
            reason: output.combined(),
        }
        .into());
    }
    log_output(&output);
    Ok(output)
}

/// Echo captured output the way the tools printed it
pub fn log_output(output: &CommandOutput) {
    for line in output.stdout.lines().filter(|l| !l.trim().is_empty()) {
        log::info!("{}", line);
    }
    for line in output.stderr.lines().filter(|l| !l.trim().is_empty()) {
        log::warn!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_quotes_whitespace() {
        let cmd = ExternalCommand::new("git", Path::new("."))
            .arg("commit")
            .arg("-m")
            .arg("fix: the thing");
        assert_eq!(cmd.to_string(), "git commit -m \"fix: the thing\"");
    }

    #[test]
    fn test_from_parts() {
        let parts = vec!["npx".to_string(), "tsc".to_string()];
        let cmd = ExternalCommand::from_parts(&parts, Path::new("/p")).unwrap();
        assert_eq!(cmd.program, "npx");
        assert_eq!(cmd.args, vec!["tsc"]);
        assert!(ExternalCommand::from_parts(&[], Path::new("/p")).is_err());
    }

    #[test]
    fn test_combined_output() {
        let out = CommandOutput {
            code: Some(2),
            stdout: "src/a.ts(1,1): error TS1005\n".to_string(),
            stderr: String::new(),
        };
        assert_eq!(out.combined(), "src/a.ts(1,1): error TS1005");
        assert_eq!(CommandOutput::failed(3, "").combined(), "exited with status 3");
    }
}
