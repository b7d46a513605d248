use std::process::{Command, Stdio};

use tracing::{info, warn};

use crate::error::{DeployError, DeployResult};

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl Output {
    /// A successful output with the given stdout.
    #[must_use]
    pub fn ok(stdout: &str) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    /// A failed output with the given exit code and stderr.
    #[must_use]
    pub fn failed(code: i32, stderr: &str) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Trimmed stdout.
    #[must_use]
    pub fn text(&self) -> &str {
        self.stdout.trim()
    }
}

/// Executes external programs.
///
/// Every collaborator (`git`, `ssh`, `rsync`, `curl`, ...) is reached
/// through this trait so whole deployments can run against a
/// recording fake.
pub trait Runner {
    /// Run `program` to completion and capture its output. Only a
    /// failure to spawn is an error; a non-zero exit is reported in
    /// the returned [`Output`].
    fn run(&self, program: &str, args: &[&str]) -> DeployResult<Output>;
}

/// Runs programs on the local machine via [`std::process`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl Runner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> DeployResult<Output> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| spawn_error(program, e))?;

        Ok(Output {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Run a command, log its output, and fail on a non-zero exit.
/// Returns trimmed stdout.
pub fn run(runner: &dyn Runner, program: &str, args: &[&str]) -> DeployResult<String> {
    let output = runner.run(program, args)?;
    log_output(&output);
    into_stdout(output, || format_command(program, args))
}

/// Convert an [`Output`] into its trimmed stdout, or a
/// [`DeployError::CommandFailed`] carrying the stderr.
pub fn into_stdout(output: Output, command: impl FnOnce() -> String) -> DeployResult<String> {
    if output.success() {
        Ok(output.text().to_string())
    } else {
        Err(DeployError::CommandFailed {
            command: command(),
            code: output.code,
            stderr: output.stderr.trim().to_string(),
        })
    }
}

/// Append every stdout line at INFO. Stderr lines go to INFO when
/// the command succeeded (docker and git report progress there) and
/// to WARN otherwise.
pub fn log_output(output: &Output) {
    for line in output.stdout.lines().filter(|l| !l.trim().is_empty()) {
        info!("  | {line}");
    }
    for line in output.stderr.lines().filter(|l| !l.trim().is_empty()) {
        if output.success() {
            info!("  ! {line}");
        } else {
            warn!("  ! {line}");
        }
    }
}

/// Run a command with stdin/stdout/stderr inherited (interactive).
pub fn run_interactive(program: &str, args: &[&str]) -> DeployResult<()> {
    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| spawn_error(program, e))?;

    if status.success() {
        Ok(())
    } else {
        Err(DeployError::CommandFailed {
            command: format_command(program, args),
            code: status.code(),
            stderr: String::new(),
        })
    }
}

/// Check if a command exists on PATH.
#[must_use]
pub fn command_exists(runner: &dyn Runner, program: &str) -> bool {
    runner
        .run("sh", &["-c", &format!("command -v {program}")])
        .is_ok_and(|o| o.success())
}

#[must_use]
pub fn format_command(program: &str, args: &[&str]) -> String {
    let mut parts = vec![program.to_string()];
    parts.extend(args.iter().map(|a| (*a).to_string()));
    parts.join(" ")
}

fn spawn_error(program: &str, e: std::io::Error) -> DeployError {
    if e.kind() == std::io::ErrorKind::NotFound {
        DeployError::CommandNotFound(program.to_string())
    } else {
        DeployError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_joins_args() {
        assert_eq!(format_command("docker", &["ps", "-a"]), "docker ps -a");
    }

    #[test]
    fn into_stdout_trims_success() {
        let out = into_stdout(Output::ok("  hello\n"), String::new).unwrap();
        assert_eq!(out, "hello");
    }

    #[test]
    fn into_stdout_keeps_stderr_on_failure() {
        let err = into_stdout(Output::failed(3, "boom\n"), || "x y".into()).unwrap_err();

        match err {
            DeployError::CommandFailed {
                command,
                code,
                stderr,
            } => {
                assert_eq!(command, "x y");
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn signal_is_not_success() {
        let out = Output {
            code: None,
            ..Output::default()
        };
        assert!(!out.success());
    }

    #[test]
    fn system_runner_reports_missing_program() {
        let err = SystemRunner
            .run("hoist-definitely-not-a-program", &[])
            .unwrap_err();
        assert!(matches!(err, DeployError::CommandNotFound(_)));
    }
}
