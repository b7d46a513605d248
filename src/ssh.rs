use std::path::Path;

use tracing::info;

use crate::cmd::{self, Output, Runner};
use crate::error::{DeployError, DeployResult};

/// Seconds `ssh` waits for the TCP connection before giving up.
pub const CONNECT_TIMEOUT_SECS: u32 = 10;

/// SSH session wrapper for executing commands and transferring
/// files to a remote host.
///
/// No connection is kept open: every call spawns its own `ssh`,
/// `scp` or `rsync` process through the [`Runner`].
pub struct SshSession<'a> {
    runner: &'a dyn Runner,
    host: String,
    user: String,
    key: Option<String>,
}

impl<'a> SshSession<'a> {
    #[must_use]
    pub fn new(runner: &'a dyn Runner, host: &str, user: &str) -> Self {
        Self {
            runner,
            host: host.to_string(),
            user: user.to_string(),
            key: None,
        }
    }

    #[must_use]
    pub fn with_key(mut self, key_path: &Path) -> Self {
        self.key = Some(key_path.to_string_lossy().into_owned());
        self
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Prefix for commands that need root on the remote host.
    #[must_use]
    pub fn sudo(&self) -> &'static str {
        if self.user == "root" { "" } else { "sudo " }
    }

    /// Execute a command on the remote host, log its output, and
    /// fail on a non-zero exit.
    pub fn exec(&self, command: &str) -> DeployResult<String> {
        let output = self.exec_output(command)?;
        cmd::into_stdout(output, || format!("ssh {}: {command}", self.destination()))
    }

    /// Execute a command on the remote host and return its output
    /// whatever the exit status.
    pub fn exec_output(&self, command: &str) -> DeployResult<Output> {
        info!("[{}] $ {command}", self.host);
        let args = self.build_ssh_args(command);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self.runner.run("ssh", &refs)?;
        cmd::log_output(&output);
        Ok(output)
    }

    /// Check that the host accepts our key within the connect
    /// timeout.
    pub fn probe(&self) -> DeployResult<()> {
        self.exec("true").map(|_| ()).map_err(|e| {
            DeployError::SshFailed(format!("{}: {}", self.destination(), e.detail()))
        })
    }

    /// Copy a local file to the remote host.
    pub fn scp_to(&self, local_path: &Path, remote_path: &str) -> DeployResult<()> {
        let mut args = self.option_args();
        args.push(local_path.to_string_lossy().into_owned());
        args.push(format!("{}:{remote_path}", self.destination()));

        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        cmd::run(self.runner, "scp", &refs).map(|_| ())
    }

    /// Mirror a local directory into a remote directory, skipping
    /// paths that match `excludes`.
    pub fn rsync_to(
        &self,
        local_dir: &Path,
        remote_dir: &str,
        excludes: &[&str],
    ) -> DeployResult<()> {
        let mut args = vec!["-az".to_string(), "--delete".to_string()];
        for pattern in excludes {
            args.push(format!("--exclude={pattern}"));
        }
        args.push("-e".to_string());
        args.push(self.rsync_shell());
        args.push(format!("{}/", local_dir.to_string_lossy().trim_end_matches('/')));
        args.push(format!(
            "{}:{}/",
            self.destination(),
            remote_dir.trim_end_matches('/')
        ));

        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        cmd::run(self.runner, "rsync", &refs).map(|_| ())
    }

    #[must_use]
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    fn build_ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = self.option_args();
        args.push(self.destination());
        args.push(command.to_string());
        args
    }

    fn option_args(&self) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={CONNECT_TIMEOUT_SECS}"),
        ];
        if let Some(key) = &self.key {
            args.push("-i".to_string());
            args.push(key.clone());
        }
        args
    }

    fn rsync_shell(&self) -> String {
        let mut shell = format!(
            "ssh -o StrictHostKeyChecking=accept-new -o BatchMode=yes \
             -o ConnectTimeout={CONNECT_TIMEOUT_SECS}"
        );
        if let Some(key) = &self.key {
            shell.push_str(" -i ");
            shell.push_str(&quote_rsync_word(key));
        }
        shell
    }
}

/// Quote one word of an `rsync -e` command line. rsync splits that
/// string on whitespace and honors single and double quotes, with
/// backslash escapes inside double quotes only.
fn quote_rsync_word(word: &str) -> String {
    if word.contains('\'') {
        let escaped = word.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\"")
    } else {
        format!("'{word}'")
    }
}
