//! Parameter resolution: command-line flags, then the environment
//! (non-interactive mode only), then terminal prompts (interactive
//! mode only).

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use tracing::{info, warn};

use crate::cmd;
use crate::error::{DeployError, DeployResult};
use crate::params::{DEFAULT_BRANCH, DeployTarget, Mode, Params, RepoUrl, RunId};
use crate::pipeline::Cli;

pub const ENV_REPO: &str = "DEPLOY_REPO";
pub const ENV_PAT: &str = "DEPLOY_PAT";
pub const ENV_BRANCH: &str = "DEPLOY_BRANCH";
pub const ENV_USER: &str = "DEPLOY_USER";
pub const ENV_HOST: &str = "DEPLOY_HOST";
pub const ENV_KEY: &str = "DEPLOY_KEY";
pub const ENV_PORT: &str = "DEPLOY_PORT";

/// Suggested in prompts only, never assumed silently.
pub const SUGGESTED_PORT: &str = "3000";
pub const SUGGESTED_USER: &str = "ubuntu";
pub const SUGGESTED_KEY: &str = "~/.ssh/id_rsa";

/// Source of interactive answers.
pub trait Prompter {
    /// Ask for a value. An empty answer yields `default` when given.
    fn ask(&mut self, question: &str, default: Option<&str>) -> DeployResult<String>;

    /// Ask a yes/no question; anything but yes is no.
    fn confirm(&mut self, question: &str) -> DeployResult<bool>;

    /// Ask for a value without echoing it.
    fn ask_secret(&mut self, question: &str) -> DeployResult<String>;
}

/// Prompts on stderr and reads answers from stdin.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    fn read_line() -> DeployResult<String> {
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

impl Prompter for TerminalPrompter {
    fn ask(&mut self, question: &str, default: Option<&str>) -> DeployResult<String> {
        match default {
            Some(d) => eprint!("{question} [{d}]: "),
            None => eprint!("{question}: "),
        }
        std::io::stderr().flush()?;

        let answer = Self::read_line()?;
        if answer.is_empty() {
            Ok(default.unwrap_or_default().to_string())
        } else {
            Ok(answer)
        }
    }

    fn confirm(&mut self, question: &str) -> DeployResult<bool> {
        eprint!("{question} [y/N]: ");
        std::io::stderr().flush()?;
        let answer = Self::read_line()?.to_ascii_lowercase();
        Ok(answer == "y" || answer == "yes")
    }

    fn ask_secret(&mut self, question: &str) -> DeployResult<String> {
        eprint!("{question}: ");
        std::io::stderr().flush()?;

        // Not fatal: without a tty the answer is simply echoed.
        let hidden = cmd::run_interactive("stty", &["-echo"]).is_ok();
        let answer = Self::read_line();
        if hidden {
            let _ = cmd::run_interactive("stty", &["echo"]);
        }
        eprintln!();
        answer
    }
}

struct Input<'a> {
    interactive: bool,
    env: &'a dyn Fn(&str) -> Option<String>,
    prompter: &'a mut dyn Prompter,
}

impl Input<'_> {
    /// First non-empty value among flag, environment and prompt.
    fn lookup(
        &mut self,
        flag: Option<&str>,
        env_key: &str,
        question: &str,
        default: Option<&str>,
    ) -> DeployResult<Option<String>> {
        if let Some(v) = non_empty(flag) {
            return Ok(Some(v));
        }
        if !self.interactive {
            return Ok(non_empty((self.env)(env_key).as_deref()));
        }
        let answer = self.prompter.ask(question, default)?;
        Ok(non_empty(Some(&answer)))
    }

    fn required(
        &mut self,
        field: &str,
        flag: Option<&str>,
        env_key: &str,
        question: &str,
        default: Option<&str>,
    ) -> DeployResult<String> {
        self.lookup(flag, env_key, question, default)?
            .ok_or_else(|| DeployError::MissingParameter(field.to_string()))
    }

    fn token(&mut self, flag: Option<&str>) -> DeployResult<Option<SecretString>> {
        if let Some(v) = non_empty(flag) {
            return Ok(Some(SecretString::from(v)));
        }
        if !self.interactive {
            return Ok(non_empty((self.env)(ENV_PAT).as_deref()).map(SecretString::from));
        }
        if !self
            .prompter
            .confirm("Use a personal access token for HTTPS clone?")?
        {
            return Ok(None);
        }
        let answer = self.prompter.ask_secret("Personal access token")?;
        Ok(non_empty(Some(&answer)).map(SecretString::from))
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

/// Build the parameter set for this run, or fail before anything
/// touches the network.
pub fn resolve(
    cli: &Cli,
    run_id: RunId,
    env: &dyn Fn(&str) -> Option<String>,
    prompter: &mut dyn Prompter,
) -> DeployResult<Params> {
    let mut input = Input {
        interactive: !cli.non_interactive,
        env,
        prompter,
    };

    let source = if cli.cleanup {
        None
    } else {
        let repo: RepoUrl = input
            .required("repo", cli.repo.as_deref(), ENV_REPO, "Repository URL", None)?
            .parse()?;
        let token = input.token(cli.pat.as_deref())?;
        if token.is_some() && !repo.is_https() {
            warn!("access token ignored for SSH repository URL");
        }
        let branch = input
            .lookup(
                cli.branch.as_deref(),
                ENV_BRANCH,
                "Branch",
                Some(DEFAULT_BRANCH),
            )?
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string());
        Some((repo, token, branch))
    };

    let user = input.required(
        "user",
        cli.user.as_deref(),
        ENV_USER,
        "Remote username",
        Some(SUGGESTED_USER),
    )?;
    let host = input.required(
        "host",
        cli.host.as_deref(),
        ENV_HOST,
        "Remote host",
        None,
    )?;
    let key = input.required(
        "key",
        cli.key.as_deref(),
        ENV_KEY,
        "SSH private key path",
        Some(SUGGESTED_KEY),
    )?;
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let key = expand_home(&key, home.as_deref());

    let mode = match source {
        Some((repo, token, branch)) => {
            let port = input.required(
                "port",
                cli.port.as_deref(),
                ENV_PORT,
                "Application port",
                Some(SUGGESTED_PORT),
            )?;
            Mode::Deploy(DeployTarget {
                repo,
                token,
                branch,
                port: parse_port(&port)?,
            })
        }
        None => Mode::Cleanup,
    };

    check_key(&key)?;

    let params = Params {
        run_id,
        user,
        host,
        key,
        mode,
    };
    log_summary(&params);
    Ok(params)
}

/// Replace a leading `~/` with `home`.
#[must_use]
pub fn expand_home(path: &str, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Parse a listening port; zero and non-numbers are rejected.
pub fn parse_port(value: &str) -> DeployResult<u16> {
    match value.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(DeployError::invalid(
            "port",
            format!("'{value}' is not a port between 1 and 65535"),
        )),
        Ok(port) => Ok(port),
    }
}

/// The key must be a readable regular file.
pub fn check_key(path: &Path) -> DeployResult<()> {
    if !path.is_file() {
        return Err(DeployError::FileNotFound(format!(
            "SSH key {}",
            path.display()
        )));
    }
    std::fs::File::open(path)
        .map(|_| ())
        .map_err(|e| DeployError::invalid("key", format!("{}: {e}", path.display())))
}

fn log_summary(params: &Params) {
    info!("run id: {}", params.run_id);
    info!(
        "target: {}@{} (key {})",
        params.user,
        params.host,
        params.key.display()
    );
    match &params.mode {
        Mode::Deploy(t) => info!(
            "deploy {} branch {} on port {}{}",
            t.repo,
            t.branch,
            t.port,
            if t.token.is_some() { " (with token)" } else { "" }
        ),
        Mode::Cleanup => info!("mode: cleanup"),
    }
}
