use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use crate::cleanup::{self, CleanupReport};
use crate::cmd::{self, Runner};
use crate::compose;
use crate::deploy::{Deployment, PublishMode, Release, RemoteDeployer};
use crate::error::{DeployError, DeployResult};
use crate::nginx::NginxSite;
use crate::params::{DeployTarget, Mode, Params, RunId};
use crate::provision::RemotePreparer;
use crate::proxy::ProxyConfigurer;
use crate::resolve::{self, Prompter};
use crate::source::{BuildDescriptor, SourceFetcher};
use crate::ssh::SshSession;
use crate::transfer;
use crate::validate::{ValidationReport, Validator};

/// Local programs a deployment shells out to.
pub const LOCAL_TOOLS: [&str; 5] = ["git", "ssh", "scp", "rsync", "curl"];

/// Command-line flags. Every value is optional here; the resolver
/// decides what is missing.
#[derive(Parser, Debug, Default, Clone)]
#[command(name = "hoist", version)]
#[command(about = "Deploy a repository to a single host behind nginx")]
pub struct Cli {
    /// Tear down containers, nginx sites and working copies
    #[arg(long)]
    pub cleanup: bool,

    /// Never prompt; read missing values from DEPLOY_* variables
    #[arg(long)]
    pub non_interactive: bool,

    /// Repository URL (https://... or user@host:path)
    #[arg(long, value_name = "URL", allow_hyphen_values = true)]
    pub repo: Option<String>,

    /// Personal access token for HTTPS clones
    #[arg(long, value_name = "TOKEN", allow_hyphen_values = true)]
    pub pat: Option<String>,

    /// Branch to deploy
    #[arg(long, allow_hyphen_values = true)]
    pub branch: Option<String>,

    /// SSH user on the remote host
    #[arg(long, allow_hyphen_values = true)]
    pub user: Option<String>,

    /// Remote host name or IP address
    #[arg(long, allow_hyphen_values = true)]
    pub host: Option<String>,

    /// SSH private key path
    #[arg(long, value_name = "PATH", allow_hyphen_values = true)]
    pub key: Option<String>,

    /// Port the application listens on inside the container
    #[arg(long, allow_hyphen_values = true)]
    pub port: Option<String>,
}

const SWITCHES: [&str; 6] = [
    "--cleanup",
    "--non-interactive",
    "--help",
    "-h",
    "--version",
    "-V",
];
const VALUE_FLAGS: [&str; 7] = [
    "--repo", "--pat", "--branch", "--user", "--host", "--key", "--port",
];

impl Cli {
    /// Parse `args` (without the program name). Unrecognized tokens
    /// are dropped and returned so the caller can warn about them.
    pub fn parse_lenient<I>(args: I) -> Result<(Self, Vec<String>), clap::Error>
    where
        I: IntoIterator<Item = String>,
    {
        let mut kept = vec!["hoist".to_string()];
        let mut unknown = Vec::new();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let (name, inline_value) = match arg.split_once('=') {
                Some((name, _)) => (name, true),
                None => (arg.as_str(), false),
            };

            if VALUE_FLAGS.contains(&name) {
                kept.push(arg.clone());
                if !inline_value {
                    if let Some(value) = args.next() {
                        kept.push(value);
                    }
                }
            } else if SWITCHES.contains(&name) && !inline_value {
                kept.push(arg);
            } else {
                unknown.push(arg);
            }
        }

        let cli = Self::try_parse_from(kept)?;
        Ok((cli, unknown))
    }
}

/// Tunables that are not part of the parameter set.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Parent of the run-scoped local working copies.
    pub work_root: PathBuf,
    /// Pause between container start and the port query.
    pub settle: Duration,
    /// Limit for each HTTP probe.
    pub probe_timeout_secs: u32,
    pub publish: PublishMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_root: std::env::temp_dir(),
            settle: Duration::from_secs(5),
            probe_timeout_secs: 10,
            publish: PublishMode::Fixed,
        }
    }
}

impl Settings {
    #[must_use]
    pub fn work_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_root = dir.into();
        self
    }

    #[must_use]
    pub const fn settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    #[must_use]
    pub const fn probe_timeout_secs(mut self, secs: u32) -> Self {
        self.probe_timeout_secs = secs;
        self
    }

    #[must_use]
    pub const fn publish(mut self, publish: PublishMode) -> Self {
        self.publish = publish;
        self
    }
}

/// What a deploy run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploySummary {
    pub deployment: Deployment,
    /// Port nginx forwards to on the host loopback.
    pub upstream_port: u16,
    pub remote_dir: String,
    pub site_file: String,
    pub validation: ValidationReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Deployed(DeploySummary),
    Cleaned(CleanupReport),
}

/// One deployment or cleanup run against a single host.
pub struct Pipeline<'a> {
    params: Params,
    runner: &'a dyn Runner,
    settings: Settings,
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub fn new(params: Params, runner: &'a dyn Runner) -> Self {
        Self {
            params,
            runner,
            settings: Settings::default(),
        }
    }

    #[must_use]
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Run the mode selected in the parameters.
    pub fn run(&self) -> DeployResult<Outcome> {
        match &self.params.mode {
            Mode::Deploy(target) => self.deploy(target).map(Outcome::Deployed),
            Mode::Cleanup => Ok(Outcome::Cleaned(cleanup::run(
                &self.ssh(),
                &self.settings.work_root,
            ))),
        }
    }

    fn ssh(&self) -> SshSession<'a> {
        SshSession::new(self.runner, &self.params.host, &self.params.user)
            .with_key(&self.params.key)
    }

    fn check_prerequisites(&self) -> DeployResult<()> {
        for tool in LOCAL_TOOLS {
            if !cmd::command_exists(self.runner, tool) {
                return Err(DeployError::CommandNotFound(tool.to_string()));
            }
        }
        Ok(())
    }

    fn deploy(&self, target: &DeployTarget) -> DeployResult<DeploySummary> {
        let run_id = &self.params.run_id;
        self.check_prerequisites()?;

        let local_dir = run_id.local_dir(&self.settings.work_root);
        let descriptor = SourceFetcher::new(self.runner).fetch(target, &local_dir)?;
        if let BuildDescriptor::Compose(file) = &descriptor {
            compose::inspect(&local_dir, file, target.port);
        }

        let ssh = self.ssh();
        ssh.probe()?;

        RemotePreparer::new(&ssh).prepare()?;

        let remote_dir = self.params.remote_dir();
        transfer::upload(&ssh, &local_dir, &remote_dir)?;

        let release = Release::new(&self.params, target.port);
        let deployment = RemoteDeployer::new(&ssh)
            .settle(self.settings.settle)
            .publish(self.settings.publish)
            .deploy(&release)?;

        let upstream_port = upstream_port(self.settings.publish, &deployment, target.port);
        let site_file = run_id.site_file();
        ProxyConfigurer::new(&ssh).configure(&site_file, &NginxSite::new(upstream_port))?;

        let validation = Validator::new(&ssh, self.runner)
            .timeout_secs(self.settings.probe_timeout_secs)
            .validate(&release.service, upstream_port);

        info!("Deployment complete!");
        info!("Application available at: http://{}/", self.params.host);

        Ok(DeploySummary {
            deployment,
            upstream_port,
            remote_dir,
            site_file,
            validation,
        })
    }
}

/// Port nginx should forward to.
///
/// Fixed publishing and compose projects use the application port.
/// An ephemerally published container uses the port the engine
/// reported, falling back to the application port.
#[must_use]
pub fn upstream_port(publish: PublishMode, deployment: &Deployment, app_port: u16) -> u16 {
    match (publish, &deployment.descriptor) {
        (PublishMode::Ephemeral, BuildDescriptor::Dockerfile) => {
            deployment.host_port.unwrap_or_else(|| {
                warn!("host port unknown, proxying to 127.0.0.1:{app_port}");
                app_port
            })
        }
        _ => app_port,
    }
}

/// Resolve the parameters, then run. Nothing is executed when
/// resolution fails.
pub fn execute(
    cli: &Cli,
    run_id: RunId,
    runner: &dyn Runner,
    env: &dyn Fn(&str) -> Option<String>,
    prompter: &mut dyn Prompter,
    settings: Settings,
) -> DeployResult<Outcome> {
    let params = resolve::resolve(cli, run_id, env, prompter)?;
    Pipeline::new(params, runner).settings(settings).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn lenient_parse_skips_unknown_flags() {
        let (cli, unknown) = Cli::parse_lenient(args(&[
            "--host",
            "h",
            "--verbose",
            "--port=5000",
            "--cleanup",
            "stray",
        ]))
        .unwrap();

        assert_eq!(cli.host.as_deref(), Some("h"));
        assert_eq!(cli.port.as_deref(), Some("5000"));
        assert!(cli.cleanup);
        assert_eq!(unknown, args(&["--verbose", "stray"]));
    }

    #[test]
    fn values_may_start_with_a_dash() {
        let (cli, unknown) = Cli::parse_lenient(args(&["--pat", "-secret-"])).unwrap();

        assert_eq!(cli.pat.as_deref(), Some("-secret-"));
        assert!(unknown.is_empty());
    }

    #[test]
    fn fixed_publish_always_targets_app_port() {
        let deployment = Deployment {
            descriptor: BuildDescriptor::Dockerfile,
            host_port: Some(49153),
        };
        assert_eq!(upstream_port(PublishMode::Fixed, &deployment, 5000), 5000);
    }

    #[test]
    fn ephemeral_publish_follows_engine() {
        let mut deployment = Deployment {
            descriptor: BuildDescriptor::Dockerfile,
            host_port: Some(49153),
        };
        assert_eq!(
            upstream_port(PublishMode::Ephemeral, &deployment, 5000),
            49153
        );

        deployment.host_port = None;
        assert_eq!(upstream_port(PublishMode::Ephemeral, &deployment, 5000), 5000);
    }
}
