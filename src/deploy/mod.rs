pub mod compose;
pub mod container;
pub mod docker;

use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{DeployError, DeployResult};
use crate::params::Params;
use crate::source::BuildDescriptor;
use crate::ssh::SshSession;

pub use compose::ComposeDeployer;
pub use container::ContainerDeployer;

/// How the single-container path publishes the application port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PublishMode {
    /// `-p <port>:<port>`: the host port equals the application port,
    /// so the proxy can always target `127.0.0.1:<port>`.
    #[default]
    Fixed,
    /// `-p <port>`: the engine picks a free host port, which has to be
    /// queried after start.
    Ephemeral,
}

impl PublishMode {
    /// Value of the `docker run -p` flag.
    #[must_use]
    pub fn publish_arg(self, port: u16) -> String {
        match self {
            Self::Fixed => format!("{port}:{port}"),
            Self::Ephemeral => port.to_string(),
        }
    }
}

/// Names and locations one deployment works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// Container name and compose project.
    pub service: String,
    pub image: String,
    pub remote_dir: String,
    pub port: u16,
}

impl Release {
    #[must_use]
    pub fn new(params: &Params, port: u16) -> Self {
        Self {
            service: params.run_id.service_name(),
            image: params.run_id.image_tag(),
            remote_dir: params.remote_dir(),
            port,
        }
    }
}

/// A deployer builds and starts the application from the transferred
/// sources on the remote host.
pub trait Deployer {
    /// Human readable strategy name.
    fn name(&self) -> &'static str;

    /// Build and start the application.
    fn start(&self, ssh: &SshSession<'_>, release: &Release) -> DeployResult<()>;
}

/// Outcome of a successful deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub descriptor: BuildDescriptor,
    /// Host port bound to the application port, when the engine
    /// reported one.
    pub host_port: Option<u16>,
}

/// Pick the strategy matching the descriptor.
#[must_use]
pub fn for_descriptor(descriptor: &BuildDescriptor, publish: PublishMode) -> Box<dyn Deployer> {
    match descriptor {
        BuildDescriptor::Compose(file) => Box::new(ComposeDeployer::new(file)),
        BuildDescriptor::Dockerfile => Box::new(ContainerDeployer::new(publish)),
    }
}

/// Starts the application on the remote host and finds out where it
/// listens.
pub struct RemoteDeployer<'s, 'a> {
    ssh: &'s SshSession<'a>,
    settle: Duration,
    publish: PublishMode,
}

impl<'s, 'a> RemoteDeployer<'s, 'a> {
    #[must_use]
    pub const fn new(ssh: &'s SshSession<'a>) -> Self {
        Self {
            ssh,
            settle: Duration::from_secs(5),
            publish: PublishMode::Fixed,
        }
    }

    /// Pause between start and the port query.
    #[must_use]
    pub const fn settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    #[must_use]
    pub const fn publish(mut self, publish: PublishMode) -> Self {
        self.publish = publish;
        self
    }

    pub fn deploy(&self, release: &Release) -> DeployResult<Deployment> {
        info!("Deploying {} on {}...", release.service, self.ssh.host());

        self.remove_stale(&release.service);

        let descriptor = self.remote_descriptor(&release.remote_dir)?;
        let deployer = for_descriptor(&descriptor, self.publish);
        info!("strategy: {}", deployer.name());
        deployer.start(self.ssh, release)?;

        if !self.settle.is_zero() {
            info!("waiting {}s for the container to start", self.settle.as_secs());
            thread::sleep(self.settle);
        }

        let host_port = match docker::published_port(self.ssh, &release.service, release.port) {
            Ok(Some(port)) => {
                info!("container port {} is published on host port {port}", release.port);
                Some(port)
            }
            Ok(None) => {
                warn!(
                    "could not determine the host port for container port {}",
                    release.port
                );
                None
            }
            Err(e) => {
                warn!("port query failed: {e}");
                None
            }
        };

        Ok(Deployment {
            descriptor,
            host_port,
        })
    }

    /// Remove leftovers carrying this run's name.
    fn remove_stale(&self, prefix: &str) {
        match docker::list_containers(self.ssh, prefix) {
            Ok(stale) if stale.is_empty() => {}
            Ok(stale) => {
                info!("removing {} stale container(s)", stale.len());
                if let Err(e) = docker::remove_containers(self.ssh, &stale) {
                    warn!("could not remove stale containers: {e}");
                }
            }
            Err(e) => warn!("could not list containers: {e}"),
        }
    }

    /// The sources on the host may differ from the local checkout if
    /// they were copied by hand, so detect again.
    fn remote_descriptor(&self, remote_dir: &str) -> DeployResult<BuildDescriptor> {
        let listing = self
            .ssh
            .exec(&format!("ls -1A {remote_dir}"))
            .map_err(|e| DeployError::RemoteDeployFailed(e.detail()))?;

        BuildDescriptor::detect(listing.lines()).ok_or_else(|| {
            DeployError::NoBuildDescriptor(format!("{}:{remote_dir}", self.ssh.host()))
        })
    }
}
