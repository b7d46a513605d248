use tracing::{info, warn};

use crate::deploy::{Deployer, PublishMode, Release};
use crate::error::{DeployError, DeployResult};
use crate::ssh::SshSession;

/// Build one image from the `Dockerfile` and run it as a detached
/// container that restarts unless stopped.
pub struct ContainerDeployer {
    publish: PublishMode,
}

impl ContainerDeployer {
    #[must_use]
    pub const fn new(publish: PublishMode) -> Self {
        Self { publish }
    }
}

impl Deployer for ContainerDeployer {
    fn name(&self) -> &'static str {
        "docker run"
    }

    fn start(&self, ssh: &SshSession<'_>, release: &Release) -> DeployResult<()> {
        let sudo = ssh.sudo();

        info!("Building image {}...", release.image);
        ssh.exec(&format!(
            "{sudo}docker build -t {} {}",
            release.image, release.remote_dir
        ))
        .map_err(|e| DeployError::RemoteDeployFailed(e.detail()))?;

        if let Err(e) = ssh.exec(&format!("{sudo}docker rm -f {}", release.service)) {
            warn!("no previous container removed: {e}");
        }

        info!("Starting container {}...", release.service);
        ssh.exec(&format!(
            "{sudo}docker run -d --name {} --restart unless-stopped -p {} {}",
            release.service,
            self.publish.publish_arg(release.port),
            release.image
        ))
        .map_err(|e| DeployError::RemoteDeployFailed(e.detail()))?;

        Ok(())
    }
}
