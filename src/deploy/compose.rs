use tracing::{info, warn};

use crate::deploy::{Deployer, Release};
use crate::error::{DeployError, DeployResult};
use crate::ssh::SshSession;

/// Start a multi-container application with `docker compose`, scoped
/// to a project named after the run.
pub struct ComposeDeployer {
    file: String,
}

impl ComposeDeployer {
    #[must_use]
    pub fn new(file: &str) -> Self {
        Self {
            file: file.to_string(),
        }
    }

    fn compose(&self, ssh: &SshSession<'_>, release: &Release, action: &str) -> String {
        format!(
            "cd {} && {}docker compose -p {} -f {} {action}",
            release.remote_dir,
            ssh.sudo(),
            release.service,
            self.file
        )
    }
}

impl Deployer for ComposeDeployer {
    fn name(&self) -> &'static str {
        "docker compose"
    }

    fn start(&self, ssh: &SshSession<'_>, release: &Release) -> DeployResult<()> {
        // A project with nothing running makes `down` a no-op.
        if let Err(e) = ssh.exec(&self.compose(ssh, release, "down --remove-orphans")) {
            warn!("compose down failed: {e}");
        }

        info!("Starting compose project {}...", release.service);
        ssh.exec(&self.compose(ssh, release, "up --build -d"))
            .map_err(|e| DeployError::RemoteDeployFailed(e.detail()))?;
        Ok(())
    }
}
