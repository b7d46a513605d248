pub mod packages;

use tracing::{info, warn};

use crate::error::{DeployError, DeployResult};
use crate::ssh::SshSession;

pub use packages::{Component, PackageManager};

/// Services that must be enabled at boot and running.
pub const SERVICES: [&str; 2] = ["docker", "nginx"];

/// Makes sure the remote host runs a container engine, its compose
/// plugin and nginx. Safe to repeat: installed components are
/// skipped.
pub struct RemotePreparer<'s, 'a> {
    ssh: &'s SshSession<'a>,
}

impl<'s, 'a> RemotePreparer<'s, 'a> {
    #[must_use]
    pub const fn new(ssh: &'s SshSession<'a>) -> Self {
        Self { ssh }
    }

    /// Run the whole preparation sequence.
    pub fn prepare(&self) -> DeployResult<PackageManager> {
        info!("Preparing {}...", self.ssh.host());

        let pm = self.detect()?;
        info!("package manager: {pm:?}");

        if let Some(refresh) = pm.refresh_command() {
            self.required(refresh)?;
        }

        for component in Component::ALL {
            self.ensure(pm, component)?;
        }

        for service in SERVICES {
            self.required(&format!("systemctl enable --now {service}"))?;
        }

        self.add_to_engine_group();
        self.log_versions();

        Ok(pm)
    }

    /// Detect the package manager family.
    pub fn detect(&self) -> DeployResult<PackageManager> {
        let output = self
            .ssh
            .exec(packages::DETECT_SCRIPT)
            .map_err(|e| DeployError::RemotePrepFailed(e.detail()))?;

        PackageManager::from_probe(&output).ok_or_else(|| {
            DeployError::UnsupportedPlatform(format!(
                "no apt-get, dnf or yum on {}",
                self.ssh.host()
            ))
        })
    }

    /// Install `component` unless its probe already succeeds.
    fn ensure(&self, pm: PackageManager, component: Component) -> DeployResult<()> {
        let present = self
            .ssh
            .exec_output(component.probe())
            .map_err(|e| DeployError::RemotePrepFailed(e.detail()))?
            .success();

        if present {
            info!("{} already installed", component.name());
            return Ok(());
        }

        info!("installing {}...", component.name());
        self.required(&pm.install_command(component.packages(pm)))?;
        Ok(())
    }

    /// Best-effort: a repeated grant may exit non-zero.
    fn add_to_engine_group(&self) {
        let command = format!(
            "{}usermod -aG docker {}",
            self.ssh.sudo(),
            self.ssh.user()
        );
        match self.ssh.exec_output(&command) {
            Ok(out) if out.success() => {
                info!("{} is in the docker group", self.ssh.user());
            }
            Ok(out) => warn!(
                "could not add {} to the docker group: {}",
                self.ssh.user(),
                out.stderr.trim()
            ),
            Err(e) => warn!("could not add {} to the docker group: {e}", self.ssh.user()),
        }
    }

    fn log_versions(&self) {
        for probe in ["docker --version", "docker compose version", "nginx -v 2>&1"] {
            if let Ok(out) = self.ssh.exec_output(probe) {
                if out.success() {
                    info!("{}", out.text());
                }
            }
        }
    }

    fn required(&self, command: &str) -> DeployResult<String> {
        self.ssh
            .exec(&format!("{}{command}", self.ssh.sudo()))
            .map_err(|e| DeployError::RemotePrepFailed(e.detail()))
    }
}
