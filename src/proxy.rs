use std::io::Write;

use tracing::{info, warn};

use crate::error::{DeployError, DeployResult};
use crate::nginx::{self, NginxSite};
use crate::ssh::SshSession;

pub const SITES_AVAILABLE: &str = "/etc/nginx/sites-available";
pub const SITES_ENABLED: &str = "/etc/nginx/sites-enabled";

/// Installs a run-scoped nginx site and reloads nginx.
pub struct ProxyConfigurer<'s, 'a> {
    ssh: &'s SshSession<'a>,
}

impl<'s, 'a> ProxyConfigurer<'s, 'a> {
    #[must_use]
    pub const fn new(ssh: &'s SshSession<'a>) -> Self {
        Self { ssh }
    }

    /// Render `site`, install it as `site_file` in both site
    /// directories, validate the whole configuration, then reload.
    ///
    /// When validation fails the new files are removed again, and
    /// nginx keeps serving the previous configuration since it was
    /// never reloaded.
    pub fn configure(&self, site_file: &str, site: &NginxSite) -> DeployResult<()> {
        info!(
            "Configuring nginx: {site_file} -> 127.0.0.1:{}",
            site.upstream_port
        );

        let rendered = nginx::render(site);
        let mut local = tempfile::Builder::new()
            .prefix("hoist-site-")
            .suffix(".conf")
            .tempfile()
            .map_err(|e| DeployError::ProxyConfigFailed(e.to_string()))?;
        local
            .write_all(rendered.as_bytes())
            .and_then(|()| local.flush())
            .map_err(|e| DeployError::ProxyConfigFailed(e.to_string()))?;

        let staged = format!("/tmp/{site_file}");
        let available = format!("{SITES_AVAILABLE}/{site_file}");
        let enabled = format!("{SITES_ENABLED}/{site_file}");
        let sudo = self.ssh.sudo();

        self.ssh
            .scp_to(local.path(), &staged)
            .map_err(|e| DeployError::ProxyConfigFailed(e.detail()))?;

        self.step(&format!("{sudo}mkdir -p {SITES_AVAILABLE} {SITES_ENABLED}"))?;
        self.step(&format!("{sudo}mv {staged} {available}"))?;
        self.step(&format!("{sudo}ln -sf {available} {enabled}"))?;

        if let Err(e) = self.ssh.exec(&format!("{sudo}nginx -t")) {
            warn!("nginx rejected the configuration, removing {site_file}");
            if let Err(rm) = self.ssh.exec(&format!("{sudo}rm -f {enabled} {available}")) {
                warn!("could not remove rejected site: {rm}");
            }
            return Err(DeployError::ProxyConfigFailed(e.detail()));
        }

        self.step(&format!("{sudo}systemctl reload nginx"))?;
        info!("nginx reloaded");
        Ok(())
    }

    fn step(&self, command: &str) -> DeployResult<()> {
        self.ssh
            .exec(command)
            .map(|_| ())
            .map_err(|e| DeployError::ProxyConfigFailed(e.detail()))
    }
}
