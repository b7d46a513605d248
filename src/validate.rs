use tracing::{info, warn};

use crate::cmd::Runner;
use crate::deploy::docker::{self, ContainerSummary};
use crate::ssh::SshSession;

/// What the post-deploy checks observed. Never an error: every check
/// is a diagnostic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub engine_active: bool,
    pub containers: Vec<ContainerSummary>,
    /// HTTP status of the app on the remote loopback.
    pub app_status: Option<u16>,
    /// HTTP status through nginx, probed from this machine.
    pub proxy_status: Option<u16>,
}

impl ValidationReport {
    #[must_use]
    pub const fn reachable(&self) -> bool {
        self.app_status.is_some() && self.proxy_status.is_some()
    }
}

/// Parse curl's `%{http_code}`; `000` means no response.
#[must_use]
pub fn parse_status(output: &str) -> Option<u16> {
    output.trim().parse().ok().filter(|code| *code != 0)
}

/// Probes the application on the host and through the proxy.
pub struct Validator<'s, 'a> {
    ssh: &'s SshSession<'a>,
    local: &'a dyn Runner,
    timeout_secs: u32,
}

impl<'s, 'a> Validator<'s, 'a> {
    #[must_use]
    pub const fn new(ssh: &'s SshSession<'a>, local: &'a dyn Runner) -> Self {
        Self {
            ssh,
            local,
            timeout_secs: 10,
        }
    }

    #[must_use]
    pub const fn timeout_secs(mut self, secs: u32) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn validate(&self, service: &str, port: u16) -> ValidationReport {
        info!("Validating deployment...");

        let report = ValidationReport {
            engine_active: self.engine_active(),
            containers: self.containers(service),
            app_status: self.probe_app(port),
            proxy_status: self.probe_proxy(),
        };

        if report.reachable() {
            info!("deployment reachable at http://{}/", self.ssh.host());
        }
        report
    }

    fn engine_active(&self) -> bool {
        let active = self
            .ssh
            .exec_output("systemctl is-active docker")
            .is_ok_and(|o| o.success() && o.text() == "active");
        if active {
            info!("docker service active");
        } else {
            warn!("docker service is not active");
        }
        active
    }

    fn containers(&self, service: &str) -> Vec<ContainerSummary> {
        match docker::list_containers(self.ssh, service) {
            Ok(list) if list.is_empty() => {
                warn!("no container named {service}*");
                list
            }
            Ok(list) => {
                for c in &list {
                    info!("container {} ({}): {}", c.names, c.image, c.status);
                }
                list
            }
            Err(e) => {
                warn!("could not list containers: {e}");
                Vec::new()
            }
        }
    }

    fn probe_app(&self, port: u16) -> Option<u16> {
        let command = format!(
            "curl -s -o /dev/null -w '%{{http_code}}' --max-time {} http://127.0.0.1:{port}",
            self.timeout_secs
        );
        let status = self
            .ssh
            .exec_output(&command)
            .ok()
            .and_then(|o| parse_status(&o.stdout));
        match status {
            Some(code) => info!("app on 127.0.0.1:{port} answered HTTP {code}"),
            None => warn!("app on 127.0.0.1:{port} did not answer on the remote host"),
        }
        status
    }

    fn probe_proxy(&self) -> Option<u16> {
        let url = format!("http://{}/", self.ssh.host());
        let timeout = self.timeout_secs.to_string();
        let status = self
            .local
            .run(
                "curl",
                &[
                    "-sI",
                    "-o",
                    "/dev/null",
                    "-w",
                    "%{http_code}",
                    "--max-time",
                    &timeout,
                    &url,
                ],
            )
            .ok()
            .and_then(|o| parse_status(&o.stdout));
        match status {
            Some(code) => info!("{url} answered HTTP {code} through nginx"),
            None => warn!(
                "{url} is not reachable from here; a firewall may be blocking port 80"
            ),
        }
        status
    }
}
