//! Typed queries against the remote container engine.

use serde::Deserialize;

use crate::error::{DeployError, DeployResult};
use crate::ssh::SshSession;

/// Go template making `docker ps` print one JSON object per line.
const PS_FORMAT: &str = "'{{json .}}'";

/// One row of `docker ps --format '{{json .}}'`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContainerSummary {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Names")]
    pub names: String,
    #[serde(rename = "Image", default)]
    pub image: String,
    #[serde(rename = "Status", default)]
    pub status: String,
    #[serde(rename = "Ports", default)]
    pub ports: String,
}

impl ContainerSummary {
    /// Host port bound to `container_port/tcp`, if any.
    #[must_use]
    pub fn host_port(&self, container_port: u16) -> Option<u16> {
        parse_host_port(&self.ports, container_port)
    }
}

/// Parse `docker ps` JSON lines. Blank lines are skipped.
pub fn parse_ps(output: &str) -> DeployResult<Vec<ContainerSummary>> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| serde_json::from_str::<ContainerSummary>(l).map_err(DeployError::from))
        .collect()
}

/// Find the host port in a `Ports` column such as
/// `0.0.0.0:49153->5000/tcp, :::49153->5000/tcp`.
///
/// ```
/// use hoist::deploy::docker::parse_host_port;
///
/// let ports = "0.0.0.0:49153->5000/tcp, :::49153->5000/tcp";
/// assert_eq!(parse_host_port(ports, 5000), Some(49153));
/// assert_eq!(parse_host_port("5000/tcp", 5000), None);
/// ```
#[must_use]
pub fn parse_host_port(ports: &str, container_port: u16) -> Option<u16> {
    let wanted = format!("{container_port}/tcp");
    ports
        .split(',')
        .map(str::trim)
        .filter_map(|mapping| mapping.split_once("->"))
        .filter(|(_, target)| *target == wanted)
        .find_map(|(host, _)| host.rsplit_once(':')?.1.parse().ok())
}

/// Containers (running or not) whose name starts with `prefix`.
pub fn list_containers(ssh: &SshSession<'_>, prefix: &str) -> DeployResult<Vec<ContainerSummary>> {
    let output = ssh.exec(&format!(
        "{}docker ps -a --filter name=^{prefix} --format {PS_FORMAT}",
        ssh.sudo()
    ))?;
    parse_ps(&output)
}

/// Force-remove the given containers.
pub fn remove_containers(
    ssh: &SshSession<'_>,
    containers: &[ContainerSummary],
) -> DeployResult<()> {
    if containers.is_empty() {
        return Ok(());
    }
    let ids: Vec<&str> = containers.iter().map(|c| c.id.as_str()).collect();
    ssh.exec(&format!("{}docker rm -f {}", ssh.sudo(), ids.join(" ")))?;
    Ok(())
}

/// Host port the engine bound to `container_port` for any container
/// of this run.
pub fn published_port(
    ssh: &SshSession<'_>,
    prefix: &str,
    container_port: u16,
) -> DeployResult<Option<u16>> {
    let containers = list_containers(ssh, prefix)?;
    Ok(containers.iter().find_map(|c| c.host_port(container_port)))
}
