use std::path::Path;

use tracing::info;

use crate::error::{DeployError, DeployResult};
use crate::ssh::SshSession;

/// Paths never shipped to the remote host.
pub const EXCLUDES: [&str; 9] = [
    ".git",
    ".env",
    ".env.*",
    "node_modules",
    "__pycache__",
    ".venv",
    "venv",
    "target",
    ".cache",
];

/// Copy the working copy to the run-scoped remote directory.
pub fn upload(ssh: &SshSession<'_>, local_dir: &Path, remote_dir: &str) -> DeployResult<()> {
    info!("Transferring {} to {}:{remote_dir}...", local_dir.display(), ssh.host());

    let user = ssh.user();
    ssh.exec(&format!(
        "{sudo}mkdir -p {remote_dir} && {sudo}chown {user}: {remote_dir}",
        sudo = ssh.sudo()
    ))
    .map_err(|e| DeployError::TransferFailed(e.detail()))?;

    ssh.rsync_to(local_dir, remote_dir, &EXCLUDES)
        .map_err(|e| DeployError::TransferFailed(e.detail()))?;

    info!("Transfer complete");
    Ok(())
}
