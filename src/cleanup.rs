use std::path::Path;

use tracing::{info, warn};

use crate::params::{RUN_NAME_GLOB, RunId, remote_home};
use crate::proxy::{SITES_AVAILABLE, SITES_ENABLED};
use crate::ssh::SshSession;

/// Result of one teardown step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub name: String,
    pub result: Result<(), String>,
}

/// Every step of a cleanup run, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub steps: Vec<StepOutcome>,
}

impl CleanupReport {
    #[must_use]
    pub fn failed(&self) -> usize {
        self.steps.iter().filter(|s| s.result.is_err()).count()
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.steps.len() - self.failed()
    }

    fn record(&mut self, name: &str, result: Result<(), String>) {
        match &result {
            Ok(()) => info!("cleanup: {name}: ok"),
            Err(e) => warn!("cleanup: {name}: {e}"),
        }
        self.steps.push(StepOutcome {
            name: name.to_string(),
            result,
        });
    }
}

/// Remote commands of the teardown, in order.
#[must_use]
pub fn remote_steps(user: &str, sudo: &str) -> Vec<(&'static str, String)> {
    let home = remote_home(user);
    vec![
        ("stop nginx", format!("{sudo}systemctl stop nginx")),
        (
            "remove containers",
            format!("{sudo}docker ps -aq | xargs -r {sudo}docker rm -f"),
        ),
        ("prune networks", format!("{sudo}docker network prune -f")),
        (
            "remove nginx sites",
            format!(
                "{sudo}rm -f {SITES_AVAILABLE}/{RUN_NAME_GLOB}.conf \
                 {SITES_ENABLED}/{RUN_NAME_GLOB}.conf"
            ),
        ),
        (
            "remove app directories",
            format!("{sudo}rm -rf {home}/{RUN_NAME_GLOB}"),
        ),
        (
            "reload nginx",
            format!("{sudo}systemctl reload nginx || {sudo}systemctl start nginx"),
        ),
    ]
}

/// Best-effort teardown of everything this tool created on the
/// remote host and locally. Runs every step whatever the previous
/// ones returned.
pub fn run(ssh: &SshSession<'_>, work_root: &Path) -> CleanupReport {
    info!("Cleaning up {}...", ssh.destination());
    let mut report = CleanupReport::default();

    for (name, command) in remote_steps(ssh.user(), ssh.sudo()) {
        let result = ssh.exec(&command).map(|_| ()).map_err(|e| e.detail());
        report.record(name, result);
    }

    report.record("remove local working copies", remove_local_dirs(work_root));

    info!(
        "cleanup finished: {} step(s) ok, {} failed",
        report.succeeded(),
        report.failed()
    );
    report
}

/// Remove every run directory (`deploy_<token>`) directly under `root`.
fn remove_local_dirs(root: &Path) -> Result<(), String> {
    let entries = std::fs::read_dir(root).map_err(|e| format!("{}: {e}", root.display()))?;

    let mut errors = Vec::new();
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        let ours = entry
            .file_name()
            .to_str()
            .is_some_and(RunId::is_run_name);
        if ours && path.is_dir() {
            match std::fs::remove_dir_all(&path) {
                Ok(()) => info!("removed {}", path.display()),
                Err(e) => errors.push(format!("{}: {e}", path.display())),
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}
