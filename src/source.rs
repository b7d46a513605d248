use std::path::Path;

use tracing::info;

use crate::cmd::{self, Runner};
use crate::error::{DeployError, DeployResult};
use crate::params::DeployTarget;

/// Multi-container descriptors, in lookup order.
pub const COMPOSE_FILES: [&str; 4] = [
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

/// Single-container descriptor.
pub const DOCKERFILE: &str = "Dockerfile";

/// How the application is built and started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildDescriptor {
    /// A compose project, with the descriptor file name.
    Compose(String),
    /// A single image built from `Dockerfile`.
    Dockerfile,
}

impl BuildDescriptor {
    /// Pick the descriptor from a directory listing. Compose wins
    /// when both kinds are present.
    ///
    /// ```
    /// use hoist::source::BuildDescriptor;
    ///
    /// let found = BuildDescriptor::detect(["README.md", "Dockerfile"]);
    /// assert_eq!(found, Some(BuildDescriptor::Dockerfile));
    /// assert_eq!(BuildDescriptor::detect(["main.go"]), None);
    /// ```
    pub fn detect<'a>(names: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        let names: Vec<&str> = names.into_iter().map(str::trim).collect();
        COMPOSE_FILES
            .iter()
            .find(|f| names.contains(*f))
            .map(|f| Self::Compose((*f).to_string()))
            .or_else(|| names.contains(&DOCKERFILE).then_some(Self::Dockerfile))
    }

    /// Detect the descriptor among the regular files of `dir`.
    #[must_use]
    pub fn detect_in(dir: &Path) -> Option<Self> {
        let present: Vec<&str> = COMPOSE_FILES
            .iter()
            .copied()
            .chain(std::iter::once(DOCKERFILE))
            .filter(|name| dir.join(name).is_file())
            .collect();
        Self::detect(present)
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        match self {
            Self::Compose(name) => name,
            Self::Dockerfile => DOCKERFILE,
        }
    }
}

/// Clones or updates the repository into the run's local working
/// directory.
pub struct SourceFetcher<'a> {
    runner: &'a dyn Runner,
}

impl<'a> SourceFetcher<'a> {
    #[must_use]
    pub fn new(runner: &'a dyn Runner) -> Self {
        Self { runner }
    }

    /// Produce a working copy of the target branch in `dir` and
    /// return its build descriptor.
    pub fn fetch(&self, target: &DeployTarget, dir: &Path) -> DeployResult<BuildDescriptor> {
        let dir_str = dir.to_string_lossy();

        if dir.join(".git").is_dir() {
            info!("updating existing working copy in {dir_str}");
            self.git(&["-C", &dir_str, "fetch", "--all", "--prune"], "git fetch")?;
            self.git(
                &["-C", &dir_str, "checkout", &target.branch],
                &format!("git checkout {}", target.branch),
            )?;
            self.git(
                &["-C", &dir_str, "pull", "--ff-only", "origin", &target.branch],
                &format!("git pull origin {}", target.branch),
            )?;
        } else {
            info!(
                "cloning {} (branch {}) into {dir_str}",
                target.repo, target.branch
            );
            let url = target.repo.authenticated(target.token.as_ref());
            self.git(
                &["clone", "--branch", &target.branch, "--", &url, &dir_str],
                &format!("git clone {}", target.repo),
            )?;
        }

        let descriptor = BuildDescriptor::detect_in(dir)
            .ok_or_else(|| DeployError::NoBuildDescriptor(dir_str.to_string()))?;
        info!("build descriptor: {}", descriptor.file_name());
        Ok(descriptor)
    }

    /// Run git; `shown` is the credential-free form used in errors.
    fn git(&self, args: &[&str], shown: &str) -> DeployResult<()> {
        let output = self.runner.run("git", args)?;
        cmd::log_output(&output);
        if output.success() {
            Ok(())
        } else {
            Err(DeployError::SourceFetchFailed(format!(
                "{shown}: {}",
                output.stderr.trim()
            )))
        }
    }
}
