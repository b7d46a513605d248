use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Local, TimeZone};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::DeployError;

/// Prefix shared by every resource a run creates: directories,
/// containers, images, compose projects, nginx sites and log files.
pub const NAME_PREFIX: &str = "deploy_";

/// Shell glob matching exactly the names a [`RunId`] produces:
/// `deploy_YYYYMMDD_HHMMSS_mmm`.
pub const RUN_NAME_GLOB: &str = "deploy_[0-9][0-9][0-9][0-9][0-9][0-9][0-9][0-9]\
     _[0-9][0-9][0-9][0-9][0-9][0-9]_[0-9][0-9][0-9]";

/// Branch deployed when none is given.
pub const DEFAULT_BRANCH: &str = "main";

/// Timestamp-derived token namespacing everything one invocation
/// creates.
///
/// ```
/// use hoist::params::RunId;
///
/// let id = RunId::from_token("20261017_120000_042");
/// assert_eq!(id.service_name(), "deploy_20261017_120000_042");
/// assert_eq!(id.image_tag(), "deploy_20261017_120000_042:latest");
/// assert_eq!(id.site_file(), "deploy_20261017_120000_042.conf");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunId(String);

impl RunId {
    /// A token for the current local time, down to milliseconds.
    #[must_use]
    pub fn now() -> Self {
        Self::from_time(&Local::now())
    }

    #[must_use]
    pub fn from_time<Tz: TimeZone>(time: &DateTime<Tz>) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        Self(time.format("%Y%m%d_%H%M%S_%3f").to_string())
    }

    #[must_use]
    pub fn from_token(token: &str) -> Self {
        Self(token.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Container name and compose project name.
    #[must_use]
    pub fn service_name(&self) -> String {
        format!("{NAME_PREFIX}{}", self.0)
    }

    #[must_use]
    pub fn image_tag(&self) -> String {
        format!("{}:latest", self.service_name())
    }

    /// File name of the nginx site, identical in `sites-available`
    /// and `sites-enabled`.
    #[must_use]
    pub fn site_file(&self) -> String {
        format!("{}.conf", self.service_name())
    }

    #[must_use]
    pub fn log_file(&self) -> String {
        format!("{}.log", self.service_name())
    }

    /// Local working copy for this run under `root`.
    #[must_use]
    pub fn local_dir(&self, root: &Path) -> PathBuf {
        root.join(self.service_name())
    }

    /// Whether `name` is `deploy_<token>` for some well-formed token.
    ///
    /// ```
    /// use hoist::params::RunId;
    ///
    /// assert!(RunId::is_run_name("deploy_20261017_120000_042"));
    /// assert!(!RunId::is_run_name("deploy_keys_backup"));
    /// ```
    #[must_use]
    pub fn is_run_name(name: &str) -> bool {
        let Some(token) = name.strip_prefix(NAME_PREFIX) else {
            return false;
        };
        let parts: Vec<&str> = token.split('_').collect();
        matches!(parts.as_slice(), [date, time, millis]
            if date.len() == 8 && time.len() == 6 && millis.len() == 3
                && parts.iter().all(|p| p.bytes().all(|b| b.is_ascii_digit())))
    }

    /// Remote application directory in the home of `user`.
    #[must_use]
    pub fn remote_dir(&self, user: &str) -> String {
        format!("{}/{}", remote_home(user), self.service_name())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Home directory of `user` on a conventional Linux host.
#[must_use]
pub fn remote_home(user: &str) -> String {
    if user == "root" {
        "/root".to_string()
    } else {
        format!("/home/{user}")
    }
}

/// A repository location in one of the recognized transports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoUrl {
    /// `http://` or `https://`.
    Https(Url),
    /// `ssh://...` or the scp-like `user@host:path`.
    Ssh(String),
}

impl RepoUrl {
    /// URL handed to `git clone`. An access token is embedded as the
    /// basic-auth user for HTTP(S) remotes and ignored for SSH ones.
    #[must_use]
    pub fn authenticated(&self, token: Option<&SecretString>) -> String {
        match (self, token) {
            (Self::Https(url), Some(token)) => {
                let mut url = url.clone();
                if url.set_username(token.expose_secret()).is_ok() {
                    url.to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        }
    }

    #[must_use]
    pub const fn is_https(&self) -> bool {
        matches!(self, Self::Https(_))
    }
}

impl fmt::Display for RepoUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Https(url) => write!(f, "{url}"),
            Self::Ssh(s) => f.write_str(s),
        }
    }
}

impl FromStr for RepoUrl {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DeployError::invalid("repo", "empty repository URL"));
        }
        if s.starts_with('-') {
            return Err(DeployError::invalid("repo", "URL must not start with '-'"));
        }

        let lower = s.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            let url = Url::parse(s).map_err(|e| DeployError::invalid("repo", e.to_string()))?;
            if url.host_str().is_none_or(str::is_empty) {
                return Err(DeployError::invalid("repo", "URL has no host"));
            }
            return Ok(Self::Https(url));
        }

        if lower.starts_with("ssh://") {
            let url = Url::parse(s).map_err(|e| DeployError::invalid("repo", e.to_string()))?;
            if url.host_str().is_none_or(str::is_empty) {
                return Err(DeployError::invalid("repo", "URL has no host"));
            }
            return Ok(Self::Ssh(s.to_string()));
        }

        if is_scp_like(s) {
            return Ok(Self::Ssh(s.to_string()));
        }

        Err(DeployError::invalid(
            "repo",
            format!("'{s}' is neither http(s):// nor user@host:path"),
        ))
    }
}

/// `user@host:path` with no whitespace and non-empty parts.
fn is_scp_like(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((user, rest)) = s.split_once('@') else {
        return false;
    };
    let Some((host, path)) = rest.split_once(':') else {
        return false;
    };
    !user.is_empty()
        && !user.contains(['/', ':'])
        && !host.is_empty()
        && !host.contains('/')
        && !path.is_empty()
}

/// What to deploy and where the application listens.
#[derive(Debug)]
pub struct DeployTarget {
    pub repo: RepoUrl,
    pub token: Option<SecretString>,
    pub branch: String,
    /// Port the application listens on inside its container; also
    /// the nginx upstream port.
    pub port: u16,
}

/// Which path a run takes.
#[derive(Debug)]
pub enum Mode {
    Deploy(DeployTarget),
    Cleanup,
}

/// The deployment parameter set. Built once by the resolver and only
/// read afterwards.
#[derive(Debug)]
pub struct Params {
    pub run_id: RunId,
    pub user: String,
    pub host: String,
    pub key: PathBuf,
    pub mode: Mode,
}

impl Params {
    #[must_use]
    pub const fn target(&self) -> Option<&DeployTarget> {
        match &self.mode {
            Mode::Deploy(target) => Some(target),
            Mode::Cleanup => None,
        }
    }

    #[must_use]
    pub fn remote_dir(&self) -> String {
        self.run_id.remote_dir(&self.user)
    }
}
