pub type DeployResult<T> = Result<T, DeployError>;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("missing parameter: {0}")]
    MissingParameter(String),

    #[error("invalid parameter {field}: {reason}")]
    InvalidParameter { field: String, reason: String },

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("source fetch failed: {0}")]
    SourceFetchFailed(String),

    #[error("no recognized build descriptor in {0}")]
    NoBuildDescriptor(String),

    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("SSH connection failed: {0}")]
    SshFailed(String),

    #[error("remote preparation failed: {0}")]
    RemotePrepFailed(String),

    #[error("transfer failed: {0}")]
    TransferFailed(String),

    #[error("remote deploy failed: {0}")]
    RemoteDeployFailed(String),

    #[error("proxy configuration failed: {0}")]
    ProxyConfigFailed(String),

    #[error("command failed: {command}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl DeployError {
    /// Process exit code for this error.
    ///
    /// Missing build descriptors and unknown package managers are
    /// reported with `2`, everything else with `1`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::NoBuildDescriptor(_) | Self::UnsupportedPlatform(_) => 2,
            _ => 1,
        }
    }

    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Flatten the error into a one-line detail string, keeping the
    /// captured stderr of failed commands.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::CommandFailed { stderr, .. } if !stderr.is_empty() => {
                format!("{self}: {stderr}")
            }
            _ => self.to_string(),
        }
    }
}
