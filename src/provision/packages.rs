/// Package manager families the preparer knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Dnf,
    Yum,
}

/// Prints `apt`, `dnf`, `yum`, or nothing.
pub const DETECT_SCRIPT: &str = "if command -v apt-get >/dev/null 2>&1; then echo apt; \
     elif command -v dnf >/dev/null 2>&1; then echo dnf; \
     elif command -v yum >/dev/null 2>&1; then echo yum; fi";

impl PackageManager {
    /// Parse the output of [`DETECT_SCRIPT`].
    #[must_use]
    pub fn from_probe(output: &str) -> Option<Self> {
        match output.trim() {
            "apt" => Some(Self::Apt),
            "dnf" => Some(Self::Dnf),
            "yum" => Some(Self::Yum),
            _ => None,
        }
    }

    /// Metadata refresh, when the family needs one before installs.
    #[must_use]
    pub const fn refresh_command(self) -> Option<&'static str> {
        match self {
            Self::Apt => Some("apt-get update -y"),
            Self::Dnf | Self::Yum => None,
        }
    }

    #[must_use]
    pub fn install_command(self, packages: &[&str]) -> String {
        let list = packages.join(" ");
        match self {
            Self::Apt => format!("DEBIAN_FRONTEND=noninteractive apt-get install -y {list}"),
            Self::Dnf => format!("dnf install -y {list}"),
            Self::Yum => format!("yum install -y {list}"),
        }
    }
}

/// A piece of runtime the remote host must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Engine,
    ComposePlugin,
    Proxy,
}

impl Component {
    pub const ALL: [Self; 3] = [Self::Engine, Self::ComposePlugin, Self::Proxy];

    /// Succeeds when the component is already installed.
    #[must_use]
    pub const fn probe(self) -> &'static str {
        match self {
            Self::Engine => "command -v docker >/dev/null 2>&1",
            Self::ComposePlugin => "docker compose version >/dev/null 2>&1",
            Self::Proxy => "command -v nginx >/dev/null 2>&1",
        }
    }

    #[must_use]
    pub const fn packages(self, pm: PackageManager) -> &'static [&'static str] {
        match (self, pm) {
            (Self::Engine, PackageManager::Apt) => &["docker.io"],
            (Self::Engine, PackageManager::Dnf | PackageManager::Yum) => &["docker"],
            (Self::ComposePlugin, PackageManager::Apt) => &["docker-compose-v2"],
            (Self::ComposePlugin, PackageManager::Dnf | PackageManager::Yum) => {
                &["docker-compose-plugin"]
            }
            (Self::Proxy, _) => &["nginx"],
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Engine => "docker",
            Self::ComposePlugin => "docker compose",
            Self::Proxy => "nginx",
        }
    }
}
