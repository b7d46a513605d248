use std::path::Path;

use docker_compose_types::{Compose, Ports};
use tracing::{info, warn};

use crate::error::{DeployError, DeployResult};

/// One port mapping declared by a compose service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub service: String,
    /// Fixed host port, `None` when the engine picks one.
    pub host: Option<u16>,
    pub container: u16,
}

/// Parse a compose descriptor.
pub fn parse(content: &str) -> DeployResult<Compose> {
    Ok(serde_yaml::from_str(content)?)
}

/// Every port mapping across all services, in declaration order.
/// Entries that use variables or ranges are skipped.
#[must_use]
pub fn publications(compose: &Compose) -> Vec<Publication> {
    let mut out = Vec::new();

    for (name, service) in &compose.services.0 {
        let Some(service) = service else { continue };
        match &service.ports {
            Ports::Short(entries) => {
                out.extend(entries.iter().filter_map(|e| {
                    let (host, container) = parse_short(e)?;
                    Some(Publication {
                        service: name.clone(),
                        host,
                        container,
                    })
                }));
            }
            Ports::Long(entries) => {
                out.extend(entries.iter().filter_map(|p| {
                    let (host, container) = parse_long(&serde_json::to_value(p).ok()?)?;
                    Some(Publication {
                        service: name.clone(),
                        host,
                        container,
                    })
                }));
            }
        }
    }

    out
}

/// Parse the short syntax: `"5000"`, `"8080:5000"`,
/// `"127.0.0.1:8080:5000/tcp"`.
fn parse_short(entry: &str) -> Option<(Option<u16>, u16)> {
    let mapping = entry.split('/').next()?.trim();
    let parts: Vec<&str> = mapping.rsplitn(3, ':').collect();
    let container = parts.first()?.parse().ok()?;
    let host = match parts.get(1) {
        Some(h) if !h.is_empty() => Some(h.parse().ok()?),
        _ => None,
    };
    Some((host, container))
}

/// Parse the long syntax (`target` / `published` keys).
fn parse_long(value: &serde_json::Value) -> Option<(Option<u16>, u16)> {
    let container = u16::try_from(value.get("target")?.as_u64()?).ok()?;
    let host = match value.get("published") {
        Some(serde_json::Value::Number(n)) => Some(u16::try_from(n.as_u64()?).ok()?),
        Some(serde_json::Value::String(s)) => Some(s.parse().ok()?),
        _ => None,
    };
    Some((host, container))
}

/// Whether some service publishes `port` on the same host port.
#[must_use]
pub fn publishes_on_host(compose: &Compose, port: u16) -> bool {
    publications(compose)
        .iter()
        .any(|p| p.host == Some(port))
}

/// Warn when the descriptor in `dir` does not publish the port the
/// proxy will target. Never fails: an unreadable descriptor is only
/// logged.
pub fn inspect(dir: &Path, file_name: &str, port: u16) -> bool {
    let path = dir.join(file_name);
    let parsed = std::fs::read_to_string(&path)
        .map_err(DeployError::from)
        .and_then(|content| parse(&content));

    match parsed {
        Ok(compose) => {
            let services: Vec<&String> = compose.services.0.keys().collect();
            info!("compose services: {services:?}");
            if publishes_on_host(&compose, port) {
                true
            } else {
                warn!(
                    "no service in {file_name} publishes host port {port}; \
                     the proxy targets 127.0.0.1:{port}"
                );
                false
            }
        }
        Err(e) => {
            warn!("could not inspect {}: {e}", path.display());
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_forms() {
        assert_eq!(parse_short("5000"), Some((None, 5000)));
        assert_eq!(parse_short("8080:5000"), Some((Some(8080), 5000)));
        assert_eq!(parse_short("127.0.0.1:8080:5000/tcp"), Some((Some(8080), 5000)));
        assert_eq!(parse_short("${PORT}:5000"), None);
        assert_eq!(parse_short("8000-8010:8000-8010"), None);
    }

    #[test]
    fn long_form_numbers_and_strings() {
        let v = serde_json::json!({"target": 80, "published": "8080"});
        assert_eq!(parse_long(&v), Some((Some(8080), 80)));

        let v = serde_json::json!({"target": 80, "published": 9000});
        assert_eq!(parse_long(&v), Some((Some(9000), 80)));

        let v = serde_json::json!({"target": 80});
        assert_eq!(parse_long(&v), Some((None, 80)));
    }
}
