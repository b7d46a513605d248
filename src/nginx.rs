/// An nginx site that forwards everything to one local upstream.
///
/// # Example
///
/// ```
/// use hoist::nginx::{self, NginxSite};
///
/// let site = NginxSite::new(5000);
/// let rendered = nginx::render(&site);
///
/// assert!(rendered.contains("listen 80;"));
/// assert!(rendered.contains("proxy_pass http://127.0.0.1:5000;"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NginxSite {
    pub listen: u16,
    pub server_name: String,
    pub upstream_port: u16,
}

impl NginxSite {
    #[must_use]
    pub fn new(upstream_port: u16) -> Self {
        Self {
            listen: 80,
            server_name: "_".to_string(),
            upstream_port,
        }
    }
}

/// Render the site definition. WebSocket upgrades are passed through.
#[must_use]
pub fn render(site: &NginxSite) -> String {
    format!(
        "server {{
    listen {listen};
    server_name {name};
    location / {{
        proxy_pass http://127.0.0.1:{port};
        proxy_http_version 1.1;
        proxy_set_header Upgrade $http_upgrade;
        proxy_set_header Connection 'upgrade';
        proxy_set_header Host $host;
        proxy_cache_bypass $http_upgrade;
    }}
}}
",
        listen = site.listen,
        name = site.server_name,
        port = site.upstream_port,
    )
}
