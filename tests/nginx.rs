use hoist::nginx::{self, NginxSite};

const EXPECTED_5000: &str = "server {
    listen 80;
    server_name _;
    location / {
        proxy_pass http://127.0.0.1:5000;
        proxy_http_version 1.1;
        proxy_set_header Upgrade $http_upgrade;
        proxy_set_header Connection 'upgrade';
        proxy_set_header Host $host;
        proxy_cache_bypass $http_upgrade;
    }
}
";

#[test]
fn renders_exact_site() {
    assert_eq!(nginx::render(&NginxSite::new(5000)), EXPECTED_5000);
}

#[test]
fn upstream_follows_port() {
    let rendered = nginx::render(&NginxSite::new(3000));

    assert!(rendered.contains("proxy_pass http://127.0.0.1:3000;"));
    assert!(!rendered.contains("5000"));
}

#[test]
fn passes_websocket_upgrades() {
    let rendered = nginx::render(&NginxSite::new(8080));

    assert!(rendered.contains("proxy_set_header Upgrade $http_upgrade;"));
    assert!(rendered.contains("proxy_set_header Connection 'upgrade';"));
    assert!(rendered.contains("proxy_http_version 1.1;"));
}
