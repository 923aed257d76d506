//! Environment-driven configuration

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_BIND: &str = "0.0.0.0:5001";
const DEFAULT_CLIENT_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 5;

/// Support dashboard configuration, read once at startup.
#[derive(Clone, Debug)]
pub struct SupportConfig {
    pub bind: SocketAddr,
    /// Base URL of the client application, target of sync pushes
    pub client_base_url: String,
    pub http_timeout: Duration,
}

impl SupportConfig {
    pub fn from_env() -> Self {
        let bind = env::var("CRASHDESK_SUPPORT_BIND")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| DEFAULT_BIND.parse().expect("default bind address is valid"));

        Self {
            bind,
            client_base_url: env::var("CRASHDESK_CLIENT_URL")
                .unwrap_or_else(|_| DEFAULT_CLIENT_URL.to_string()),
            http_timeout: Duration::from_secs(
                env::var("CRASHDESK_HTTP_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            ),
        }
    }
}
