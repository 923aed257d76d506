//! Environment-driven configuration

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crashdesk_analyzer::scanner::DEFAULT_MAX_DUMP_SIZE;

const DEFAULT_BIND: &str = "0.0.0.0:5000";
const DEFAULT_SUPPORT_URL: &str = "http://127.0.0.1:5001";
const DEFAULT_KB_PATH: &str = "data/knowledge_base.json";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 5;

/// Client application configuration, read once at startup.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub bind: SocketAddr,
    /// Base URL of the support dashboard, target of sync pushes
    pub support_base_url: String,
    pub kb_path: PathBuf,
    pub dump_locations: Vec<PathBuf>,
    pub max_dump_size: u64,
    /// Chat-completion endpoint; `None` disables the assistant
    pub assistant_endpoint: Option<String>,
    pub assistant_api_key: Option<String>,
    pub http_timeout: Duration,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let bind = env::var("CRASHDESK_CLIENT_BIND")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| DEFAULT_BIND.parse().expect("default bind address is valid"));

        let dump_locations = env::var("CRASHDESK_DUMP_LOCATIONS")
            .map(|raw| raw.split(',').map(|p| PathBuf::from(p.trim())).collect())
            .unwrap_or_else(|_| default_dump_locations());

        let max_dump_size = env::var("CRASHDESK_MAX_DUMP_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_DUMP_SIZE);

        let http_timeout = Duration::from_secs(
            env::var("CRASHDESK_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
        );

        Self {
            bind,
            support_base_url: env::var("CRASHDESK_SUPPORT_URL")
                .unwrap_or_else(|_| DEFAULT_SUPPORT_URL.to_string()),
            kb_path: env::var("CRASHDESK_KB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_KB_PATH)),
            dump_locations,
            max_dump_size,
            assistant_endpoint: env::var("CRASHDESK_ASSISTANT_URL").ok().filter(|s| !s.is_empty()),
            assistant_api_key: env::var("CRASHDESK_ASSISTANT_KEY").ok().filter(|s| !s.is_empty()),
            http_timeout,
        }
    }
}

fn default_dump_locations() -> Vec<PathBuf> {
    vec![
        PathBuf::from(r"C:\Windows\Minidump"),
        PathBuf::from(r"C:\Windows"),
        PathBuf::from("dumps"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        // Env vars may leak between tests, so only check the derived pieces.
        assert!(DEFAULT_BIND.parse::<SocketAddr>().is_ok());
        assert_eq!(default_dump_locations().len(), 3);
    }
}
