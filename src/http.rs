use reqwest::Client;
use std::time::Duration;

const USER_AGENT: &str = concat!("unit-sync-rs/", env!("CARGO_PKG_VERSION"));

/// Shared client for marketplace APIs and catalog pages.
///
/// `default_timeout` is used when `HTTP_TIMEOUT_SECS` is unset, so each API
/// keeps its own budget (content listing 10s, stock pushes 15s).
pub fn build_client(default_timeout: u64) -> Client {
    let timeout = env_secs("HTTP_TIMEOUT_SECS").unwrap_or(default_timeout);
    let connect = env_secs("HTTP_CONNECT_TIMEOUT_SECS").unwrap_or(5);
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout))
        .connect_timeout(Duration::from_secs(connect))
        .build()
        .unwrap_or_else(|_| Client::new())
}

fn env_secs(key: &str) -> Option<u64> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
}
