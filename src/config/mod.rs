/// Application configuration module
use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub eonet_base_url: String,
    pub request_limit: u32,
    pub cache_ttl_seconds: u64,
    pub poll_every_seconds: u64,
    pub bind_addr: String,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let eonet_base_url = env::var("EONET_BASE_URL")
            .unwrap_or_else(|_| "https://eonet.gsfc.nasa.gov/api/v3/events".to_string());

        let request_limit = env_u64("EONET_LIMIT", 50) as u32;
        let cache_ttl_seconds = env_u64("CACHE_TTL_SECONDS", 300);
        let poll_every_seconds = env_u64("POLL_EVERY_SECONDS", 300);

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        Ok(Self {
            eonet_base_url,
            request_limit,
            cache_ttl_seconds,
            poll_every_seconds,
            bind_addr,
        })
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
