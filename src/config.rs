use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::services::recommend::MAX_RECOMMENDATIONS;

const DEFAULT_STORE_TIMEOUT_MS: u64 = 2000;
const DEFAULT_PROFILE_CACHE_TTL_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub store_timeout: Duration,
    pub profile_cache_ttl: Duration,
    pub recommendation_limit: usize,
    pub seed_demo_course: bool,
    pub jitter_seed: Option<u64>,
}

/// The part of [`Config`] the learning engine consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub store_timeout: Duration,
    pub profile_cache_ttl: Duration,
    pub recommendation_limit: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
            profile_cache_ttl: Duration::from_secs(DEFAULT_PROFILE_CACHE_TTL_SECS),
            recommendation_limit: MAX_RECOMMENDATIONS,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let port = env_parse::<u16>("PORT").unwrap_or(3000);

        let host = env_parse::<IpAddr>("HOST").unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let store_timeout = Duration::from_millis(
            env_parse::<u64>("STORE_TIMEOUT_MS").unwrap_or(DEFAULT_STORE_TIMEOUT_MS),
        );
        let profile_cache_ttl = Duration::from_secs(
            env_parse::<u64>("PROFILE_CACHE_TTL_SECS").unwrap_or(DEFAULT_PROFILE_CACHE_TTL_SECS),
        );
        let recommendation_limit = env_parse::<usize>("RECOMMENDATION_LIMIT")
            .unwrap_or(MAX_RECOMMENDATIONS)
            .clamp(1, MAX_RECOMMENDATIONS);

        Self {
            host,
            port,
            log_level,
            store_timeout,
            profile_cache_ttl,
            recommendation_limit,
            seed_demo_course: env_bool("SEED_DEMO_COURSE").unwrap_or(true),
            jitter_seed: env_parse::<u64>("JITTER_SEED"),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            store_timeout: self.store_timeout,
            profile_cache_ttl: self.profile_cache_ttl,
            recommendation_limit: self.recommendation_limit,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    let value = std::env::var(key).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}
