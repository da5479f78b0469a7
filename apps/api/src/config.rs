use std::str::FromStr;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Every variable has a default; only malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Lifetime of a cached search result.
    pub cache_ttl_secs: u64,
    /// Interval of the background cache and job sweep.
    pub cache_sweep_secs: u64,
    /// How long a finished job stays pollable.
    pub job_retention_secs: u64,
    /// Combination cap applied when a request does not carry its own.
    pub combination_cap: usize,
    /// Maximum number of candidates scored concurrently.
    pub enrich_concurrency: usize,
    /// Base URL of the external scoring service. `None` selects the
    /// in-process reference scorer.
    pub scoring_service_url: Option<String>,
}

pub const DEFAULT_COMBINATION_CAP: usize = 150_000;

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            rust_log: "info".to_string(),
            cache_ttl_secs: 3600,
            cache_sweep_secs: 300,
            job_retention_secs: 3600,
            combination_cap: DEFAULT_COMBINATION_CAP,
            enrich_concurrency: 8,
            scoring_service_url: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = Config::default();
        let enrich_concurrency: usize =
            env_or("ENRICH_CONCURRENCY", defaults.enrich_concurrency)?;

        Ok(Config {
            port: env_or("PORT", defaults.port)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or(defaults.rust_log),
            cache_ttl_secs: env_or("CACHE_TTL_SECS", defaults.cache_ttl_secs)?,
            cache_sweep_secs: env_or("CACHE_SWEEP_SECS", defaults.cache_sweep_secs)?,
            job_retention_secs: env_or("JOB_RETENTION_SECS", defaults.job_retention_secs)?,
            combination_cap: env_or("COMBINATION_CAP", defaults.combination_cap)?,
            enrich_concurrency: enrich_concurrency.max(1),
            scoring_service_url: std::env::var("SCORING_SERVICE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
        })
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}
