use std::time::Duration;

use crate::error::{AppError, Result};
use crate::spotify::RetryPolicy;

pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_CONCURRENCY: usize = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub spotify_client_id: String,
    pub spotify_client_secret: String,
    pub spotify_api_url: String,
    pub spotify_token_url: String,
    pub bind_addr: String,
    pub enrich_concurrency: usize,
    pub retry: RetryPolicy,
}

impl Config {
    /// Build a config with default endpoints and tuning for the given credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            spotify_client_id: client_id.into(),
            spotify_client_secret: client_secret.into(),
            spotify_api_url: DEFAULT_API_URL.to_string(),
            spotify_token_url: DEFAULT_TOKEN_URL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            enrich_concurrency: DEFAULT_CONCURRENCY,
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let spotify_client_id = std::env::var("SPOTIFY_CLIENT_ID")
            .map_err(|_| AppError::Config("SPOTIFY_CLIENT_ID not set".into()))?;

        let spotify_client_secret = std::env::var("SPOTIFY_CLIENT_SECRET")
            .map_err(|_| AppError::Config("SPOTIFY_CLIENT_SECRET not set".into()))?;

        let mut config = Self::new(spotify_client_id, spotify_client_secret);

        if let Ok(url) = std::env::var("SPOTIFY_API_URL") {
            config.spotify_api_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(url) = std::env::var("SPOTIFY_TOKEN_URL") {
            config.spotify_token_url = url;
        }
        if let Ok(addr) = std::env::var("BIND_ADDR") {
            config.bind_addr = addr;
        }

        config.enrich_concurrency = parse_var("ENRICH_CONCURRENCY", DEFAULT_CONCURRENCY)?;
        config.retry = RetryPolicy::new(
            parse_var("RETRY_MAX_ATTEMPTS", config.retry.max_attempts)?,
            Duration::from_millis(parse_var(
                "RETRY_BASE_DELAY_MS",
                config.retry.base_delay.as_millis() as u64,
            )?),
        );

        Ok(config)
    }

    pub fn get_missing_config(&self) -> Vec<String> {
        let mut missing = Vec::new();

        if self.spotify_client_id.is_empty() {
            missing.push("SPOTIFY_CLIENT_ID".to_string());
        }
        if self.spotify_client_secret.is_empty() {
            missing.push("SPOTIFY_CLIENT_SECRET".to_string());
        }

        missing
    }

    pub fn validate_spotify_config(&self) -> bool {
        self.get_missing_config().is_empty()
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} has an invalid value: {}", name, raw))),
        Err(_) => Ok(default),
    }
}
