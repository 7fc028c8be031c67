use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::rate_limit::{DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW, RateLimitPolicy};
use crate::weather::DEFAULT_BASE_URL;

// CLI argument structure
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "weather-gateway")]
#[command(about = "Rate-limited gateway in front of a weather API")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // JSON settings file (WeatherSettings / RateLimiting sections)
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    pub config: Option<PathBuf>,

    // Weather API base URL
    #[arg(short, long, env = "WEATHER_BASE_URL")]
    pub upstream_url: Option<String>,

    // Weather API keys, comma-separated, used round-robin
    #[arg(long, env = "WEATHER_API_KEYS")]
    pub upstream_keys: Option<String>,

    // Keys our own callers may present in X-Api-Key (comma-separated)
    #[arg(short = 'k', long, env = "GATEWAY_API_KEYS")]
    pub api_keys: Option<String>,

    // Rate limit max requests per window
    #[arg(long)]
    pub rate_limit: Option<usize>,

    // Rate limit window in seconds
    #[arg(long)]
    pub rate_window: Option<u64>,

    // Timeout for one weather API call, in seconds
    #[arg(long, default_value_t = 10)]
    pub upstream_timeout: u64,

    // Default log filter, RUST_LOG overrides it
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

// Settings file layout
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase")]
pub struct FileSettings {
    #[serde(default)]
    pub weather_settings: WeatherSection,
    #[serde(default)]
    pub rate_limiting: RateLimitSection,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase")]
pub struct WeatherSection {
    pub base_url: Option<String>,
    #[serde(default)]
    pub open_weather_map_api_keys: Vec<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase")]
pub struct RateLimitSection {
    #[serde(default)]
    pub valid_api_keys: Vec<String>,
    pub max_requests: Option<usize>,
    pub window_seconds: Option<u64>,
}

impl FileSettings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Fully resolved startup configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub base_url: String,
    pub upstream_keys: Vec<String>,
    pub credentials: Vec<String>,
    pub policy: RateLimitPolicy,
    pub upstream_timeout: Duration,
    pub log_level: String,
}

impl Settings {
    // Merge CLI/env over the settings file, then validate
    pub fn resolve(args: &Args) -> Result<Self, ConfigError> {
        let file = match &args.config {
            Some(path) => FileSettings::load(path)?,
            None => FileSettings::default(),
        };

        let base_url = args
            .upstream_url
            .clone()
            .or(file.weather_settings.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if base_url.trim().is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }

        let upstream_keys = match &args.upstream_keys {
            Some(list) => split_list(list),
            None => clean(file.weather_settings.open_weather_map_api_keys),
        };
        if upstream_keys.is_empty() {
            return Err(ConfigError::NoUpstreamKeys);
        }

        // credentials from both sources are accepted
        let mut credentials = clean(file.rate_limiting.valid_api_keys);
        if let Some(list) = &args.api_keys {
            for key in split_list(list) {
                if !credentials.contains(&key) {
                    credentials.push(key);
                }
            }
        }

        let max_requests = args
            .rate_limit
            .or(file.rate_limiting.max_requests)
            .unwrap_or(DEFAULT_MAX_REQUESTS);
        if max_requests == 0 {
            return Err(ConfigError::ZeroQuota);
        }

        let window = args
            .rate_window
            .or(file.rate_limiting.window_seconds)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_WINDOW);
        if window.as_secs() == 0 {
            return Err(ConfigError::ZeroWindow);
        }

        Ok(Self {
            port: args.port,
            base_url,
            upstream_keys,
            credentials,
            policy: RateLimitPolicy::new(max_requests, window),
            upstream_timeout: Duration::from_secs(args.upstream_timeout),
            log_level: args.log_level.clone(),
        })
    }
}

// "a, b,,c" -> ["a", "b", "c"]
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn clean(list: Vec<String>) -> Vec<String> {
    list.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
