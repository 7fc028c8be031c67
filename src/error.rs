use reqwest::StatusCode;
use thiserror::Error;

// Startup configuration problems
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("upstream base URL is not configured")]
    MissingBaseUrl,

    #[error("invalid upstream base URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("at least one upstream API key is required")]
    NoUpstreamKeys,

    #[error("rate limit must allow at least one request per window")]
    ZeroQuota,

    #[error("rate limit window must be at least one second")]
    ZeroWindow,

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

// Failures of the upstream weather call.
// "Not found" is not an error, it is Ok(None) from the service.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request to weather API failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("weather API returned status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to parse weather API response: {0}")]
    Payload(#[from] serde_json::Error),
}
