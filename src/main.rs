use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use weather_gateway::admission::{AdmissionController, CredentialRegistry};
use weather_gateway::app;
use weather_gateway::clock::SystemClock;
use weather_gateway::config::{Args, Settings};
use weather_gateway::key_ring::ApiKeyRing;
use weather_gateway::state::AppState;
use weather_gateway::weather::OpenWeatherClient;

#[tokio::main]
async fn main() -> Result<()> {
    // parse cli arguments
    let args = Args::parse();
    let settings = Settings::resolve(&args).context("Invalid configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_level)),
        )
        .init();

    let registry = CredentialRegistry::new(settings.credentials.iter().cloned());
    if registry.is_empty() {
        warn!("No API keys configured, every weather request will be rejected");
    }
    let admission = AdmissionController::new(registry, settings.policy);

    let client = reqwest::Client::builder()
        .timeout(settings.upstream_timeout)
        .build()
        .context("Failed to build HTTP client")?;
    let keys = ApiKeyRing::new(&settings.upstream_keys)?;
    let weather = OpenWeatherClient::new(client, &settings.base_url, keys)?;

    // creating shared state
    let state = AppState::new(admission, Arc::new(SystemClock), Arc::new(weather));

    let addr = format!("0.0.0.0:{}", settings.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(port = settings.port, "Gateway running");
    info!(upstream = %settings.base_url, "Forwarding weather lookups");
    info!(
        "Rate limit: {} requests per {} seconds",
        settings.policy.max_requests,
        settings.policy.window.as_secs()
    );

    axum::serve(listener, app(state))
        .await
        .context("Server error")?;
    Ok(())
}
