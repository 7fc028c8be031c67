use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::{ConfigError, UpstreamError};
use crate::key_ring::ApiKeyRing;
use crate::metrics::{UPSTREAM_FAILURES, UPSTREAM_LATENCY};
use crate::models::UpstreamPayload;

pub const DEFAULT_BASE_URL: &str = "http://api.openweathermap.org/data/2.5/";

/// Looks up a short weather description for a place.
///
/// `Ok(None)` means the upstream had nothing for that place; `Err` means
/// the upstream itself could not be used. The handler answers 404 and 500
/// respectively.
#[async_trait]
pub trait WeatherService: Send + Sync {
    async fn describe(&self, city: &str, country: &str) -> Result<Option<String>, UpstreamError>;
}

// OpenWeatherMap-style "current weather" API
pub struct OpenWeatherClient {
    client: reqwest::Client,
    endpoint: Url,
    keys: ApiKeyRing,
}

impl OpenWeatherClient {
    pub fn new(client: reqwest::Client, base_url: &str, keys: ApiKeyRing) -> Result<Self, ConfigError> {
        let base_url = base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }

        // join() drops the last path segment unless the base ends in '/'
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let endpoint = Url::parse(&normalized)
            .and_then(|base| base.join("weather"))
            .map_err(|e| ConfigError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: e.to_string(),
            })?;

        info!(
            endpoint = %endpoint,
            upstream_keys = keys.len(),
            "Weather client initialized"
        );

        Ok(Self {
            client,
            endpoint,
            keys,
        })
    }

    fn request_url(&self, city: &str, country: &str, api_key: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("q", &format!("{},{}", city, country))
            .append_pair("appid", api_key);
        url
    }

    async fn fetch(&self, city: &str, country: &str) -> Result<Option<String>, UpstreamError> {
        let url = self.request_url(city, country, self.keys.next());
        // the URL carries the upstream key, keep it out of the logs
        debug!(city, country, "Calling weather API");

        let res = self.client.get(url).send().await?;
        let status = res.status();

        if status == StatusCode::NOT_FOUND {
            warn!(city, country, "Weather API returned 404");
            return Ok(None);
        }

        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(UpstreamError::Status { status, body });
        }

        let body = res.text().await?;
        debug!(city, country, raw = %body, "Weather API response");

        let payload: UpstreamPayload = serde_json::from_str(&body)?;
        let description = payload.description();
        if description.is_none() {
            warn!(city, country, "'description' field missing from weather API response");
        }
        Ok(description)
    }
}

#[async_trait]
impl WeatherService for OpenWeatherClient {
    async fn describe(&self, city: &str, country: &str) -> Result<Option<String>, UpstreamError> {
        let start = Instant::now();
        let result = self.fetch(city, country).await;
        UPSTREAM_LATENCY.observe(start.elapsed().as_secs_f64());

        if let Err(e) = &result {
            UPSTREAM_FAILURES.inc();
            error!(city, country, error = %e, "Weather API call failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, keys: &[&str]) -> OpenWeatherClient {
        OpenWeatherClient::new(
            reqwest::Client::new(),
            &format!("{}/data/2.5", server.uri()),
            ApiKeyRing::new(keys.iter().copied()).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn returns_first_description() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"weather":[{"description":"clear sky"}]}"#),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, &["k1"]);
        let result = client.describe("test-city", "us").await.unwrap();
        assert_eq!(result.as_deref(), Some("clear sky"));
    }

    #[tokio::test]
    async fn sends_place_and_configured_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", "any-city,any-country"))
            .and(query_param("appid", "first-key"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"weather":[{"description":"sunny"}]}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, &["first-key", "second-key"]);
        let result = client.describe("any-city", "any-country").await.unwrap();
        assert_eq!(result.as_deref(), Some("sunny"));
    }

    #[tokio::test]
    async fn rotates_upstream_keys() {
        let server = MockServer::start().await;
        for key in ["k1", "k2"] {
            Mock::given(method("GET"))
                .and(query_param("appid", key))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_string(format!(r#"{{"weather":[{{"description":"{key}"}}]}}"#)),
                )
                .mount(&server)
                .await;
        }

        let client = client_for(&server, &["k1", "k2"]);
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(client.describe("c", "x").await.unwrap().unwrap());
        }
        assert_eq!(seen, ["k1", "k2", "k1", "k2"]);
    }

    #[tokio::test]
    async fn not_found_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server, &["k"]);
        assert_eq!(client.describe("nowhere", "us").await.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_description_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"weather":[{"main":"Clouds"}]}"#),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, &["k"]);
        assert_eq!(client.describe("c", "us").await.unwrap(), None);
    }

    #[tokio::test]
    async fn malformed_json_is_an_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{ This is invalid JSON }"))
            .mount(&server)
            .await;

        let client = client_for(&server, &["k"]);
        let err = client.describe("c", "us").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Payload(_)));
    }

    #[tokio::test]
    async fn server_error_is_an_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let client = client_for(&server, &["k"]);
        match client.describe("c", "us").await {
            Err(UpstreamError::Status { status, body }) => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(body, "bad key");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_upstream_is_a_transport_failure() {
        // nothing listens on port 9 of localhost in the test environment
        let client = OpenWeatherClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/",
            ApiKeyRing::new(["k"]).unwrap(),
        )
        .unwrap();
        let err = client.describe("c", "us").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Transport(_)));
    }

    #[test]
    fn base_url_is_required_and_validated() {
        let keys = || ApiKeyRing::new(["k"]).unwrap();
        assert!(matches!(
            OpenWeatherClient::new(reqwest::Client::new(), "  ", keys()),
            Err(ConfigError::MissingBaseUrl)
        ));
        assert!(matches!(
            OpenWeatherClient::new(reqwest::Client::new(), "not a url", keys()),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn builds_url_under_base_path() {
        let client = OpenWeatherClient::new(
            reqwest::Client::new(),
            DEFAULT_BASE_URL,
            ApiKeyRing::new(["abc"]).unwrap(),
        )
        .unwrap();
        let url = client.request_url("London", "uk", "abc");
        assert_eq!(
            url.as_str(),
            "http://api.openweathermap.org/data/2.5/weather?q=London%2Cuk&appid=abc"
        );
    }
}
