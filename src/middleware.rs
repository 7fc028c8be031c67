use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header::RETRY_AFTER},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use crate::admission::{Decision, fingerprint};
use crate::metrics::{ADMISSION_DECISIONS, TRACKED_CREDENTIALS};
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

pub const MISSING_KEY_MESSAGE: &str =
    "API Key is missing. Please provide a valid 'X-Api-Key' header.";
pub const INVALID_KEY_MESSAGE: &str = "Invalid API Key.";
pub const RATE_LIMITED_MESSAGE: &str = "Hourly rate limit exceeded. Please try again later.";

// Header names are case-insensitive; HeaderMap stores them lowercased.
// A value that isn't visible ASCII counts as missing.
fn credential(headers: &HeaderMap) -> &str {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

// Admission check in front of the weather route
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let key = credential(request.headers());
    let now = state.clock.now();
    let decision = state.admission.admit(key, now);

    ADMISSION_DECISIONS
        .with_label_values(&[decision.label()])
        .inc();
    TRACKED_CREDENTIALS.set(state.admission.tracked_credentials() as f64);

    match decision {
        Decision::Admitted { count } => {
            info!(
                key = %fingerprint(key),
                count,
                max = state.admission.policy().max_requests,
                "Request admitted"
            );
            next.run(request).await
        }
        rejected => {
            if !key.is_empty() {
                warn!(key = %fingerprint(key), decision = rejected.label(), "Request rejected");
            } else {
                warn!("API Key missing from request");
            }
            rejection(rejected)
        }
    }
}

// Response for a decision that doesn't pass through
pub fn rejection(decision: Decision) -> Response {
    match decision {
        Decision::Unauthenticated => (StatusCode::UNAUTHORIZED, MISSING_KEY_MESSAGE).into_response(),
        Decision::Forbidden => (StatusCode::FORBIDDEN, INVALID_KEY_MESSAGE).into_response(),
        Decision::RateLimited { retry_after_secs } => {
            let retry_after = HeaderValue::from(retry_after_secs);
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(RETRY_AFTER, retry_after)],
                RATE_LIMITED_MESSAGE,
            )
                .into_response()
        }
        // callers only pass rejections; treat a stray Admitted as a no-content pass
        Decision::Admitted { .. } => StatusCode::NO_CONTENT.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderName;

    #[test]
    fn reads_header_in_any_case() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_bytes(b"X-API-KEY").unwrap(),
            HeaderValue::from_static("abc"),
        );
        assert_eq!(credential(&headers), "abc");
    }

    #[test]
    fn missing_or_garbled_header_is_empty() {
        let headers = HeaderMap::new();
        assert_eq!(credential(&headers), "");

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_bytes(b"\xffkey").unwrap());
        assert_eq!(credential(&headers), "");
    }

    #[test]
    fn rate_limited_response_has_retry_after() {
        let res = rejection(Decision::RateLimited {
            retry_after_secs: 3600,
        });
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(res.headers()[RETRY_AFTER], "3600");
    }

    #[test]
    fn auth_failures_map_to_401_and_403() {
        assert_eq!(
            rejection(Decision::Unauthenticated).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(rejection(Decision::Forbidden).status(), StatusCode::FORBIDDEN);
    }
}
