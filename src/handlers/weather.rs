use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use crate::metrics::REQUEST_TOTAL;
use crate::models::{WeatherQuery, WeatherResponse};
use crate::state::AppState;

pub const MISSING_PLACE_MESSAGE: &str = "City and country name are required.";
pub const UPSTREAM_FAILURE_MESSAGE: &str =
    "Error retrieving weather data from external service. Please try again later.";

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// GET /weather?city=..&country=..
// Only reached after the admission middleware let the request through.
pub async fn weather_handler(
    State(state): State<AppState>,
    Query(query): Query<WeatherQuery>,
) -> Response {
    REQUEST_TOTAL.inc();

    let (Some(city), Some(country)) = (non_blank(query.city), non_blank(query.country)) else {
        warn!("Invalid request: city or country name is missing");
        return (StatusCode::BAD_REQUEST, MISSING_PLACE_MESSAGE).into_response();
    };

    match state.weather.describe(&city, &country).await {
        Ok(Some(description)) => {
            info!(%city, %country, %description, "Weather retrieved");
            Json(WeatherResponse { description }).into_response()
        }
        Ok(None) => {
            info!(%city, %country, "Weather data not found");
            (
                StatusCode::NOT_FOUND,
                format!(
                    "Weather data not found for {}, {}. Please check the city and country name.",
                    city, country
                ),
            )
                .into_response()
        }
        // already logged by the weather service
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, UPSTREAM_FAILURE_MESSAGE).into_response(),
    }
}
