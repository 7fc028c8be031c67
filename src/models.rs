use serde::{Deserialize, Serialize};

// Query string of GET /weather
#[derive(Deserialize, Debug, Default)]
pub struct WeatherQuery {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

// Body returned to our callers
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct WeatherResponse {
    pub description: String,
}

// The bits of the upstream payload we care about.
// Everything is optional: a missing field means "not found", not a parse error.
#[derive(Deserialize, Debug, Default)]
pub struct UpstreamPayload {
    #[serde(default)]
    pub weather: Option<Vec<UpstreamCondition>>,
}

#[derive(Deserialize, Debug, Default)]
pub struct UpstreamCondition {
    #[serde(default)]
    pub description: Option<String>,
}

impl UpstreamPayload {
    // First condition's description, if any
    pub fn description(self) -> Option<String> {
        self.weather?.into_iter().next()?.description
    }
}
