use std::sync::Arc;

use crate::admission::AdmissionController;
use crate::clock::Clock;
use crate::weather::WeatherService;

// app's shared state, built once in main (or by a test)
#[derive(Clone)]
pub struct AppState {
    pub admission: Arc<AdmissionController>,
    pub clock: Arc<dyn Clock>,
    pub weather: Arc<dyn WeatherService>,
}

impl AppState {
    pub fn new(
        admission: AdmissionController,
        clock: Arc<dyn Clock>,
        weather: Arc<dyn WeatherService>,
    ) -> Self {
        Self {
            admission: Arc::new(admission),
            clock,
            weather,
        }
    }
}
