use lazy_static::lazy_static;
use prometheus::{
    Counter, Encoder, Gauge, Histogram, IntCounterVec, TextEncoder, register_counter,
    register_gauge, register_histogram, register_int_counter_vec,
};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("gateway_requests_total", "Total number of weather requests")
            .expect("register gateway_requests_total");
    pub static ref ADMISSION_DECISIONS: IntCounterVec = register_int_counter_vec!(
        "gateway_admission_total",
        "Admission decisions by outcome",
        &["decision"]
    )
    .expect("register gateway_admission_total");
    pub static ref UPSTREAM_LATENCY: Histogram = register_histogram!(
        "gateway_upstream_latency_seconds",
        "Weather API latency in seconds"
    )
    .expect("register gateway_upstream_latency_seconds");
    pub static ref UPSTREAM_FAILURES: Counter = register_counter!(
        "gateway_upstream_failures_total",
        "Weather API calls that failed"
    )
    .expect("register gateway_upstream_failures_total");
    pub static ref TRACKED_CREDENTIALS: Gauge = register_gauge!(
        "gateway_tracked_credentials",
        "Credentials with a request history"
    )
    .expect("register gateway_tracked_credentials");
}

// Render the default registry in Prometheus text format
pub fn gather() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gathered_text_contains_gateway_metrics() {
        REQUEST_TOTAL.inc();
        ADMISSION_DECISIONS.with_label_values(&["admitted"]).inc();

        let text = gather().unwrap();
        assert!(text.contains("gateway_requests_total"));
        assert!(text.contains("gateway_admission_total{decision=\"admitted\"}"));
    }
}
