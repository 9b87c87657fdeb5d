use chrono::{DateTime, Utc};

/// One completed network call, recorded exactly once. Never mutated after
/// creation; ownership passes to the collector on recording.
#[derive(Debug, Clone)]
pub struct RequestSample {
    pub phase: String,
    pub endpoint: String,
    pub method: String,
    /// HTTP status code, or 0 when no response was received.
    pub status_code: u16,
    pub latency_ms: u64,
    pub is_success: bool,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl RequestSample {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        phase: &str,
        endpoint: &str,
        method: &str,
        status_code: u16,
        latency_ms: u64,
        is_success: bool,
        error_message: Option<String>,
    ) -> Self {
        Self {
            phase: phase.to_string(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
            status_code,
            latency_ms,
            is_success,
            error_message,
            timestamp: Utc::now(),
        }
    }
}
