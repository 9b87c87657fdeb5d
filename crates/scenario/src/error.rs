use thiserror::Error;

const MAX_BODY_IN_MESSAGE: usize = 300;

/// Classification of one failed observation. Every variant renders the
/// human-readable message stored on the failed sample; none of them
/// escapes the worker boundary as an error.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The call exceeded the fixed per-request deadline.
    #[error("Request timeout")]
    Timeout,
    /// Transport-level failure, no response received.
    #[error("Network error: {0}")]
    Network(String),
    /// Non-2xx response.
    #[error("{}", protocol_message(.status, .body))]
    Protocol { status: u16, body: String },
    /// Anything else.
    #[error("Error: {0}")]
    Unexpected(String),
}

impl RequestError {
    pub(crate) fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            RequestError::Timeout
        } else if error.is_connect() || error.is_request() || error.is_body() {
            RequestError::Network(error.to_string())
        } else {
            RequestError::Unexpected(error.to_string())
        }
    }
}

/// `HTTP {status}: {body}` with the body capped, or `HTTP {status}
/// {reason}` when the server sent nothing usable.
fn protocol_message(status: &u16, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        let reason = reqwest::StatusCode::from_u16(*status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or("Unknown");
        return format!("HTTP {status} {reason}");
    }
    if body.len() > MAX_BODY_IN_MESSAGE {
        let cut: String = body.chars().take(MAX_BODY_IN_MESSAGE).collect();
        format!("HTTP {status}: {cut}...")
    } else {
        format!("HTTP {status}: {body}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message() {
        assert_eq!(RequestError::Timeout.to_string(), "Request timeout");
    }

    #[test]
    fn test_network_message() {
        let error = RequestError::Network("connection refused".into());
        assert_eq!(error.to_string(), "Network error: connection refused");
    }

    #[test]
    fn test_protocol_message_with_body() {
        let error = RequestError::Protocol {
            status: 422,
            body: "{\"error\":\"email taken\"}".into(),
        };
        assert_eq!(error.to_string(), "HTTP 422: {\"error\":\"email taken\"}");
    }

    #[test]
    fn test_protocol_message_truncates_long_body() {
        let error = RequestError::Protocol {
            status: 500,
            body: "x".repeat(400),
        };
        let message = error.to_string();
        assert!(message.starts_with("HTTP 500: "));
        assert!(message.ends_with("..."));
        assert_eq!(message.len(), "HTTP 500: ".len() + 300 + 3);
    }

    #[test]
    fn test_protocol_message_empty_body_uses_reason() {
        let error = RequestError::Protocol {
            status: 404,
            body: "  ".into(),
        };
        assert_eq!(error.to_string(), "HTTP 404 Not Found");
    }

    #[test]
    fn test_unexpected_message() {
        let error = RequestError::Unexpected("boom".into());
        assert_eq!(error.to_string(), "Error: boom");
    }
}
