//! Instrumented HTTP client: every call is timed, classified, and
//! recorded as exactly one observation. Callers get an `Outcome`, never
//! an `Err`, so a failed call can't abort a scenario step sequence.

use std::sync::Arc;
use std::time::Duration;

use loadtest_metrics::MetricsCollector;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Instant;

use crate::error::RequestError;
use crate::models::*;

/// Fixed per-call deadline, independent of (and much shorter than) any
/// phase deadline.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of one instrumented call. `value` is present only when the
/// response was a 2xx with a parseable body.
#[derive(Debug)]
pub struct Outcome<T> {
    pub value: Option<T>,
    pub success: bool,
    pub error: Option<String>,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    phase: String,
    metrics: Arc<MetricsCollector>,
    auth_token: Option<String>,
}

impl ApiClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        phase: &str,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            phase: phase.to_string(),
            metrics,
            auth_token: None,
        }
    }

    pub fn set_auth_token(&mut self, token: &str) {
        self.auth_token = Some(token.to_string());
    }

    pub fn clear_auth_token(&mut self) {
        self.auth_token = None;
    }

    pub async fn register(&self, request: &RegisterRequest) -> Outcome<AuthResponse> {
        self.execute(Method::POST, "/api/v1/auth/register", Some(json(request)))
            .await
    }

    pub async fn login(&self, request: &LoginRequest) -> Outcome<AuthResponse> {
        self.execute(Method::POST, "/api/v1/auth/login", Some(json(request)))
            .await
    }

    pub async fn verify_email(&self, request: &VerifyEmailRequest) -> Outcome<Value> {
        self.execute(
            Method::POST,
            "/api/v1/auth/email/verify",
            Some(json(request)),
        )
        .await
    }

    pub async fn auto_onboard(&self) -> Outcome<OnboardingResponse> {
        self.execute(Method::POST, "/api/v1/onboarding/auto", None)
            .await
    }

    pub async fn create_form(&self, request: &CreateFormRequest) -> Outcome<FormResponse> {
        self.execute(Method::POST, "/api/v1/forms", Some(json(request)))
            .await
    }

    pub async fn get_forms(&self) -> Outcome<FormsResponse> {
        self.execute(Method::GET, "/api/v1/forms", None).await
    }

    pub async fn get_form(&self, form_id: &str) -> Outcome<FormResponse> {
        self.execute(Method::GET, &format!("/api/v1/forms/{form_id}"), None)
            .await
    }

    pub async fn get_form_stats(&self) -> Outcome<Value> {
        self.execute(Method::GET, "/api/v1/forms/stats", None).await
    }

    pub async fn get_organization(&self, organization_id: &str) -> Outcome<Value> {
        self.execute(
            Method::GET,
            &format!("/api/v1/organizations/{organization_id}"),
            None,
        )
        .await
    }

    /// Issue one call, time it, and record exactly one sample under the
    /// client's phase. Raw (un-normalized) endpoints go into the sample;
    /// normalization happens at aggregation time.
    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Outcome<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut request = self.http.request(method.clone(), &url);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = &body {
            request = request.json(body);
        }

        let started = Instant::now();
        let outcome = match request.send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    let text = response.text().await.unwrap_or_default();
                    if text.is_empty() {
                        Ok((status.as_u16(), None))
                    } else {
                        match serde_json::from_str::<T>(&text) {
                            Ok(value) => Ok((status.as_u16(), Some(value))),
                            Err(error) => Err((
                                status.as_u16(),
                                RequestError::Unexpected(format!("parse response: {error}")),
                            )),
                        }
                    }
                } else {
                    let body = response.text().await.unwrap_or_default();
                    Err((
                        status.as_u16(),
                        RequestError::Protocol {
                            status: status.as_u16(),
                            body,
                        },
                    ))
                }
            }
            Err(error) => {
                let status = error
                    .status()
                    .map(|status| status.as_u16())
                    .unwrap_or_default();
                Err((status, RequestError::from_reqwest(error)))
            }
        };
        let latency_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok((status, value)) => {
                self.metrics.record_request(
                    &self.phase,
                    endpoint,
                    method.as_str(),
                    status,
                    latency_ms,
                    true,
                    None,
                );
                Outcome {
                    value,
                    success: true,
                    error: None,
                }
            }
            Err((status, error)) => {
                let message = error.to_string();
                self.metrics.record_request(
                    &self.phase,
                    endpoint,
                    method.as_str(),
                    status,
                    latency_ms,
                    false,
                    Some(message.clone()),
                );
                Outcome {
                    value: None,
                    success: false,
                    error: Some(message),
                }
            }
        }
    }
}

fn json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
