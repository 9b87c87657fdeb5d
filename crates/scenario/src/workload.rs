//! The forms-API scenario: one iteration walks a fresh identity through
//! registration, verification, onboarding, and a burst of form reads and
//! writes. Step failures are observed (already recorded by the client)
//! and logged; only cooperative cancellation stops an iteration early.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::{join_all, BoxFuture, FutureExt};
use loadtest_metrics::MetricsCollector;
use loadtest_runner::{DataStore, IterationContext, IterationError, Workload};
use rand::Rng;
use tracing::{debug, warn};

use crate::client::{ApiClient, REQUEST_TIMEOUT};
use crate::models::{CreateFormRequest, LoginRequest, RegisterRequest, TestUser, VerifyEmailRequest};

const PASSWORD: &str = "LoadTest@12345";
const FORMS_PER_ITERATION: usize = 3;
const ORGANIZATION_READS: usize = 5;
const FORM_LIST_READS: usize = 6;
const FORM_DETAIL_READS: usize = 6;

pub struct FormsWorkload {
    http: reqwest::Client,
    base_url: String,
    metrics: Arc<MetricsCollector>,
    store: Arc<dyn DataStore>,
}

impl FormsWorkload {
    pub fn new(
        base_url: &str,
        metrics: Arc<MetricsCollector>,
        store: Arc<dyn DataStore>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.to_string(),
            metrics,
            store,
        })
    }

    fn test_user(&self, email: &str, user_id: usize) -> TestUser {
        let stamp = Utc::now().timestamp_subsec_millis();
        TestUser {
            email: email.to_string(),
            password: PASSWORD.to_string(),
            first_name: format!("LoadUser{user_id}"),
            last_name: format!("Test{stamp}"),
            access_token: None,
            refresh_token: None,
            organization_id: None,
        }
    }

    /// Register the identity, falling back to login when the account
    /// already exists from an earlier run. Returns `None` when neither
    /// path yielded an access token.
    async fn authenticate(&self, client: &ApiClient, user: &mut TestUser) -> Option<()> {
        let registered = client
            .register(&RegisterRequest {
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                email: user.email.clone(),
                password: user.password.clone(),
            })
            .await;

        let register_ok = registered.success;
        let token = registered
            .value
            .and_then(|response| response.token)
            .filter(|_| register_ok);
        if let Some(token) = token {
            if user.adopt_tokens(token) {
                return Some(());
            }
        }
        if let Some(error) = registered.error {
            debug!(user = %user.email, error, "register failed, trying login");
        }

        let logged_in = client
            .login(&LoginRequest {
                email: user.email.clone(),
                password: user.password.clone(),
            })
            .await;
        if let Some(token) = logged_in.value.and_then(|response| response.token) {
            if user.adopt_tokens(token) {
                return Some(());
            }
        }
        warn!(user = %user.email, "both register and login failed");
        None
    }
}

async fn pause(cx: &IterationContext<'_>, duration: Duration) -> Result<(), IterationError> {
    tokio::select! {
        _ = tokio::time::sleep(duration) => Ok(()),
        _ = cx.cancel.cancelled() => Err(IterationError::Cancelled),
    }
}

fn jitter(min_ms: u64, max_ms: u64) -> Duration {
    let mut rng = rand::thread_rng();
    Duration::from_millis(rng.gen_range(min_ms..=max_ms))
}

#[async_trait]
impl Workload for FormsWorkload {
    fn identity(&self, user_id: usize, iteration: usize) -> String {
        let stamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        format!("test+loadtest.u{user_id}.i{iteration}.{stamp}@yopmail.com")
    }

    fn sweep_pattern(&self) -> Option<String> {
        Some(r"test\+loadtest\.u.*@yopmail\.com".to_string())
    }

    async fn run_iteration(&self, cx: &IterationContext<'_>) -> Result<(), IterationError> {
        let mut user = self.test_user(cx.identity, cx.user_id);
        let mut client = ApiClient::new(
            self.http.clone(),
            &self.base_url,
            cx.phase,
            Arc::clone(&self.metrics),
        );

        // Step 1: register (with login fallback).
        if self.authenticate(&client, &mut user).await.is_none() {
            return Ok(());
        }
        if let Some(token) = &user.access_token {
            client.set_auth_token(token);
        }
        cx.ensure_live()?;

        // Step 2: verify email, when the backing store exposes the token.
        pause(cx, Duration::from_millis(500)).await?;
        match self.store.verification_token(&user.email).await {
            Ok(Some(token)) => {
                client
                    .verify_email(&VerifyEmailRequest {
                        email: user.email.clone(),
                        token,
                    })
                    .await;
            }
            Ok(None) => {}
            Err(error) => debug!(user = %user.email, %error, "verification token lookup failed"),
        }
        cx.ensure_live()?;

        // Step 3: onboarding.
        let onboarding = client.auto_onboard().await;
        user.organization_id = onboarding
            .value
            .and_then(|response| response.organization)
            .and_then(|organization| organization.id);
        cx.ensure_live()?;

        // Step 4: create forms.
        let mut form_ids = Vec::with_capacity(FORMS_PER_ITERATION);
        for index in 0..FORMS_PER_ITERATION {
            let created = client
                .create_form(&CreateFormRequest {
                    name: format!("Test Form {} - {}", index + 1, Utc::now().format("%H%M%S")),
                    description: Some(format!("Load test form created at {}", Utc::now())),
                    tags: vec!["load-test".to_string(), "automated".to_string()],
                    status: "drafted".to_string(),
                })
                .await;
            if let Some(id) = created
                .value
                .and_then(|response| response.form)
                .and_then(|form| form.id)
            {
                form_ids.push(id);
            }
            pause(cx, jitter(100, 300)).await?;
        }
        cx.ensure_live()?;

        // Step 5: parallel organization reads and form list reads.
        let mut batch: Vec<BoxFuture<'_, ()>> = Vec::new();
        if let Some(organization_id) = user.organization_id.clone() {
            for _ in 0..ORGANIZATION_READS {
                let client = &client;
                let organization_id = organization_id.clone();
                batch.push(
                    async move {
                        client.get_organization(&organization_id).await;
                    }
                    .boxed(),
                );
            }
        }
        for _ in 0..FORM_LIST_READS {
            let client = &client;
            batch.push(
                async move {
                    client.get_forms().await;
                }
                .boxed(),
            );
        }
        join_all(batch).await;
        pause(cx, jitter(50, 150)).await?;

        // Step 6: form detail reads, cycling the created ids.
        if !form_ids.is_empty() {
            let mut details: Vec<BoxFuture<'_, ()>> = Vec::new();
            for index in 0..FORM_DETAIL_READS {
                let client = &client;
                let form_id = form_ids[index % form_ids.len()].clone();
                details.push(
                    async move {
                        client.get_form(&form_id).await;
                    }
                    .boxed(),
                );
            }
            join_all(details).await;
        }
        pause(cx, jitter(50, 150)).await?;

        // Step 7: stats.
        client.get_form_stats().await;

        // Step 8: drop authentication.
        client.clear_auth_token();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadtest_metrics::EndpointRules;
    use loadtest_runner::NoopStore;

    fn workload() -> FormsWorkload {
        FormsWorkload::new(
            "http://localhost:5000",
            Arc::new(MetricsCollector::new(EndpointRules::default_rules())),
            Arc::new(NoopStore),
        )
        .unwrap()
    }

    #[test]
    fn test_identity_embeds_user_and_iteration() {
        let workload = workload();
        let identity = workload.identity(7, 3);
        assert!(identity.starts_with("test+loadtest.u7.i3."));
        assert!(identity.ends_with("@yopmail.com"));
        // Two identities for the same slot never collide.
        assert_ne!(identity, workload.identity(7, 3));
    }

    #[test]
    fn test_sweep_pattern_matches_generated_identities() {
        let workload = workload();
        let pattern = regex::Regex::new(&workload.sweep_pattern().unwrap()).unwrap();
        assert!(pattern.is_match(&workload.identity(1, 0)));
        assert!(!pattern.is_match("ordinary.person@example.com"));
    }
}
