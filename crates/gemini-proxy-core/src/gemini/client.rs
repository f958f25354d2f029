//! Generation client: one-shot and streaming calls to the upstream model.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::error::GenerationError;
use super::extract::extract_texts;
use super::parser::{fragments, FragmentStream};
use super::payload::{endpoint_for, streaming_url, GenerateContentRequest};
use super::transport::{ReqwestTransport, Transport, TransportRequest};
use crate::config::GeminiConfig;
use crate::domain::Message;

/// Most of a rejected stream's body kept for the error message.
const MAX_ERROR_BODY: usize = 8 * 1024;

/// Backoff for transient failures of the one-shot call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// `min(base * 2^attempt, max)`, where `attempt` counts from 0.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1_u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// What the conversation orchestrator needs from a model backend.
pub trait Generator: Send + Sync + 'static {
    /// Full reply text for `history` (chronological, current prompt last).
    fn generate(
        &self,
        model: &str,
        history: &[Message],
    ) -> impl Future<Output = Result<String, GenerationError>> + Send;

    /// Reply fragments as the upstream produces them.
    fn stream_generate(
        &self,
        model: &str,
        history: &[Message],
    ) -> impl Future<Output = Result<FragmentStream, GenerationError>> + Send;

    fn is_configured(&self) -> bool;
}

/// [`Generator`] speaking the `generateContent` protocol over a [`Transport`].
#[derive(Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("url", &self.config.url)
            .field("api_key", &self.config.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.config.timeout)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Client over a fresh `reqwest` connection pool.
    pub fn new(config: GeminiConfig) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::default()))
    }

    pub fn with_transport(config: GeminiConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    fn base_url(&self) -> Result<&str, GenerationError> {
        self.config
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| GenerationError::Configuration("GEMINI_URL is not configured".into()))
    }

    fn build_request(
        &self,
        model: &str,
        history: &[Message],
        streaming: bool,
    ) -> Result<TransportRequest, GenerationError> {
        let endpoint = endpoint_for(self.base_url()?, model);
        let body_model = (!endpoint.model_in_path).then_some(model);
        let body = serde_json::to_value(GenerateContentRequest::from_history(history, body_model))
            .map_err(|e| GenerationError::Configuration(format!("could not encode request: {e}")))?;

        let mut headers = vec![("content-type".to_owned(), "application/json".to_owned())];
        if let Some(key) = self.config.api_key.as_deref() {
            headers.push(("x-goog-api-key".to_owned(), key.to_owned()));
        }

        Ok(if streaming {
            headers.push(("accept".to_owned(), "text/event-stream".to_owned()));
            TransportRequest {
                url: streaming_url(&endpoint.url),
                headers,
                body,
                timeout: None,
            }
        } else {
            TransportRequest {
                url: endpoint.url,
                headers,
                body,
                timeout: Some(self.config.timeout),
            }
        })
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

impl Generator for GeminiClient {
    /// Attempts and backoff sleeps share one budget of `timeout`. Each attempt
    /// gets whatever is left, so an attempt that times out leaves nothing for
    /// a retry; only fast failures (refused, reset, DNS) are retried.
    async fn generate(&self, model: &str, history: &[Message]) -> Result<String, GenerationError> {
        let req = self.build_request(model, history, false)?;
        let retry = self.config.retry;
        let budget = self.config.timeout;
        let started = Instant::now();

        let mut attempt = 0;
        let resp = loop {
            let attempt_req = TransportRequest {
                timeout: Some(budget.saturating_sub(started.elapsed())),
                ..req.clone()
            };
            match self.transport.post_json(attempt_req).await {
                Ok(resp) => break resp,
                Err(e) if e.is_transient() && attempt + 1 < retry.max_attempts => {
                    let delay = retry.delay_for_attempt(attempt);
                    if delay >= budget.saturating_sub(started.elapsed()) {
                        warn!(attempt, error = %e, "no time left to retry generation request");
                        return Err(e.into());
                    }
                    attempt += 1;
                    warn!(
                        attempt,
                        max_attempts = retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "generation request failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        };

        if !is_success(resp.status) {
            return Err(GenerationError::rejected(resp.status, resp.body));
        }

        let doc: Value = serde_json::from_str(&resp.body)
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
        let texts: Vec<String> = match &doc {
            Value::Array(items) => items.iter().flat_map(extract_texts).collect(),
            other => extract_texts(other),
        };
        debug!(model, pieces = texts.len(), "generation complete");
        Ok(texts.concat())
    }

    async fn stream_generate(
        &self,
        model: &str,
        history: &[Message],
    ) -> Result<FragmentStream, GenerationError> {
        let req = self.build_request(model, history, true)?;
        let resp = self.transport.post_lines(req).await?;
        if !is_success(resp.status) {
            let status = resp.status;
            let body = resp.collect_body(MAX_ERROR_BODY, self.config.timeout).await;
            return Err(GenerationError::rejected(status, body));
        }
        debug!(model, "generation stream open");
        Ok(fragments(resp.lines))
    }

    fn is_configured(&self) -> bool {
        self.base_url().is_ok()
    }
}
