//! Outbound relay: forward one upload to the webhook and hand back its answer.
//!
//! The relay does not interpret what the webhook says. Recognised text
//! and "business" errors reported by the webhook look the same here; both are
//! returned as a [`RelayedResponse`] and written back to the browser verbatim.
//! Only faults in reaching the webhook at all become a [`ProxyError`].
//!
//! ## Failure contract
//!
//! | Outcome | Response |
//! |---------|----------|
//! | webhook answered 2xx | `200`, webhook body |
//! | webhook answered non-2xx | webhook status, webhook body |
//! | connect / send / body-read fault | `502` [`ProxyError::UpstreamUnavailable`] |
//! | configured timeout elapsed | `504` [`ProxyError::UpstreamTimeout`] |
//!
//! A fault before the webhook answers is retried at most
//! [`crate::config::MAX_RETRIES_LIMIT`] times, after `retry_backoff_ms`. Once response headers arrive nothing is
//! retried, including a failed body read.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use reqwest::Url;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::ProxyConfig;
use crate::error::{ProxyError, TEXT_PLAIN_UTF8};
use crate::upload::UploadForm;

/// What the webhook answered: its status and its body read as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayedResponse {
    pub upstream_status: StatusCode,
    pub body: String,
}

impl RelayedResponse {
    /// Status the relay answers with: `200` when the webhook reported
    /// success, otherwise the webhook's own status.
    pub fn status(&self) -> StatusCode {
        if self.upstream_status.is_success() {
            StatusCode::OK
        } else {
            self.upstream_status
        }
    }
}

impl IntoResponse for RelayedResponse {
    fn into_response(self) -> Response {
        (
            self.status(),
            [(header::CONTENT_TYPE, TEXT_PLAIN_UTF8)],
            self.body,
        )
            .into_response()
    }
}

/// Forwards uploads to one configured webhook.
#[derive(Debug, Clone)]
pub struct WebhookRelay {
    client: reqwest::Client,
    url: Url,
    timeout_secs: Option<u64>,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl WebhookRelay {
    /// Create a relay for the configured webhook.
    ///
    /// Fails with [`ProxyError::NotConfigured`] when no webhook is set.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ProxyError> {
        let url = config.webhook_url.clone().ok_or(ProxyError::NotConfigured)?;

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| ProxyError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url,
            timeout_secs: config.request_timeout_secs,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
        })
    }

    /// Forward `form` to the webhook with a single POST (plus at most one
    /// retry on a transport fault) and read back its status and text body.
    ///
    /// No headers are added beyond the multipart `Content-Type` that the
    /// client computes for the new body.
    pub async fn forward(&self, form: &UploadForm) -> Result<RelayedResponse, ProxyError> {
        let start = Instant::now();
        info!(
            "Forwarding upload: {} parts, {} bytes",
            form.len(),
            form.payload_len()
        );

        let mut last_err: Option<ProxyError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "Webhook retry {}/{} after {}ms",
                    attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            // A multipart body is consumed by send(), so each attempt
            // encodes its own.
            let body = form.to_reqwest_form();

            match self.send_once(body).await {
                Ok(response) => {
                    let upstream_status = response.status();
                    // The webhook has the upload by now; a failed body read
                    // is reported, never retried.
                    let body = response.text().await.map_err(|e| {
                        warn!("Reading webhook response failed: {}", e.without_url());
                        ProxyError::UpstreamUnavailable {
                            reason: "response body could not be read".into(),
                        }
                    })?;
                    debug!(
                        "Webhook answered {} ({} bytes) in {:?}",
                        upstream_status,
                        body.len(),
                        start.elapsed()
                    );
                    return Ok(RelayedResponse {
                        upstream_status,
                        body,
                    });
                }
                Err(e) => {
                    warn!("Webhook attempt {} failed: {}", attempt + 1, e);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| ProxyError::Internal("no attempt was made".into())))
    }

    async fn send_once(
        &self,
        body: reqwest::multipart::Form,
    ) -> Result<reqwest::Response, ProxyError> {
        self.client
            .post(self.url.clone())
            .multipart(body)
            .send()
            .await
            .map_err(|e| ProxyError::from_transport(e, self.timeout_secs))
    }
}
