//! Error types for the scrptbl relay.
//!
//! [`ProxyError`] covers every failure the relay can detect locally: the
//! missing webhook configuration, an unreadable upload, and an outbound
//! transport fault. Anything the webhook itself reports (a non-success status
//! or an error string in its body) is *not* an error here; it is relayed
//! verbatim by [`crate::relay::RelayedResponse`].
//!
//! Every variant renders as a plain-text body that starts with
//! [`ERROR_PREFIX`], so browser clients that still classify results by prefix
//! keep working.

use axum::extract::multipart::MultipartError;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Literal marker that starts every locally synthesised error message.
pub const ERROR_PREFIX: &str = "Error:";

/// Content type of every response the convert route produces.
pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

/// All errors returned by the relay and its HTTP handlers.
#[derive(Debug, Error)]
pub enum ProxyError {
    // ── Configuration ─────────────────────────────────────────────────────
    /// No webhook URL was configured; no outbound call is attempted.
    #[error("Error: N8N_WEBHOOK_URL environment variable is not configured")]
    NotConfigured,

    /// Builder validation failed.
    #[error("Error: invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Inbound request ───────────────────────────────────────────────────
    /// The incoming body could not be read as `multipart/form-data`.
    #[error("Error: invalid upload form: {reason}")]
    InvalidForm { reason: String },

    /// The upload exceeded the configured body limit.
    #[error("Error: upload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },

    // ── Outbound call ─────────────────────────────────────────────────────
    /// The webhook could not be reached or its body could not be read.
    #[error("Error: conversion service unavailable: {reason}")]
    UpstreamUnavailable { reason: String },

    /// The webhook did not answer within the configured timeout.
    #[error("Error: conversion service timed out after {secs}s")]
    UpstreamTimeout { secs: u64 },

    // ── Catch-all ─────────────────────────────────────────────────────────
    #[error("Error: internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// HTTP status the error is surfaced with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::InvalidForm { .. } => StatusCode::BAD_REQUEST,
            ProxyError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Map a `reqwest` transport error from the outbound call.
    ///
    /// The error's URL is stripped so the webhook address never ends up in a
    /// response body.
    /// Map an error raised while reading the inbound multipart body.
    ///
    /// The body limit surfaces here as a 413 `MultipartError`; everything
    /// else is a malformed form.
    pub(crate) fn from_multipart(err: MultipartError, limit: usize) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ProxyError::PayloadTooLarge { limit }
        } else {
            ProxyError::InvalidForm {
                reason: err.body_text(),
            }
        }
    }

    pub(crate) fn from_transport(err: reqwest::Error, timeout_secs: Option<u64>) -> Self {
        if err.is_timeout() {
            return ProxyError::UpstreamTimeout {
                secs: timeout_secs.unwrap_or_default(),
            };
        }
        let reason = if err.is_connect() {
            "connection failed".to_string()
        } else {
            err.without_url().to_string()
        };
        ProxyError::UpstreamUnavailable { reason }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            [(header::CONTENT_TYPE, TEXT_PLAIN_UTF8)],
            self.to_string(),
        )
            .into_response()
    }
}
