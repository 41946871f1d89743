//! Configuration for the conversion relay.
//!
//! All relay behaviour is controlled through [`ProxyConfig`], built once at
//! process start via its [`ProxyConfigBuilder`] and then shared read-only with
//! every request handler. The handler never consults the process environment
//! itself: whether the webhook is configured is a property of this value.
//!
//! # Example
//! ```rust
//! use scrptbl::ProxyConfig;
//!
//! let config = ProxyConfig::builder()
//!     .webhook_url("https://hooks.example.com/webhook/convert")
//!     .request_timeout_secs(30)
//!     .max_retries(1)
//!     .build()
//!     .unwrap();
//! assert!(config.is_configured());
//! ```

use crate::error::ProxyError;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

/// Environment variable holding the webhook URL.
pub const WEBHOOK_URL_ENV: &str = "N8N_WEBHOOK_URL";

/// Upper bound for [`ProxyConfig::max_retries`]: at most one retry.
pub const MAX_RETRIES_LIMIT: u32 = 1;

const DEFAULT_BIND: ([u8; 4], u16) = ([127, 0, 0, 1], 3000);

/// Configuration for the relay server.
#[derive(Clone)]
pub struct ProxyConfig {
    /// Destination webhook. `None` means "missing": the convert route fails
    /// with [`ProxyError::NotConfigured`] and never calls out.
    pub webhook_url: Option<Url>,

    /// Address the HTTP server listens on. Default: `127.0.0.1:3000`.
    pub bind_addr: SocketAddr,

    /// Timeout for the outbound webhook call in seconds. Default: `None`,
    /// which leaves the HTTP client's own default in place (no timeout).
    pub request_timeout_secs: Option<u64>,

    /// Retries after an outbound transport failure. Default: 0, at most 1.
    ///
    /// Only transport faults are retried. A response from the webhook, of
    /// any status, is final.
    pub max_retries: u32,

    /// Delay before the retry in milliseconds. Default: 500.
    pub retry_backoff_ms: u64,

    /// Largest accepted request body in bytes. Default: 20 MiB.
    pub max_upload_bytes: usize,

    /// Presentation of the upload page. Default: [`PageTheme::Sunset`].
    pub theme: PageTheme,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            bind_addr: SocketAddr::from(DEFAULT_BIND),
            request_timeout_secs: None,
            max_retries: 0,
            retry_backoff_ms: 500,
            max_upload_bytes: 20 * 1024 * 1024,
            theme: PageTheme::default(),
        }
    }
}

// The webhook URL may embed a secret path or token; only report presence.
impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field(
                "webhook_url",
                &self.webhook_url.as_ref().map(|_| "<configured>"),
            )
            .field("bind_addr", &self.bind_addr)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("theme", &self.theme)
            .finish()
    }
}

impl ProxyConfig {
    /// Create a new builder for `ProxyConfig`.
    pub fn builder() -> ProxyConfigBuilder {
        ProxyConfigBuilder {
            config: Self::default(),
            webhook_url: None,
        }
    }

    /// Build a config from the process environment, reading
    /// [`WEBHOOK_URL_ENV`] exactly once.
    pub fn from_env() -> Result<Self, ProxyError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ProxyError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();
        if let Some(url) = lookup(WEBHOOK_URL_ENV) {
            builder = builder.webhook_url(url);
        }
        builder.build()
    }

    /// Whether a destination webhook is configured.
    pub fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }
}

/// Builder for [`ProxyConfig`].
#[derive(Debug)]
pub struct ProxyConfigBuilder {
    config: ProxyConfig,
    webhook_url: Option<String>,
}

impl ProxyConfigBuilder {
    /// Set the webhook URL. An empty or blank string counts as not set.
    pub fn webhook_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.webhook_url = if url.trim().is_empty() {
            None
        } else {
            Some(url.trim().to_string())
        };
        self
    }

    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs.max(1));
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n.min(MAX_RETRIES_LIMIT);
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes.max(1024);
        self
    }

    pub fn theme(mut self, theme: PageTheme) -> Self {
        self.config.theme = theme;
        self
    }

    /// Build the configuration, validating the webhook URL.
    pub fn build(mut self) -> Result<ProxyConfig, ProxyError> {
        if let Some(raw) = self.webhook_url.take() {
            let url = Url::parse(&raw).map_err(|e| {
                ProxyError::InvalidConfig(format!("{WEBHOOK_URL_ENV} is not a valid URL: {e}"))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ProxyError::InvalidConfig(format!(
                    "{WEBHOOK_URL_ENV} must use http or https, got '{}'",
                    url.scheme()
                )));
            }
            self.config.webhook_url = Some(url);
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Visual variant of the upload page.
///
/// Both variants render the same form and honour the same upload contract;
/// only the decoration differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageTheme {
    /// Static warm gradient. (default)
    #[default]
    Sunset,
    /// Gradient with drifting mountain layers and twinkling stars.
    Mountains,
}

impl PageTheme {
    /// CSS class applied to the page body.
    pub fn body_class(self) -> &'static str {
        match self {
            PageTheme::Sunset => "theme-sunset",
            PageTheme::Mountains => "theme-mountains",
        }
    }

    /// Whether the theme draws the animated background layers.
    pub fn is_animated(self) -> bool {
        matches!(self, PageTheme::Mountains)
    }
}
