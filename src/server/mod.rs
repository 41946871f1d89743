//! HTTP surface: the upload page, its assets and the convert route.
//!
//! ```text
//! GET  /                 upload page (maud)
//! GET  /assets/{*file}   embedded static assets
//! GET  /api/convert      introspection line
//! POST /api/convert      relay the multipart upload to the webhook
//! ```
//!
//! Handlers share one [`AppState`], built from a [`ProxyConfig`] before the
//! listener is bound. No handler mutates it.

use std::future::Future;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::{PageTheme, ProxyConfig};
use crate::error::ProxyError;
use crate::relay::WebhookRelay;

pub mod asset;
pub mod handlers;
pub mod page;

/// Path of the convert route.
pub const CONVERT_PATH: &str = "/api/convert";

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    relay: Option<WebhookRelay>,
    theme: PageTheme,
    max_upload_bytes: usize,
}

impl AppState {
    /// Build the shared state. A missing webhook URL is not an error here;
    /// the convert route reports it per request.
    pub fn new(config: &ProxyConfig) -> Result<Self, ProxyError> {
        let relay = match WebhookRelay::from_config(config) {
            Ok(relay) => Some(relay),
            Err(ProxyError::NotConfigured) => None,
            Err(e) => return Err(e),
        };
        Ok(Self {
            inner: Arc::new(Inner {
                relay,
                theme: config.theme,
                max_upload_bytes: config.max_upload_bytes,
            }),
        })
    }

    /// The relay, or [`ProxyError::NotConfigured`].
    pub fn relay(&self) -> Result<&WebhookRelay, ProxyError> {
        self.inner.relay.as_ref().ok_or(ProxyError::NotConfigured)
    }

    pub fn is_configured(&self) -> bool {
        self.inner.relay.is_some()
    }

    pub fn theme(&self) -> PageTheme {
        self.inner.theme
    }

    /// Body limit applied to the convert route.
    pub fn max_upload_bytes(&self) -> usize {
        self.inner.max_upload_bytes
    }
}

/// Build the application router.
pub fn router(config: &ProxyConfig) -> Result<Router, ProxyError> {
    let state = AppState::new(config)?;

    let app = Router::new()
        .route("/", get(page::index))
        .route("/assets/{*file}", get(asset::static_handler))
        .route(
            CONVERT_PATH,
            get(handlers::convert_status).post(handlers::convert),
        )
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

/// Bind `config.bind_addr` and serve until `shutdown` resolves.
pub async fn serve<F>(config: &ProxyConfig, shutdown: F) -> Result<(), ProxyError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(config)?;

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .map_err(|e| ProxyError::Internal(format!("Failed to bind {}: {e}", config.bind_addr)))?;
    let addr = listener
        .local_addr()
        .map_err(|e| ProxyError::Internal(e.to_string()))?;

    info!(
        "Listening on http://{addr} (webhook {})",
        if config.is_configured() { "configured" } else { "missing" }
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ProxyError::Internal(format!("Server error: {e}")))
}
