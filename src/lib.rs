//! # scrptbl
//!
//! Upload a photo of handwriting, get text back.
//!
//! The recognition itself happens elsewhere: an external webhook accepts a
//! multipart upload and answers with plain text. This crate is everything
//! around it: the upload page, a relay route that forwards the upload to the
//! webhook and hands its answer back unchanged, and a client that speaks the
//! same contract from Rust.
//!
//! ## Request Flow
//!
//! ```text
//! browser / UploadPage
//!  │  POST /api/convert   multipart: data (image), filename, mime
//!  ▼
//! relay ── missing webhook URL ──▶ 500 "Error: N8N_WEBHOOK_URL …"
//!  │
//!  │  POST <webhook>      same parts, fresh boundary
//!  ▼
//! webhook ──▶ status + text body ──▶ relay ──▶ 200 / webhook status, same body
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scrptbl::{server, ProxyConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads N8N_WEBHOOK_URL once; the route reports "env:missing" without it.
//!     let config = ProxyConfig::from_env()?;
//!     server::serve(&config, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `scrptbl` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod error;
pub mod relay;
pub mod server;
pub mod upload;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::{
    ConversionResult, ConvertTransport, HttpTransport, SelectedImage, TextDownload, UploadPage,
};
pub use config::{PageTheme, ProxyConfig, ProxyConfigBuilder};
pub use error::ProxyError;
pub use relay::{RelayedResponse, WebhookRelay};
pub use upload::{FormPart, UploadForm};
