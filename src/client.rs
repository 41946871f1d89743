//! Client side of the conversion contract.
//!
//! [`UploadPage`] models the upload page's state: at most one selected image,
//! a busy flag while a conversion is in flight, and the last result. The
//! browser page served by [`crate::server`] follows the same rules in
//! JavaScript; this type is what the CLI and integration tests drive.
//!
//! ## Lifecycle
//!
//! ```text
//! idle ──select_file──▶ ready ──begin_submit──▶ busy ──finish_submit──▶ result
//!   ▲                     ▲                                               │
//!   └─────────────────────┴──────────────── select_file ──────────────────┘
//! ```
//!
//! Results are tagged: [`ConversionResult::Success`] or
//! [`ConversionResult::Failure`]. A success can be downloaded as a text file;
//! a failure cannot.

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::StatusCode;
use chrono::{NaiveDate, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{ProxyError, ERROR_PREFIX};
use crate::server::CONVERT_PATH;
use crate::upload::{is_accepted_image_type, UploadForm};

/// Result text recorded when the request to the relay itself fails.
pub const CLIENT_TRANSPORT_ERROR: &str = "Error: Failed to process image";

/// An image the user picked, with its declared content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedImage {
    pub file_name: String,
    pub mime: String,
    pub data: Bytes,
}

impl SelectedImage {
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            data: data.into(),
        }
    }

    /// Load an image from disk, declaring its type from the file extension.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let mime = mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_default();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(file_name, mime, data))
    }

    fn to_form(&self) -> UploadForm {
        UploadForm::for_image(&self.file_name, &self.mime, self.data.clone())
    }
}

/// Outcome of one conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ConversionResult {
    /// The webhook returned recognised text.
    Success { text: String },
    /// The conversion failed; `reason` is shown to the user as-is.
    Failure { reason: String },
}

impl ConversionResult {
    /// Classify a plain result string by the legacy prefix rule.
    pub fn classify(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.starts_with(ERROR_PREFIX) {
            ConversionResult::Failure { reason: text }
        } else {
            ConversionResult::Success { text }
        }
    }

    /// Classify a relay response. A non-success status is a failure even if
    /// the body carries no prefix.
    pub fn from_response(status: StatusCode, body: String) -> Self {
        if status.is_success() {
            Self::classify(body)
        } else {
            ConversionResult::Failure { reason: body }
        }
    }

    /// The text shown in the result area.
    pub fn text(&self) -> &str {
        match self {
            ConversionResult::Success { text } => text,
            ConversionResult::Failure { reason } => reason,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ConversionResult::Success { .. })
    }
}

/// A plain-text file produced entirely on the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDownload {
    pub file_name: String,
    pub contents: String,
}

impl TextDownload {
    /// File name for a download made on `date`.
    pub fn file_name_for(date: NaiveDate) -> String {
        format!("converted-text-{}.txt", date.format("%Y-%m-%d"))
    }

    /// Write the file into `dir` and return its path.
    pub async fn save_in(&self, dir: impl AsRef<Path>) -> std::io::Result<PathBuf> {
        let path = dir.as_ref().join(&self.file_name);
        tokio::fs::write(&path, self.contents.as_bytes()).await?;
        Ok(path)
    }
}

/// Sends an upload form to the relay's convert route.
#[async_trait]
pub trait ConvertTransport: Send + Sync {
    /// Post `form` and return the response status and body text.
    async fn post_form(&self, form: UploadForm) -> Result<(StatusCode, String), ProxyError>;
}

/// [`ConvertTransport`] over HTTP, posting to `<base>/api/convert`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpTransport {
    /// Create a transport for a relay served at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, ProxyError> {
        let base = Url::parse(base_url)
            .map_err(|e| ProxyError::InvalidConfig(format!("invalid server URL '{base_url}': {e}")))?;
        let endpoint = base
            .join(CONVERT_PATH)
            .map_err(|e| ProxyError::InvalidConfig(e.to_string()))?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// `GET` the convert route's introspection line.
    pub async fn health(&self) -> Result<String, ProxyError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(|e| ProxyError::from_transport(e, None))?;
        response
            .text()
            .await
            .map_err(|e| ProxyError::from_transport(e, None))
    }
}

#[async_trait]
impl ConvertTransport for HttpTransport {
    async fn post_form(&self, form: UploadForm) -> Result<(StatusCode, String), ProxyError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form.to_reqwest_form())
            .send()
            .await
            .map_err(|e| ProxyError::from_transport(e, None))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProxyError::from_transport(e, None))?;
        Ok((status, body))
    }
}

/// State of one upload page instance.
#[derive(Debug)]
pub struct UploadPage<T> {
    transport: T,
    selected: Option<SelectedImage>,
    busy: bool,
    result: Option<ConversionResult>,
}

impl<T: ConvertTransport> UploadPage<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            selected: None,
            busy: false,
            result: None,
        }
    }

    pub fn selected(&self) -> Option<&SelectedImage> {
        self.selected.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn result(&self) -> Option<&ConversionResult> {
        self.result.as_ref()
    }

    /// Offer `image` as the selection.
    ///
    /// Only PNG and JPEG are accepted; an accepted image replaces the
    /// current one and clears the last result. Anything else is ignored
    /// without a message. Returns whether the image was accepted.
    pub fn select_file(&mut self, image: SelectedImage) -> bool {
        if !is_accepted_image_type(&image.mime) {
            debug!("Ignoring '{}' with type '{}'", image.file_name, image.mime);
            return false;
        }
        self.selected = Some(image);
        self.result = None;
        true
    }

    /// Enter the busy state and build the form to send.
    ///
    /// Returns `None`, changing nothing, when no image is selected or a
    /// submission is already in flight.
    pub fn begin_submit(&mut self) -> Option<UploadForm> {
        if self.busy {
            return None;
        }
        let form = self.selected.as_ref()?.to_form();
        self.busy = true;
        Some(form)
    }

    /// Record the outcome of a submission and leave the busy state.
    pub fn finish_submit(&mut self, outcome: Result<(StatusCode, String), ProxyError>) {
        let result = match outcome {
            Ok((status, body)) => ConversionResult::from_response(status, body),
            Err(e) => {
                warn!("Conversion request failed: {e}");
                ConversionResult::Failure {
                    reason: CLIENT_TRANSPORT_ERROR.to_string(),
                }
            }
        };
        self.result = Some(result);
        self.busy = false;
    }

    /// Submit the selected image and record the result.
    ///
    /// A no-op when [`Self::begin_submit`] declines.
    pub async fn submit(&mut self) -> Option<&ConversionResult> {
        let form = self.begin_submit()?;
        let outcome = self.transport.post_form(form).await;
        self.finish_submit(outcome);
        self.result.as_ref()
    }

    /// The current result as a text file named for today's UTC date.
    pub fn download(&self) -> Option<TextDownload> {
        self.download_on(Utc::now().date_naive())
    }

    /// The current result as a text file named for `date`.
    ///
    /// `None` when there is no result or the result is a failure.
    pub fn download_on(&self, date: NaiveDate) -> Option<TextDownload> {
        match self.result.as_ref()? {
            ConversionResult::Success { text } if !text.is_empty() => Some(TextDownload {
                file_name: TextDownload::file_name_for(date),
                contents: text.clone(),
            }),
            _ => None,
        }
    }
}
