//! Convert route handlers.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::IntoResponse;
use tracing::warn;

use super::AppState;
use crate::error::{ProxyError, TEXT_PLAIN_UTF8};
use crate::relay::RelayedResponse;
use crate::upload::{UploadForm, FIELD_DATA};

/// `GET /api/convert`: report whether the webhook is configured, never its
/// value.
pub async fn convert_status(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, TEXT_PLAIN_UTF8)],
        status_line(state.is_configured()),
    )
}

/// The introspection line for a configured / unconfigured relay.
pub fn status_line(configured: bool) -> String {
    format!(
        "convert route up | env:{}",
        if configured { "ok" } else { "missing" }
    )
}

/// `POST /api/convert`: relay the uploaded form to the webhook.
///
/// The configuration check runs before the body is read, so an unconfigured
/// relay answers without consuming the upload or calling out.
pub async fn convert(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<RelayedResponse, ProxyError> {
    let relay = state.relay()?;

    let multipart = multipart.map_err(|e| ProxyError::InvalidForm {
        reason: e.body_text(),
    })?;
    let form = UploadForm::from_multipart(multipart, state.max_upload_bytes()).await?;

    if !form.has_data_field() {
        warn!("Upload has no `{FIELD_DATA}` part; forwarding anyway");
    }

    relay.forward(&form).await
}
