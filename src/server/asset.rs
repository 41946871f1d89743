use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use rust_embed::Embed;

use crate::error::TEXT_PLAIN_UTF8;

#[derive(Embed)]
#[folder = "assets"]
#[include = "*.js"]
#[include = "*.css"]
pub struct Asset;

// The router matches "/assets/{*file}", so `file` is already relative to the
// assets folder.
pub async fn static_handler(Path(file): Path<String>) -> impl IntoResponse {
    StaticFile(file)
}

struct StaticFile<T>(T);

impl<T> IntoResponse for StaticFile<T>
where
    T: Into<String>,
{
    fn into_response(self) -> Response {
        let path = self.0.into();

        match Asset::get(path.as_str()) {
            Some(content) => {
                let mime = mime_guess::from_path(path).first_or_octet_stream();
                ([(header::CONTENT_TYPE, mime.as_ref())], content.data).into_response()
            }
            None => (
                StatusCode::NOT_FOUND,
                [(header::CONTENT_TYPE, TEXT_PLAIN_UTF8)],
                "Not found",
            )
                .into_response(),
        }
    }
}
