//! In-memory multipart upload model.
//!
//! An upload is captured from the inbound request part by part, kept in
//! memory for the lifetime of that one request, and re-encoded as a fresh
//! `multipart/form-data` body for the webhook. Re-encoding lets the HTTP
//! client pick a new boundary and `Content-Type` instead of reusing the
//! browser's.
//!
//! ```text
//! data      binary image, filename + declared MIME type   (name is fixed)
//! filename  original file name as plain text
//! mime      declared MIME type as plain text
//! ```

use axum::body::Bytes;
use axum::extract::Multipart;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::error::ProxyError;

/// Field carrying the image bytes. The webhook only reads this name.
pub const FIELD_DATA: &str = "data";
/// Field carrying the original file name as text.
pub const FIELD_FILENAME: &str = "filename";
/// Field carrying the declared MIME type as text.
pub const FIELD_MIME: &str = "mime";

/// The only image types the upload page accepts.
pub const ACCEPTED_IMAGE_TYPES: [&str; 2] = ["image/png", "image/jpeg"];

/// MIME type sent in the `mime` field when the file declared none.
pub const FALLBACK_MIME: &str = "image/jpeg";

/// Whether `mime` is one of [`ACCEPTED_IMAGE_TYPES`].
pub fn is_accepted_image_type(mime: &str) -> bool {
    ACCEPTED_IMAGE_TYPES.contains(&mime)
}

/// One named part of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl FormPart {
    /// A plain text field.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_name: None,
            content_type: None,
            data: Bytes::from(value.into()),
        }
    }

    /// A file field with a file name and optional content type.
    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: Option<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            file_name: Some(file_name.into()),
            content_type,
            data: data.into(),
        }
    }

    /// Parts that carry a file name are files; the rest are text fields.
    pub fn is_file(&self) -> bool {
        self.file_name.is_some()
    }

    /// Encode as a `reqwest` part. A content type `reqwest` cannot parse is
    /// dropped and the part is sent without one.
    fn into_reqwest_part(self) -> Part {
        let len = self.data.len() as u64;
        let body = || Part::stream_with_length(reqwest::Body::from(self.data.clone()), len);
        let mut part = match &self.content_type {
            Some(content_type) => body().mime_str(content_type).unwrap_or_else(|_| {
                debug!(
                    "Part `{}` has unparseable content type {content_type:?}; sending without it",
                    self.name
                );
                body()
            }),
            None => body(),
        };
        if let Some(file_name) = self.file_name {
            part = part.file_name(file_name);
        }
        part
    }
}

/// A complete multipart form held in memory, parts in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadForm {
    parts: Vec<FormPart>,
}

impl UploadForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the three-part form the webhook expects for one image.
    ///
    /// The file name and MIME type are sent twice: once on the binary part
    /// and once as plain text fields, so the webhook can read either.
    pub fn for_image(file_name: &str, mime: &str, data: impl Into<Bytes>) -> Self {
        let mime = if mime.is_empty() { FALLBACK_MIME } else { mime };
        Self::new()
            .with_part(FormPart::file(
                FIELD_DATA,
                file_name,
                Some(mime.to_string()),
                data,
            ))
            .with_part(FormPart::text(FIELD_FILENAME, file_name))
            .with_part(FormPart::text(FIELD_MIME, mime))
    }

    pub fn with_part(mut self, part: FormPart) -> Self {
        self.parts.push(part);
        self
    }

    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// First part named `name`, if any.
    pub fn get(&self, name: &str) -> Option<&FormPart> {
        self.parts.iter().find(|p| p.name == name)
    }

    /// Whether the binary `data` field the webhook requires is present.
    pub fn has_data_field(&self) -> bool {
        self.get(FIELD_DATA).is_some()
    }

    /// Total payload bytes across all parts.
    pub fn payload_len(&self) -> usize {
        self.parts.iter().map(|p| p.data.len()).sum()
    }

    /// Read every field of an inbound multipart body into memory.
    ///
    /// `limit` is the body limit the router enforces; a body over it fails
    /// with [`ProxyError::PayloadTooLarge`].
    pub async fn from_multipart(mut multipart: Multipart, limit: usize) -> Result<Self, ProxyError> {
        let mut form = Self::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ProxyError::from_multipart(e, limit))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| ProxyError::from_multipart(e, limit))?;

            debug!(
                "Captured part `{name}` ({} bytes, file_name={file_name:?}, content_type={content_type:?})",
                data.len()
            );

            form.parts.push(FormPart {
                name,
                file_name,
                content_type,
                data,
            });
        }
        Ok(form)
    }

    /// Encode as a `reqwest` multipart form with a freshly generated boundary.
    ///
    /// Consumes a clone of the parts; [`Bytes`] clones share the buffers, so
    /// building the form again for a retry does not copy the image.
    pub fn to_reqwest_form(&self) -> Form {
        self.parts.iter().cloned().fold(Form::new(), |form, part| {
            let name = part.name.clone();
            form.part(name, part.into_reqwest_part())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_types_are_exactly_png_and_jpeg() {
        assert!(is_accepted_image_type("image/png"));
        assert!(is_accepted_image_type("image/jpeg"));
        assert!(!is_accepted_image_type("image/gif"));
        assert!(!is_accepted_image_type("image/jpg"));
        assert!(!is_accepted_image_type("application/pdf"));
        assert!(!is_accepted_image_type(""));
    }

    #[test]
    fn for_image_builds_three_parts_in_order() {
        let form = UploadForm::for_image("note.png", "image/png", vec![1u8, 2, 3]);
        let names: Vec<&str> = form.parts().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, [FIELD_DATA, FIELD_FILENAME, FIELD_MIME]);

        let data = form.get(FIELD_DATA).unwrap();
        assert!(data.is_file());
        assert_eq!(data.file_name.as_deref(), Some("note.png"));
        assert_eq!(data.content_type.as_deref(), Some("image/png"));
        assert_eq!(&data.data[..], &[1, 2, 3]);

        assert_eq!(&form.get(FIELD_FILENAME).unwrap().data[..], b"note.png");
        assert_eq!(&form.get(FIELD_MIME).unwrap().data[..], b"image/png");
        assert_eq!(form.payload_len(), 3 + 8 + 9);
    }

    #[test]
    fn for_image_falls_back_to_jpeg_mime() {
        let form = UploadForm::for_image("scan", "", Bytes::from_static(b"x"));
        assert_eq!(&form.get(FIELD_MIME).unwrap().data[..], FALLBACK_MIME.as_bytes());
        assert_eq!(
            form.get(FIELD_DATA).unwrap().content_type.as_deref(),
            Some(FALLBACK_MIME)
        );
    }

    #[test]
    fn text_parts_are_not_files() {
        let part = FormPart::text("filename", "a.png");
        assert!(!part.is_file());
    }

    #[test]
    fn has_data_field() {
        assert!(UploadForm::for_image("a.png", "image/png", vec![0u8]).has_data_field());
        let wrong = UploadForm::new().with_part(FormPart::file(
            "file",
            "a.png",
            Some("image/png".into()),
            vec![0u8],
        ));
        assert!(!wrong.has_data_field());
        assert!(UploadForm::new().is_empty());
    }

    #[test]
    fn unparseable_content_type_is_dropped_not_rejected() {
        let form = UploadForm::new()
            .with_part(FormPart::file(
                FIELD_DATA,
                "a.png",
                Some("not a mime".into()),
                vec![0u8],
            ))
            .with_part(FormPart::text(FIELD_FILENAME, "a.png"));
        let encoded = form.to_reqwest_form();
        assert!(!encoded.boundary().is_empty());
    }

    #[test]
    fn encoding_valid_form_succeeds() {
        let form = UploadForm::for_image("a.jpg", "image/jpeg", vec![0xFFu8, 0xD8]);
        let encoded = form.to_reqwest_form();
        assert!(!encoded.boundary().is_empty());
    }
}
