use axum::{
    extract::{Multipart, multipart::MultipartError},
    http::StatusCode,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::ApiError;

const FILE_FIELD: &str = "file";
const FALLBACK_EXTENSION: &str = "img";

#[derive(Debug, Clone)]
pub struct ImageFile {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Bytes,
}

impl ImageFile {
    /// Accept only `image/*` payloads no larger than `limit_bytes`.
    pub fn check(&self, limit_bytes: usize) -> Result<(), ApiError> {
        if !self.content_type.starts_with("image/") {
            return Err(ApiError::UnsupportedMedia(self.content_type.clone()));
        }
        if self.bytes.len() > limit_bytes {
            return Err(ApiError::FileTooLarge { limit_bytes });
        }
        Ok(())
    }

    /// File extension taken from the upload's name, else from its MIME subtype.
    pub fn extension(&self) -> String {
        let from_name = self
            .file_name
            .as_deref()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| sanitize(ext));

        let from_mime = || {
            self.content_type
                .split_once('/')
                .map(|(_, subtype)| sanitize(subtype))
        };

        from_name
            .filter(|ext| !ext.is_empty())
            .or_else(|| from_mime().filter(|ext| !ext.is_empty()))
            .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
    }
}

fn sanitize(ext: &str) -> String {
    ext.chars()
        .take_while(char::is_ascii_alphanumeric)
        .take(8)
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Pull the `file` part out of a multipart body.
pub async fn read_image(multipart: &mut Multipart, limit_bytes: usize) -> Result<ImageFile, ApiError> {
    let reject = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::FileTooLarge { limit_bytes }
        } else {
            ApiError::ValidationError(e.body_text())
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(reject)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.map_err(reject)?;

        return Ok(ImageFile {
            file_name,
            content_type,
            bytes,
        });
    }

    Err(ApiError::ValidationError("Please choose an image to upload.".into()))
}

pub fn post_image_path(image: &ImageFile) -> String {
    format!("{}.{}", Uuid::new_v4(), image.extension())
}

pub fn avatar_path(user_id: Uuid, image: &ImageFile) -> String {
    format!("{}/avatar.{}", user_id, image.extension())
}

/// Append a timestamp so clients refetch an object stored at an unchanged path.
pub fn cache_busted(url: &str, at: DateTime<Utc>) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}t={}", at.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn image(name: Option<&str>, content_type: &str, len: usize) -> ImageFile {
        ImageFile {
            file_name: name.map(str::to_string),
            content_type: content_type.into(),
            bytes: Bytes::from(vec![0u8; len]),
        }
    }

    #[test]
    fn rejects_non_images() {
        let err = image(Some("notes.pdf"), "application/pdf", 10).check(1024).unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedMedia(_)));
    }

    #[test]
    fn enforces_ceiling_inclusively() {
        let limit = 2 * 1024 * 1024;
        assert!(image(None, "image/png", limit).check(limit).is_ok());
        let err = image(None, "image/png", limit + 1).check(limit).unwrap_err();
        assert!(matches!(err, ApiError::FileTooLarge { limit_bytes } if limit_bytes == limit));
    }

    #[test]
    fn extension_prefers_file_name() {
        assert_eq!(image(Some("Me.JPG"), "image/jpeg", 1).extension(), "jpg");
        assert_eq!(image(Some("photo"), "image/svg+xml", 1).extension(), "svg");
        assert_eq!(image(None, "image/", 1).extension(), "img");
        assert_eq!(image(Some("x.p/../ng"), "image/png", 1).extension(), "png");
    }

    #[test]
    fn paths_follow_bucket_layout() {
        let user = Uuid::nil();
        let png = image(Some("a.png"), "image/png", 1);
        assert_eq!(avatar_path(user, &png), format!("{user}/avatar.png"));
        assert!(post_image_path(&png).ends_with(".png"));
    }

    #[test]
    fn cache_buster_uses_millis() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(cache_busted("http://x/a.png", at), "http://x/a.png?t=1700000000123");
        assert_eq!(cache_busted("http://x/a.png?v=1", at), "http://x/a.png?v=1&t=1700000000123");
    }
}
