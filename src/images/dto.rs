use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSourceKind {
    Camera,
    Gallery,
}

impl fmt::Display for ImageSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSourceKind::Camera => f.write_str("camera"),
            ImageSourceKind::Gallery => f.write_str("photo library"),
        }
    }
}

/// Image as handed over by the camera or photo library, before normalization.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub body: Bytes,
    pub content_type: Option<String>,
}

/// Transferable form of an image: a base64 data URL plus its MIME type.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime: &'static str,
    pub data_url: String,
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("mime", &self.mime)
            .field("data_url_len", &self.data_url.len())
            .finish()
    }
}

/// Image owned by a capture session. Dropped on reset.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedImage {
    pub id: Uuid,
    pub source: ImageSourceKind,
    #[serde(with = "time::serde::rfc3339")]
    pub captured_at: OffsetDateTime,
    pub byte_len: usize,
    pub mime: &'static str,
    #[serde(skip)]
    pub encoded: EncodedImage,
}
