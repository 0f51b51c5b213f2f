use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use bytes::Bytes;
use time::OffsetDateTime;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::dto::{CapturedImage, EncodedImage, ImageSourceKind, RawImage};
use crate::errors::AcquireError;

/// Camera and photo library, as provided by the host platform.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn capture_from_camera(&self) -> Result<RawImage, AcquireError>;
    async fn pick_from_library(&self) -> Result<RawImage, AcquireError>;
}

/// Pulls an image from an [`ImageSource`] and normalizes it into a
/// [`CapturedImage`] ready to be sent for inference.
#[derive(Clone)]
pub struct ImageAcquirer {
    source: Arc<dyn ImageSource>,
    max_bytes: usize,
}

impl ImageAcquirer {
    pub fn new(source: Arc<dyn ImageSource>, max_bytes: usize) -> Self {
        Self { source, max_bytes }
    }

    #[instrument(skip(self, captured_at))]
    pub async fn acquire(
        &self,
        kind: ImageSourceKind,
        captured_at: OffsetDateTime,
    ) -> Result<CapturedImage, AcquireError> {
        let raw = match kind {
            ImageSourceKind::Camera => self.source.capture_from_camera().await,
            ImageSourceKind::Gallery => self.source.pick_from_library().await,
        }
        .map_err(|e| {
            warn!(error = %e, "image acquisition failed");
            e
        })?;
        normalize(raw, kind, captured_at, self.max_bytes)
    }
}

pub fn normalize(
    raw: RawImage,
    source: ImageSourceKind,
    captured_at: OffsetDateTime,
    max_bytes: usize,
) -> Result<CapturedImage, AcquireError> {
    let size = raw.body.len();
    if size == 0 {
        return Err(AcquireError::Empty);
    }
    if size > max_bytes {
        return Err(AcquireError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let mime = mime_from_magic(&raw.body)
        .or_else(|| raw.content_type.as_deref().and_then(mime_from_content_type))
        .unwrap_or("image/jpeg");
    let data_url = format!("data:{};base64,{}", mime, Base64::encode_string(&raw.body));

    let image = CapturedImage {
        id: Uuid::new_v4(),
        source,
        captured_at,
        byte_len: size,
        mime,
        encoded: EncodedImage { mime, data_url },
    };
    debug!(image_id = %image.id, %source, size, mime, "image normalized");
    Ok(image)
}

fn mime_from_magic(body: &[u8]) -> Option<&'static str> {
    if body.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if body.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }
    if body.len() >= 12 && &body[0..4] == b"RIFF" && &body[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if body.len() >= 12 && &body[4..8] == b"ftyp" {
        return match &body[8..12] {
            b"heic" | b"heix" | b"mif1" | b"msf1" => Some("image/heic"),
            _ => None,
        };
    }
    None
}

fn mime_from_content_type(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("image/jpeg"),
        "image/png" => Some("image/png"),
        "image/webp" => Some("image/webp"),
        "image/heic" => Some("image/heic"),
        _ => None,
    }
}

/// Host without a camera: library selection reads a file chosen up front,
/// no file means the user cancelled.
#[derive(Debug, Clone, Default)]
pub struct FileImageSource {
    library_path: Option<PathBuf>,
}

impl FileImageSource {
    pub fn new(library_path: Option<PathBuf>) -> Self {
        Self { library_path }
    }
}

#[async_trait]
impl ImageSource for FileImageSource {
    async fn capture_from_camera(&self) -> Result<RawImage, AcquireError> {
        Err(AcquireError::PermissionDenied(ImageSourceKind::Camera))
    }

    async fn pick_from_library(&self) -> Result<RawImage, AcquireError> {
        let Some(path) = &self.library_path else {
            return Err(AcquireError::UserCancelled);
        };
        let body = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => {
                AcquireError::PermissionDenied(ImageSourceKind::Gallery)
            }
            _ => AcquireError::Io(format!("{}: {}", path.display(), e)),
        })?;
        Ok(RawImage {
            body: Bytes::from(body),
            content_type: None,
        })
    }
}
