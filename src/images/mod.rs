pub mod dto;
pub mod services;

pub use dto::{CapturedImage, EncodedImage, ImageSourceKind, RawImage};
pub use services::{FileImageSource, ImageAcquirer, ImageSource};
