use thiserror::Error;

use crate::capture::CaptureState;
use crate::images::dto::ImageSourceKind;

/// Failure of a call through the shared authenticated transport.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("session expired, please sign in again")]
    Unauthorized,
    #[error("service error ({status}): {message}")]
    Service { status: u16, message: String },
}

/// Failure while obtaining an image from the camera or photo library.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AcquireError {
    #[error("{0} access was denied")]
    PermissionDenied(ImageSourceKind),
    #[error("image selection was cancelled")]
    UserCancelled,
    #[error("image is empty")]
    Empty,
    #[error("image is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },
    #[error("could not read image: {0}")]
    Io(String),
}

/// Everything a capture session operation can surface to the user.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CaptureError {
    #[error("Please allow {0} access to scan food.")]
    PermissionDenied(ImageSourceKind),
    #[error("image selection was cancelled")]
    UserCancelled,
    #[error("Could not use this image: {0}")]
    InvalidImage(String),
    #[error("Failed to reach the server: {0}")]
    Transport(String),
    #[error("The server took too long to respond. Please try again.")]
    Timeout,
    #[error("Your session has expired. Please sign in again.")]
    Unauthorized,
    #[error("The service could not handle the request: {0}")]
    Service(String),
    #[error("Could not estimate nutrition: {0}")]
    EstimationFailed(String),
    #[error("Missing info: {0}")]
    Validation(String),
    #[error("Failed to save food log: {0}")]
    Submission(String),
    #[error("cannot {op} while {state:?}")]
    InvalidTransition { op: &'static str, state: CaptureState },
    #[error("another request is already in progress ({0:?})")]
    Busy(CaptureState),
    #[error("session was reset before the response arrived")]
    Superseded,
}

impl From<ApiError> for CaptureError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Transport(msg) => CaptureError::Transport(msg),
            ApiError::Timeout => CaptureError::Timeout,
            ApiError::Unauthorized => CaptureError::Unauthorized,
            ApiError::Service { message, .. } => CaptureError::Service(message),
        }
    }
}

impl From<AcquireError> for CaptureError {
    fn from(e: AcquireError) -> Self {
        match e {
            AcquireError::PermissionDenied(kind) => CaptureError::PermissionDenied(kind),
            AcquireError::UserCancelled => CaptureError::UserCancelled,
            other => CaptureError::InvalidImage(other.to_string()),
        }
    }
}

impl CaptureError {
    /// Whether the error should be shown to the user. Cancellation and stale
    /// completions are silent.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, CaptureError::UserCancelled | CaptureError::Superseded)
    }
}
