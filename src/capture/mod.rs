pub mod controller;
pub mod state;

pub use controller::{CaptureController, SubmitOutcome};
pub use state::{CaptureSession, CaptureState, SessionSnapshot};
