pub mod dto;
pub mod services;

pub use dto::{AnalysisOutcome, EstimateOutcome, Estimation};
pub use services::{HttpInferenceClient, InferenceClient};
