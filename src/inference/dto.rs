use serde::{Deserialize, Serialize};

use crate::meals::{FoodAnalysis, MealType, UnclearResult};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest<'a> {
    pub image_base64: &'a str,
    pub meal_type: MealType,
}

/// `{success, analysis?}` or `{unclear, reason, suggestion}` on the wire.
#[derive(Debug, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub analysis: Option<FoodAnalysis>,
    #[serde(default)]
    pub unclear: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub suggestion: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateRequest<'a> {
    pub description: &'a str,
    pub meal_type: MealType,
}

#[derive(Debug, Deserialize)]
pub struct EstimateResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub estimation: Option<Estimation>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Macro values from a text estimate. Any of them can be missing; callers
/// decide what counts as usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Estimation {
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub protein: Option<f64>,
    #[serde(default)]
    pub carbs: Option<f64>,
    #[serde(default)]
    pub fat: Option<f64>,
}

/// Result of image inference. Exactly one branch exists per analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AnalysisOutcome {
    Analyzed(FoodAnalysis),
    Unclear(UnclearResult),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EstimateOutcome {
    Estimated(Estimation),
    Failed { message: String },
}
