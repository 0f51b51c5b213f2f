use async_trait::async_trait;
use tracing::{info, instrument, warn};

use super::dto::{
    AnalysisOutcome, AnalyzeRequest, AnalyzeResponse, EstimateOutcome, EstimateRequest,
    EstimateResponse,
};
use crate::api::ApiClient;
use crate::errors::ApiError;
use crate::images::EncodedImage;
use crate::meals::{MealType, UnclearResult};

const ANALYZE_PATH: &str = "food/analyze";
const ESTIMATE_PATH: &str = "food/estimate";

/// Image and text nutrition inference. Both calls are side-effect free and
/// safe to repeat.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn analyze_image(
        &self,
        image: &EncodedImage,
        meal_type: MealType,
    ) -> Result<AnalysisOutcome, ApiError>;

    async fn estimate_text(
        &self,
        description: &str,
        meal_type: MealType,
    ) -> Result<EstimateOutcome, ApiError>;
}

#[derive(Clone)]
pub struct HttpInferenceClient {
    api: ApiClient,
}

impl HttpInferenceClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    #[instrument(skip(self, image), fields(mime = image.mime))]
    async fn analyze_image(
        &self,
        image: &EncodedImage,
        meal_type: MealType,
    ) -> Result<AnalysisOutcome, ApiError> {
        let body = AnalyzeRequest {
            image_base64: &image.data_url,
            meal_type,
        };
        let resp: AnalyzeResponse = self.api.post_json(ANALYZE_PATH, &body).await?;
        analysis_outcome(resp)
    }

    #[instrument(skip(self, description))]
    async fn estimate_text(
        &self,
        description: &str,
        meal_type: MealType,
    ) -> Result<EstimateOutcome, ApiError> {
        let body = EstimateRequest {
            description,
            meal_type,
        };
        let resp: EstimateResponse = self.api.post_json(ESTIMATE_PATH, &body).await?;
        Ok(estimate_outcome(resp))
    }
}

fn analysis_outcome(resp: AnalyzeResponse) -> Result<AnalysisOutcome, ApiError> {
    if resp.success {
        if let Some(analysis) = resp.analysis {
            info!(calories = analysis.calories, confidence = analysis.confidence, "food analyzed");
            return Ok(AnalysisOutcome::Analyzed(analysis.normalized()));
        }
    }
    if resp.unclear {
        let unclear = UnclearResult {
            reason: resp
                .reason
                .unwrap_or_else(|| "The photo could not be recognized.".into()),
            suggestion: resp
                .suggestion
                .unwrap_or_else(|| "Retake the photo or enter the food manually.".into()),
        };
        info!(reason = %unclear.reason, "image unclear");
        return Ok(AnalysisOutcome::Unclear(unclear));
    }
    warn!(error = ?resp.error, "analysis response carried no result");
    Err(ApiError::Service {
        status: 200,
        message: resp
            .error
            .unwrap_or_else(|| "Could not analyze the food image.".into()),
    })
}

fn estimate_outcome(resp: EstimateResponse) -> EstimateOutcome {
    match (resp.success, resp.estimation) {
        (true, Some(estimation)) => EstimateOutcome::Estimated(estimation),
        (_, _) => EstimateOutcome::Failed {
            message: resp
                .message
                .unwrap_or_else(|| "No estimate available for this description.".into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{routing::post, Json, Router};
    use serde_json::{json, Value};

    use super::*;
    use crate::api::test_server;
    use crate::inference::Estimation;

    fn image() -> EncodedImage {
        EncodedImage {
            mime: "image/jpeg",
            data_url: "data:image/jpeg;base64,AAAA".into(),
        }
    }

    #[tokio::test]
    async fn analyze_returns_analysis() {
        let app = Router::new().route(
            "/api/food/analyze",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["mealType"], "LUNCH");
                assert_eq!(body["imageBase64"], "data:image/jpeg;base64,AAAA");
                Json(json!({
                    "success": true,
                    "analysis": {
                        "description": "Grilled chicken salad",
                        "items": ["chicken", "lettuce"],
                        "calories": 420, "protein": 38, "carbs": 12, "fat": 22,
                        "fiber": 4, "portionSize": "1 plate", "confidence": 0.85,
                        "healthNotes": null, "mealType": "LUNCH"
                    }
                }))
            }),
        );
        let client = HttpInferenceClient::new(test_server::spawn(app, None, 5).await);

        let out = client.analyze_image(&image(), MealType::Lunch).await.unwrap();
        let AnalysisOutcome::Analyzed(a) = out else {
            panic!("expected analysis, got {out:?}");
        };
        assert_eq!(a.description, "Grilled chicken salad");
        assert_eq!(a.fiber, Some(4.0));
        assert_eq!(a.confidence, 0.85);
    }

    #[tokio::test]
    async fn analyze_returns_unclear() {
        let app = Router::new().route(
            "/api/food/analyze",
            post(|| async {
                Json(json!({
                    "success": false, "unclear": true,
                    "reason": "Image too dark", "suggestion": "Retake in better light"
                }))
            }),
        );
        let client = HttpInferenceClient::new(test_server::spawn(app, None, 5).await);

        let out = client.analyze_image(&image(), MealType::Other).await.unwrap();
        assert_eq!(
            out,
            AnalysisOutcome::Unclear(UnclearResult {
                reason: "Image too dark".into(),
                suggestion: "Retake in better light".into(),
            })
        );
    }

    #[tokio::test]
    async fn analyze_without_result_is_service_error() {
        let app = Router::new().route(
            "/api/food/analyze",
            post(|| async { Json(json!({ "success": false, "error": "quota exceeded" })) }),
        );
        let client = HttpInferenceClient::new(test_server::spawn(app, None, 5).await);

        let err = client.analyze_image(&image(), MealType::Other).await.unwrap_err();
        assert_eq!(
            err,
            ApiError::Service {
                status: 200,
                message: "quota exceeded".into()
            }
        );
    }

    #[tokio::test]
    async fn analyze_timeout_is_distinct() {
        let app = Router::new().route(
            "/api/food/analyze",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Json(json!({ "success": true }))
            }),
        );
        let client = HttpInferenceClient::new(test_server::spawn(app, None, 1).await);

        let err = client.analyze_image(&image(), MealType::Other).await.unwrap_err();
        assert_eq!(err, ApiError::Timeout);
    }

    #[tokio::test]
    async fn estimate_returns_values() {
        let app = Router::new().route(
            "/api/food/estimate",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["description"], "2 eggs and toast");
                Json(json!({
                    "success": true,
                    "estimation": { "calories": 320, "protein": 18, "carbs": 28, "fat": 14 }
                }))
            }),
        );
        let client = HttpInferenceClient::new(test_server::spawn(app, None, 5).await);

        let out = client
            .estimate_text("2 eggs and toast", MealType::Breakfast)
            .await
            .unwrap();
        assert_eq!(
            out,
            EstimateOutcome::Estimated(Estimation {
                calories: Some(320.0),
                protein: Some(18.0),
                carbs: Some(28.0),
                fat: Some(14.0),
            })
        );
    }

    #[tokio::test]
    async fn estimate_failure_carries_message() {
        let app = Router::new().route(
            "/api/food/estimate",
            post(|| async { Json(json!({ "success": false, "message": "Too vague" })) }),
        );
        let client = HttpInferenceClient::new(test_server::spawn(app, None, 5).await);

        let out = client.estimate_text("stuff", MealType::Other).await.unwrap();
        assert_eq!(
            out,
            EstimateOutcome::Failed {
                message: "Too vague".into()
            }
        );
    }

    #[test]
    fn success_without_estimation_is_failure() {
        let resp: EstimateResponse = serde_json::from_value(json!({ "success": true })).unwrap();
        assert!(matches!(estimate_outcome(resp), EstimateOutcome::Failed { .. }));
    }
}
