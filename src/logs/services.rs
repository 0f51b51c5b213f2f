use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, instrument};

use super::dto::{DailyLog, FoodLogEntry, SaveLogResponse, SavedLog};
use crate::api::ApiClient;
use crate::errors::{ApiError, CaptureError};
use crate::manual::ValidatedDraft;
use crate::meals::{FoodAnalysis, MealType};

pub const MANUAL_CONFIDENCE: f64 = 1.0;
pub const ESTIMATED_CONFIDENCE: f64 = 0.8;
pub const MANUAL_PORTION: &str = "1 serving (manual entry)";
pub const ESTIMATED_PORTION: &str = "1 serving (AI estimated)";

const LOG_PATH: &str = "food/log";
const LOGS_PATH: &str = "food/logs";

/// Backend persistence for food logs.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Stores one entry and returns its id.
    async fn save(&self, entry: &FoodLogEntry) -> Result<String, ApiError>;
    async fn list_today(&self) -> Result<DailyLog, ApiError>;
}

#[derive(Clone)]
pub struct HttpLogStore {
    api: ApiClient,
}

impl HttpLogStore {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl LogStore for HttpLogStore {
    #[instrument(skip(self, entry), fields(meal_type = %entry.meal_type))]
    async fn save(&self, entry: &FoodLogEntry) -> Result<String, ApiError> {
        let resp: SaveLogResponse = self.api.post_json(LOG_PATH, entry).await?;
        match (resp.success, resp.food_log) {
            (true, Some(log)) => Ok(log.id),
            _ => Err(ApiError::Service {
                status: 200,
                message: resp.error.unwrap_or_else(|| "food log was not saved".into()),
            }),
        }
    }

    #[instrument(skip(self))]
    async fn list_today(&self) -> Result<DailyLog, ApiError> {
        self.api.get_json(LOGS_PATH).await
    }
}

/// Turns a confirmed analysis or manual draft into a [`FoodLogEntry`] and
/// persists it. One store call per submit; failures are surfaced, never
/// retried, so a slow success can't turn into a duplicate log.
#[derive(Clone)]
pub struct LogSubmitter {
    store: Arc<dyn LogStore>,
}

impl LogSubmitter {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }

    pub fn entry_from_analysis(analysis: &FoodAnalysis, meal_type: MealType) -> FoodLogEntry {
        FoodLogEntry {
            description: analysis.description.clone(),
            calories: analysis.calories,
            protein: analysis.protein,
            carbs: analysis.carbs,
            fat: analysis.fat,
            fiber: analysis.fiber,
            meal_type,
            portion_size: analysis.portion_size.clone(),
            confidence: analysis.confidence,
        }
    }

    pub fn entry_from_draft(draft: &ValidatedDraft, meal_type: MealType) -> FoodLogEntry {
        let (portion_size, confidence) = if draft.estimated {
            (ESTIMATED_PORTION, ESTIMATED_CONFIDENCE)
        } else {
            (MANUAL_PORTION, MANUAL_CONFIDENCE)
        };
        FoodLogEntry {
            description: draft.description.clone(),
            calories: f64::from(draft.calories),
            protein: f64::from(draft.protein),
            carbs: f64::from(draft.carbs),
            fat: f64::from(draft.fat),
            fiber: None,
            meal_type,
            portion_size: portion_size.to_string(),
            confidence,
        }
    }

    pub async fn submit(&self, entry: &FoodLogEntry) -> Result<SavedLog, CaptureError> {
        match self.store.save(entry).await {
            Ok(id) => {
                info!(log_id = %id, calories = entry.calories, confidence = entry.confidence, "food logged");
                Ok(SavedLog {
                    id,
                    calories: entry.calories,
                })
            }
            Err(ApiError::Unauthorized) => {
                error!("food log rejected, session expired");
                Err(CaptureError::Unauthorized)
            }
            Err(e) => {
                error!(error = %e, "food log submission failed");
                Err(CaptureError::Submission(e.to_string()))
            }
        }
    }

    pub async fn today(&self) -> Result<DailyLog, CaptureError> {
        self.store.list_today().await.map_err(CaptureError::from)
    }
}
