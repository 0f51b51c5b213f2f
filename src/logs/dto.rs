use serde::{Deserialize, Serialize};

use crate::meals::MealType;

/// Record handed to persistence, `POST /food/log`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodLogEntry {
    pub description: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: Option<f64>,
    pub meal_type: MealType,
    pub portion_size: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedLog {
    pub id: String,
    pub calories: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveLogResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub food_log: Option<SavedLogRef>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SavedLogRef {
    pub id: String,
}

/// A log as listed back by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedFood {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
    #[serde(default)]
    pub meal_type: MealType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionTotals {
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
}

/// `GET /food/logs`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyLog {
    #[serde(default)]
    pub food_logs: Vec<LoggedFood>,
    #[serde(default)]
    pub totals: Option<NutritionTotals>,
}

impl DailyLog {
    /// Backend totals when present, otherwise summed from the entries.
    pub fn totals(&self) -> NutritionTotals {
        if let Some(t) = &self.totals {
            return t.clone();
        }
        self.food_logs
            .iter()
            .fold(NutritionTotals::default(), |mut acc, f| {
                acc.calories += f.calories;
                acc.protein += f.protein;
                acc.carbs += f.carbs;
                acc.fat += f.fat;
                acc
            })
    }
}
