use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
    #[default]
    Other,
}

impl MealType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "BREAKFAST",
            MealType::Lunch => "LUNCH",
            MealType::Dinner => "DINNER",
            MealType::Snack => "SNACK",
            MealType::Other => "OTHER",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BREAKFAST" => Ok(MealType::Breakfast),
            "LUNCH" => Ok(MealType::Lunch),
            "DINNER" => Ok(MealType::Dinner),
            "SNACK" => Ok(MealType::Snack),
            "OTHER" => Ok(MealType::Other),
            other => Err(format!("unknown meal type: {other}")),
        }
    }
}

/// Nutrition breakdown produced by image inference. Replaced wholesale on
/// re-analysis, never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodAnalysis {
    pub description: String,
    #[serde(default)]
    pub items: Vec<String>,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    #[serde(default)]
    pub fiber: Option<f64>,
    #[serde(default)]
    pub portion_size: String,
    pub confidence: f64,
    #[serde(default)]
    pub health_notes: Option<String>,
    #[serde(default)]
    pub meal_type: MealType,
}

impl FoodAnalysis {
    /// Clamps the numbers into their valid ranges: macros non-negative,
    /// confidence within 0..=1.
    pub fn normalized(mut self) -> Self {
        fn non_negative(v: f64) -> f64 {
            if v.is_finite() && v > 0.0 {
                v
            } else {
                0.0
            }
        }
        self.calories = non_negative(self.calories);
        self.protein = non_negative(self.protein);
        self.carbs = non_negative(self.carbs);
        self.fat = non_negative(self.fat);
        self.fiber = self.fiber.filter(|f| f.is_finite()).map(non_negative);
        self.confidence = if self.confidence.is_finite() {
            self.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnclearResult {
    pub reason: String,
    pub suggestion: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meal_type_wire_format_is_uppercase() {
        assert_eq!(serde_json::to_string(&MealType::Breakfast).unwrap(), "\"BREAKFAST\"");
        let parsed: MealType = serde_json::from_str("\"SNACK\"").unwrap();
        assert_eq!(parsed, MealType::Snack);
        assert_eq!("dinner".parse::<MealType>().unwrap(), MealType::Dinner);
        assert!("brunch".parse::<MealType>().is_err());
    }

    #[test]
    fn analysis_decodes_camel_case_and_clamps() {
        let raw = r#"{
            "description": "Oatmeal with berries",
            "items": ["oats", "blueberries"],
            "calories": 310,
            "protein": 9,
            "carbs": 54,
            "fat": -2,
            "fiber": null,
            "portionSize": "1 bowl",
            "confidence": 1.4,
            "healthNotes": "Good fiber source",
            "mealType": "BREAKFAST"
        }"#;
        let a: FoodAnalysis = serde_json::from_str(raw).unwrap();
        let a = a.normalized();
        assert_eq!(a.items, vec!["oats", "blueberries"]);
        assert_eq!(a.fat, 0.0);
        assert_eq!(a.fiber, None);
        assert_eq!(a.confidence, 1.0);
        assert_eq!(a.portion_size, "1 bowl");
        assert_eq!(a.meal_type, MealType::Breakfast);
    }
}
