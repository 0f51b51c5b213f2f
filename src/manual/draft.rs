use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::errors::CaptureError;
use crate::inference::Estimation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MacroField {
    Calories,
    Protein,
    Carbs,
    Fat,
}

impl MacroField {
    pub fn label(&self) -> &'static str {
        match self {
            MacroField::Calories => "calories",
            MacroField::Protein => "protein",
            MacroField::Carbs => "carbs",
            MacroField::Fat => "fat",
        }
    }
}

/// Hand-entered food with optional macros.
///
/// `estimated` is true only while the four numbers are exactly what the last
/// successful text estimate returned. Any edit clears it; a description edit
/// keeps the numbers but they stop counting as AI-sourced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualDraft {
    pub description: String,
    pub calories: Option<u32>,
    pub protein: Option<u32>,
    pub carbs: Option<u32>,
    pub fat: Option<u32>,
    pub estimated: bool,
}

/// Draft that passed validation, with blanks resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDraft {
    pub description: String,
    pub calories: u32,
    pub protein: u32,
    pub carbs: u32,
    pub fat: u32,
    pub estimated: bool,
}

impl ManualDraft {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn set_description(&mut self, description: &str) {
        if self.description != description {
            self.description = description.to_string();
            self.estimated = false;
        }
    }

    pub fn get(&self, field: MacroField) -> Option<u32> {
        match field {
            MacroField::Calories => self.calories,
            MacroField::Protein => self.protein,
            MacroField::Carbs => self.carbs,
            MacroField::Fat => self.fat,
        }
    }

    pub fn set(&mut self, field: MacroField, value: Option<u32>) {
        *self.slot(field) = value;
        self.estimated = false;
    }

    /// Applies text typed into a numeric field. Blank clears the field.
    pub fn set_from_input(&mut self, field: MacroField, input: &str) -> Result<(), CaptureError> {
        let value = parse_amount(field, input)?;
        self.set(field, value);
        Ok(())
    }

    /// Overwrites all four numbers with a text estimate and marks the draft
    /// as AI-sourced. Leaves the draft untouched when the estimate has no
    /// usable calorie value.
    pub fn apply_estimation(&mut self, estimation: &Estimation) -> Result<(), CaptureError> {
        let calories = estimation.calories.and_then(to_amount).ok_or_else(|| {
            CaptureError::EstimationFailed("no calorie value in the estimate".into())
        })?;
        self.calories = Some(calories);
        self.protein = Some(estimation.protein.and_then(to_amount).unwrap_or(0));
        self.carbs = Some(estimation.carbs.and_then(to_amount).unwrap_or(0));
        self.fat = Some(estimation.fat.and_then(to_amount).unwrap_or(0));
        self.estimated = true;
        debug!(calories, "draft filled from estimate");
        Ok(())
    }

    pub fn has_description(&self) -> bool {
        !self.description.trim().is_empty()
    }

    /// Whether submitting this draft has to estimate calories first.
    pub fn needs_estimation(&self, zero_counts_as_missing: bool) -> bool {
        match self.calories {
            None => true,
            Some(0) => zero_counts_as_missing,
            Some(_) => false,
        }
    }

    pub fn validate(&self) -> Result<ValidatedDraft, CaptureError> {
        let description = self.description.trim();
        if description.is_empty() {
            return Err(CaptureError::Validation("Please enter what you ate.".into()));
        }
        let calories = self
            .calories
            .ok_or_else(|| CaptureError::Validation("Please enter estimated calories.".into()))?;
        Ok(ValidatedDraft {
            description: description.to_string(),
            calories,
            protein: self.protein.unwrap_or(0),
            carbs: self.carbs.unwrap_or(0),
            fat: self.fat.unwrap_or(0),
            estimated: self.estimated,
        })
    }

    fn slot(&mut self, field: MacroField) -> &mut Option<u32> {
        match field {
            MacroField::Calories => &mut self.calories,
            MacroField::Protein => &mut self.protein,
            MacroField::Carbs => &mut self.carbs,
            MacroField::Fat => &mut self.fat,
        }
    }
}

/// Parses a non-negative whole number typed into `field`. Blank input is
/// `Ok(None)`.
pub fn parse_amount(field: MacroField, input: &str) -> Result<Option<u32>, CaptureError> {
    lazy_static! {
        static ref AMOUNT_RE: Regex = Regex::new(r"^\+?(\d{1,9})$").unwrap();
    }
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    AMOUNT_RE
        .captures(input)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .map(Some)
        .ok_or_else(|| {
            CaptureError::Validation(format!(
                "{} must be a whole number, got {:?}",
                field.label(),
                input
            ))
        })
}

fn to_amount(v: f64) -> Option<u32> {
    if v.is_finite() && v >= 0.0 && v <= u32::MAX as f64 {
        Some(v.round() as u32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eggs_estimate() -> Estimation {
        Estimation {
            calories: Some(320.0),
            protein: Some(18.0),
            carbs: Some(28.0),
            fat: Some(14.0),
        }
    }

    #[test]
    fn test_parse_amount() {
        let f = MacroField::Calories;
        assert_eq!(parse_amount(f, ""), Ok(None));
        assert_eq!(parse_amount(f, "   "), Ok(None));
        assert_eq!(parse_amount(f, "450"), Ok(Some(450)));
        assert_eq!(parse_amount(f, " 0 "), Ok(Some(0)));
        assert_eq!(parse_amount(f, "+12"), Ok(Some(12)));
        assert!(parse_amount(f, "12.5").is_err());
        assert!(parse_amount(f, "abc").is_err());
        assert!(parse_amount(f, "9999999999").is_err());
    }

    #[test]
    fn rejected_amount_names_the_field() {
        assert_eq!(
            parse_amount(MacroField::Fat, " -5 "),
            Err(CaptureError::Validation(
                "fat must be a whole number, got \"-5\"".into()
            ))
        );
    }

    #[test]
    fn estimation_marks_draft_estimated() {
        let mut d = ManualDraft::new("2 eggs and toast");
        d.apply_estimation(&eggs_estimate()).unwrap();
        assert!(d.estimated);
        assert_eq!(
            (d.calories, d.protein, d.carbs, d.fat),
            (Some(320), Some(18), Some(28), Some(14))
        );
    }

    #[test]
    fn numeric_edit_clears_estimated() {
        let mut d = ManualDraft::new("2 eggs and toast");
        d.apply_estimation(&eggs_estimate()).unwrap();
        d.set_from_input(MacroField::Protein, "20").unwrap();
        assert!(!d.estimated);
        assert_eq!(d.protein, Some(20));
        assert_eq!(d.calories, Some(320));
    }

    #[test]
    fn description_edit_clears_estimated_but_keeps_numbers() {
        let mut d = ManualDraft::new("2 eggs and toast");
        d.apply_estimation(&eggs_estimate()).unwrap();
        d.set_description("3 eggs and toast");
        assert!(!d.estimated);
        assert_eq!(d.calories, Some(320));
        assert_eq!(d.fat, Some(14));
    }

    #[test]
    fn unchanged_description_keeps_provenance() {
        let mut d = ManualDraft::new("2 eggs and toast");
        d.apply_estimation(&eggs_estimate()).unwrap();
        d.set_description("2 eggs and toast");
        assert!(d.estimated);
    }

    #[test]
    fn invalid_input_leaves_field_alone() {
        let mut d = ManualDraft::new("soup");
        d.set(MacroField::Calories, Some(200));
        let err = d.set_from_input(MacroField::Calories, "lots").unwrap_err();
        assert!(matches!(err, CaptureError::Validation(_)));
        assert_eq!(d.calories, Some(200));
    }

    #[test]
    fn estimate_without_calories_is_rejected() {
        let mut d = ManualDraft::new("mystery");
        d.set(MacroField::Protein, Some(3));
        let err = d
            .apply_estimation(&Estimation {
                calories: None,
                protein: Some(10.0),
                ..Estimation::default()
            })
            .unwrap_err();
        assert!(matches!(err, CaptureError::EstimationFailed(_)));
        assert_eq!(d.protein, Some(3));
        assert!(!d.estimated);
    }

    #[test]
    fn validate_defaults_blank_macros() {
        let mut d = ManualDraft::new("  apple  ");
        d.set(MacroField::Calories, Some(95));
        let v = d.validate().unwrap();
        assert_eq!(v.description, "apple");
        assert_eq!((v.calories, v.protein, v.carbs, v.fat), (95, 0, 0, 0));
        assert!(!v.estimated);
    }

    #[test]
    fn validate_requires_description_and_calories() {
        let mut d = ManualDraft::new(" ");
        d.set(MacroField::Calories, Some(10));
        assert!(matches!(d.validate(), Err(CaptureError::Validation(_))));

        let d = ManualDraft::new("toast");
        assert!(matches!(d.validate(), Err(CaptureError::Validation(_))));
    }

    #[test]
    fn zero_calories_policy() {
        let mut d = ManualDraft::new("black coffee");
        assert!(d.needs_estimation(false));
        d.set(MacroField::Calories, Some(0));
        assert!(d.needs_estimation(true));
        assert!(!d.needs_estimation(false));
        d.set(MacroField::Calories, Some(5));
        assert!(!d.needs_estimation(true));
    }
}
