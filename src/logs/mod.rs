pub mod dto;
pub mod services;

pub use dto::{DailyLog, FoodLogEntry, LoggedFood, NutritionTotals, SavedLog};
pub use services::{HttpLogStore, LogStore, LogSubmitter};
