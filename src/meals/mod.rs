pub mod dto;
pub mod services;

pub use dto::{FoodAnalysis, MealType, UnclearResult};
pub use services::{meal_type_at, meal_type_for_hour, Clock, SystemClock};
