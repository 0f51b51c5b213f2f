use time::OffsetDateTime;

use super::dto::MealType;

/// Source of wall-clock time. Meal type auto-selection depends on the local hour.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        // Local offset can be unavailable (multi-threaded process on some
        // platforms); UTC is the fallback.
        OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
    }
}

/// Local hour to meal: 5-10 breakfast, 11-14 lunch, 17-20 dinner, otherwise snack.
pub fn meal_type_for_hour(hour: u8) -> MealType {
    match hour {
        5..=10 => MealType::Breakfast,
        11..=14 => MealType::Lunch,
        17..=20 => MealType::Dinner,
        _ => MealType::Snack,
    }
}

pub fn meal_type_at(clock: &dyn Clock) -> MealType {
    meal_type_for_hour(clock.now().hour())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hour_boundaries() {
        assert_eq!(meal_type_for_hour(4), MealType::Snack);
        assert_eq!(meal_type_for_hour(5), MealType::Breakfast);
        assert_eq!(meal_type_for_hour(10), MealType::Breakfast);
        assert_eq!(meal_type_for_hour(11), MealType::Lunch);
        assert_eq!(meal_type_for_hour(14), MealType::Lunch);
        assert_eq!(meal_type_for_hour(15), MealType::Snack);
        assert_eq!(meal_type_for_hour(16), MealType::Snack);
        assert_eq!(meal_type_for_hour(17), MealType::Dinner);
        assert_eq!(meal_type_for_hour(20), MealType::Dinner);
        assert_eq!(meal_type_for_hour(21), MealType::Snack);
        assert_eq!(meal_type_for_hour(23), MealType::Snack);
        assert_eq!(meal_type_for_hour(0), MealType::Snack);
    }

    #[test]
    fn meal_type_follows_clock() {
        struct Noon;
        impl Clock for Noon {
            fn now(&self) -> OffsetDateTime {
                time::macros::datetime!(2024-03-01 12:30 UTC)
            }
        }
        assert_eq!(meal_type_at(&Noon), MealType::Lunch);
    }
}
