//! Survey records and the derived statistics

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::EmptyRatings;
use crate::error::SourceError;

/// Separator of the persisted food list
pub const FOOD_DELIMITER: char = ',';

/// Split a persisted food list into trimmed, non-empty items
pub fn parse_foods(raw: &str) -> Vec<String> {
    raw.split(FOOD_DELIMITER)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lowercase with all whitespace removed, so `"Pap and Wors"` matches `"papandwors"`
pub fn normalize_food(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// The four 1-5 ratings of one response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ratings {
    pub movies: u8,
    pub radio: u8,
    pub eat_out: u8,
    pub tv: u8,
}

impl Ratings {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(movies: u8, radio: u8, eat_out: u8, tv: u8) -> Self {
        Self {
            movies,
            radio,
            eat_out,
            tv,
        }
    }

    fn validate(&self) -> Result<(), SourceError> {
        for (name, value) in [
            ("movies", self.movies),
            ("radio", self.radio),
            ("eatOut", self.eat_out),
            ("tv", self.tv),
        ] {
            if !(Self::MIN..=Self::MAX).contains(&value) {
                return Err(SourceError::InvalidResponse(format!(
                    "{} rating {} outside {}..={}",
                    name,
                    value,
                    Self::MIN,
                    Self::MAX
                )));
            }
        }
        Ok(())
    }
}

/// One stored survey response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResponse {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub contact_number: String,
    pub date_of_birth: NaiveDate,
    /// Persisted form of the food list
    pub foods: String,
    pub ratings: Ratings,
}

impl SurveyResponse {
    /// Response with placeholder personal details
    pub fn anonymous(date_of_birth: NaiveDate, foods: &str, ratings: Ratings) -> Self {
        Self {
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            contact_number: String::new(),
            date_of_birth,
            foods: foods.to_string(),
            ratings,
        }
    }

    /// Selected foods, parsed
    pub fn food_list(&self) -> Vec<String> {
        parse_foods(&self.foods)
    }

    pub fn validate(&self) -> Result<(), SourceError> {
        self.ratings.validate()
    }
}

/// Average rating per dimension, rounded to one decimal
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingAverages {
    pub movies: Option<f64>,
    pub radio: Option<f64>,
    pub eat_out: Option<f64>,
    pub tv: Option<f64>,
}

impl RatingAverages {
    /// Apply `f` to every dimension
    pub fn map(self, f: impl Fn(Option<f64>) -> Option<f64>) -> Self {
        Self {
            movies: f(self.movies),
            radio: f(self.radio),
            eat_out: f(self.eat_out),
            tv: f(self.tv),
        }
    }

    /// Round present averages and fill absent ones per `policy`
    pub fn resolve(self, policy: EmptyRatings) -> Self {
        self.map(|avg| match (avg, policy) {
            (Some(value), _) => Some(crate::repository::round1(value)),
            (None, EmptyRatings::Zero) => Some(0.0),
            (None, EmptyRatings::Null) => None,
        })
    }
}

/// Age in whole years across all responses
///
/// All fields are null when no response has a valid age.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AgeStats {
    pub avg: Option<f64>,
    pub min: Option<u32>,
    pub max: Option<u32>,
}

/// How many responses selected one food
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodCount {
    pub food: String,
    pub count: u64,
}

impl FoodCount {
    pub fn new(food: impl Into<String>, count: u64) -> Self {
        Self {
            food: food.into(),
            count,
        }
    }
}

/// Share of responses selecting each named food, 0-100 or null when empty
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodPercentages {
    pub pizza: Option<f64>,
    pub pasta: Option<f64>,
    pub pap_and_wors: Option<f64>,
}

/// Payload of a results read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResults {
    pub total_count: u64,
    pub age: AgeStats,
    pub food_percentages: FoodPercentages,
    pub avg_ratings: RatingAverages,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_foods_trims_and_drops_empty() {
        assert_eq!(parse_foods(" Pizza , Pasta "), vec!["Pizza", "Pasta"]);
        assert_eq!(parse_foods("Pizza,,  ,Burger"), vec!["Pizza", "Burger"]);
        assert!(parse_foods("").is_empty());
    }

    #[test]
    fn test_rating_range() {
        let dob = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
        let ok = SurveyResponse::anonymous(dob, "Pizza", Ratings::new(1, 5, 3, 2));
        assert!(ok.validate().is_ok());

        let bad = SurveyResponse::anonymous(dob, "Pizza", Ratings::new(1, 6, 3, 2));
        assert!(matches!(bad.validate(), Err(SourceError::InvalidResponse(_))));
        let zero = SurveyResponse::anonymous(dob, "Pizza", Ratings::new(0, 1, 1, 1));
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_resolve_empty_ratings() {
        let empty = RatingAverages::default();
        assert_eq!(
            empty.resolve(EmptyRatings::Zero),
            RatingAverages {
                movies: Some(0.0),
                radio: Some(0.0),
                eat_out: Some(0.0),
                tv: Some(0.0),
            }
        );
        assert_eq!(empty.resolve(EmptyRatings::Null), RatingAverages::default());
    }

    #[test]
    fn test_results_wire_shape() {
        let results = SurveyResults {
            total_count: 0,
            age: AgeStats::default(),
            food_percentages: FoodPercentages::default(),
            avg_ratings: RatingAverages::default().resolve(EmptyRatings::Zero),
        };
        let json = serde_json::to_value(&results).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "totalCount": 0,
                "age": {"avg": null, "min": null, "max": null},
                "foodPercentages": {"pizza": null, "pasta": null, "papAndWors": null},
                "avgRatings": {"movies": 0.0, "radio": 0.0, "eatOut": 0.0, "tv": 0.0}
            })
        );
    }
}
