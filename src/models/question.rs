use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "difficulty_level", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DifficultyLevel {
    Easy,
    Medium,
    Hard,
}

impl DifficultyLevel {
    /// Points a correct answer contributes to a subtest's raw score.
    pub fn weight(self) -> Decimal {
        match self {
            DifficultyLevel::Easy => Decimal::new(10, 1),
            DifficultyLevel::Medium => Decimal::new(15, 1),
            DifficultyLevel::Hard => Decimal::new(20, 1),
        }
    }

    /// The largest weight; a subtest's raw-score ceiling is
    /// `question_count * max_weight()`.
    pub fn max_weight() -> Decimal {
        DifficultyLevel::Hard.weight()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "option_letter")]
pub enum OptionLetter {
    A,
    B,
    C,
    D,
    E,
}

impl std::str::FromStr for OptionLetter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(OptionLetter::A),
            "B" => Ok(OptionLetter::B),
            "C" => Ok(OptionLetter::C),
            "D" => Ok(OptionLetter::D),
            "E" => Ok(OptionLetter::E),
            other => Err(format!("'{}' is not one of A, B, C, D, E", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TryOutQuestion {
    pub id: i64,
    pub try_out_package_id: i64,
    pub subtest_id: i64,
    pub question_text: String,
    pub image_url: Option<String>,
    pub explanation: Option<String>,
    pub difficulty_level: DifficultyLevel,
    pub order_number: i32,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub option_e: String,
    pub correct_option: OptionLetter,
    pub created_by_user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_follow_difficulty() {
        assert_eq!(DifficultyLevel::Easy.weight(), Decimal::ONE);
        assert_eq!(DifficultyLevel::Medium.weight(), Decimal::new(15, 1));
        assert_eq!(DifficultyLevel::max_weight(), Decimal::TWO);
    }

    #[test]
    fn option_letter_parses_uppercase_only() {
        assert_eq!("C".parse::<OptionLetter>(), Ok(OptionLetter::C));
        assert!("c".parse::<OptionLetter>().is_err());
        assert!("F".parse::<OptionLetter>().is_err());
    }
}
