use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::question::{DifficultyLevel, OptionLetter, TryOutQuestion};
use crate::models::subtest::Subtest;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionPayload {
    #[validate(length(min = 1))]
    pub question_text: String,
    #[validate(url)]
    pub image_url: Option<String>,
    pub explanation: Option<String>,
    pub difficulty_level: DifficultyLevel,
    #[validate(range(min = 1))]
    pub order_number: i32,
    #[validate(length(min = 1))]
    pub option_a: String,
    #[validate(length(min = 1))]
    pub option_b: String,
    #[validate(length(min = 1))]
    pub option_c: String,
    #[validate(length(min = 1))]
    pub option_d: String,
    #[validate(length(min = 1))]
    pub option_e: String,
    pub correct_option: OptionLetter,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuestionPayload {
    #[validate(length(min = 1))]
    pub question_text: Option<String>,
    #[validate(url)]
    pub image_url: Option<String>,
    pub explanation: Option<String>,
    pub difficulty_level: Option<DifficultyLevel>,
    #[validate(range(min = 1))]
    pub order_number: Option<i32>,
    #[validate(length(min = 1))]
    pub option_a: Option<String>,
    #[validate(length(min = 1))]
    pub option_b: Option<String>,
    #[validate(length(min = 1))]
    pub option_c: Option<String>,
    #[validate(length(min = 1))]
    pub option_d: Option<String>,
    #[validate(length(min = 1))]
    pub option_e: Option<String>,
    pub correct_option: Option<OptionLetter>,
}

/// Management view of a question, answer key included.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
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

impl From<TryOutQuestion> for QuestionResponse {
    fn from(value: TryOutQuestion) -> Self {
        Self {
            id: value.id,
            try_out_package_id: value.try_out_package_id,
            subtest_id: value.subtest_id,
            question_text: value.question_text,
            image_url: value.image_url,
            explanation: value.explanation,
            difficulty_level: value.difficulty_level,
            order_number: value.order_number,
            option_a: value.option_a,
            option_b: value.option_b,
            option_c: value.option_c,
            option_d: value.option_d,
            option_e: value.option_e,
            correct_option: value.correct_option,
            created_by_user_id: value.created_by_user_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtestResponse {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub question_count: i32,
    pub time_limit_seconds: i32,
    pub max_score: Decimal,
}

impl From<Subtest> for SubtestResponse {
    fn from(value: Subtest) -> Self {
        Self {
            id: value.id,
            code: value.code,
            name: value.name,
            question_count: value.question_count,
            time_limit_seconds: value.time_limit_seconds,
            max_score: value.max_score,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtestQuestionCountResponse {
    #[serde(flatten)]
    pub subtest: SubtestResponse,
    pub current_question_count: i64,
    pub is_complete: bool,
}

impl SubtestQuestionCountResponse {
    pub fn new(subtest: Subtest, current_question_count: i64) -> Self {
        let is_complete = current_question_count >= i64::from(subtest.question_count);
        Self {
            subtest: subtest.into(),
            current_question_count,
            is_complete,
        }
    }
}
