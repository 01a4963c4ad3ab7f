use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::dto::question_dto::SubtestResponse;
use crate::models::attempt::{AttemptStatus, LeaderboardRow, SubtestResult, TryOutAttempt};
use crate::models::question::{DifficultyLevel, OptionLetter, TryOutQuestion};
use crate::models::subtest::Subtest;

/// Treats `""` (and whitespace) the same as a missing option so a cleared
/// radio button is stored as unanswered.
fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<OptionLetter>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(letter) => letter.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerInput {
    pub question_id: i64,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub selected_option: Option<OptionLetter>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSubtestPayload {
    #[validate(length(max = 200))]
    pub answers: Vec<SubmitAnswerInput>,
}

impl SubmitSubtestPayload {
    pub fn selections(&self) -> Vec<(i64, Option<OptionLetter>)> {
        self.answers
            .iter()
            .map(|a| (a.question_id, a.selected_option))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TryOutBrief {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtestResultResponse {
    pub id: i64,
    pub subtest_id: i64,
    pub subtest: Option<SubtestResponse>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub correct_count: i32,
    pub wrong_count: i32,
    pub unanswered_count: i32,
    pub raw_score: Option<Decimal>,
    pub final_score: Option<Decimal>,
}

impl SubtestResultResponse {
    pub fn new(result: SubtestResult, subtest: Option<&Subtest>) -> Self {
        Self {
            id: result.id,
            subtest_id: result.subtest_id,
            subtest: subtest.cloned().map(Into::into),
            started_at: result.started_at,
            finished_at: result.finished_at,
            correct_count: result.correct_count,
            wrong_count: result.wrong_count,
            unanswered_count: result.unanswered_count,
            raw_score: result.raw_score,
            final_score: result.final_score,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSubtestResponse {
    #[serde(flatten)]
    pub result: SubtestResultResponse,
    pub skipped_question_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAnswersResponse {
    pub saved_count: usize,
    pub skipped_question_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResponse {
    pub id: i64,
    pub registration_id: i64,
    pub try_out: TryOutBrief,
    pub status: AttemptStatus,
    pub current_subtest_id: Option<i64>,
    pub total_score: Option<Decimal>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub subtest_results: Vec<SubtestResultResponse>,
}

impl AttemptResponse {
    pub fn new(attempt: TryOutAttempt, results: Vec<SubtestResult>, catalog: &[Subtest]) -> Self {
        let subtest_results = results
            .into_iter()
            .map(|r| {
                let subtest = catalog.iter().find(|s| s.id == r.subtest_id);
                SubtestResultResponse::new(r, subtest)
            })
            .collect();

        Self {
            id: attempt.id,
            registration_id: attempt.registration_id,
            try_out: TryOutBrief {
                id: attempt.try_out_package_id,
                name: attempt.try_out_name,
            },
            status: attempt.status,
            current_subtest_id: attempt.current_subtest_id,
            total_score: attempt.total_score,
            started_at: attempt.started_at,
            finished_at: attempt.finished_at,
            subtest_results,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtestProgressStatus {
    NotStarted,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtestProgressResponse {
    pub subtest_id: i64,
    pub subtest_code: String,
    pub subtest_name: String,
    pub status: SubtestProgressStatus,
    pub answered_count: i64,
    pub total_count: i32,
}

/// One progress row per catalog subtest. Submitted subtests count their
/// graded answers; open ones count the answers saved so far.
pub fn build_progress(
    catalog: &[Subtest],
    results: &[SubtestResult],
    answered_by_subtest: &HashMap<i64, i64>,
) -> Vec<SubtestProgressResponse> {
    catalog
        .iter()
        .map(|subtest| {
            let result = results.iter().find(|r| r.subtest_id == subtest.id);
            let (status, answered_count) = match result {
                Some(r) if r.is_submitted() => (
                    SubtestProgressStatus::Completed,
                    i64::from(r.correct_count + r.wrong_count),
                ),
                Some(_) => (
                    SubtestProgressStatus::InProgress,
                    answered_by_subtest.get(&subtest.id).copied().unwrap_or(0),
                ),
                None => (SubtestProgressStatus::NotStarted, 0),
            };
            SubtestProgressResponse {
                subtest_id: subtest.id,
                subtest_code: subtest.code.clone(),
                subtest_name: subtest.name.clone(),
                status,
                answered_count,
                total_count: subtest.question_count,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptStateResponse {
    pub id: i64,
    pub status: AttemptStatus,
    pub try_out: TryOutBrief,
    pub current_subtest: Option<SubtestResponse>,
    /// Seconds left on the current subtest, absent until it is started.
    pub time_remaining: Option<i64>,
    pub subtest_progress: Vec<SubtestProgressResponse>,
}

/// Exam view of a question: no answer key, no explanation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionForExamResponse {
    pub id: i64,
    pub subtest_id: i64,
    pub order_number: i32,
    pub question_text: String,
    pub image_url: Option<String>,
    pub difficulty_level: DifficultyLevel,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub option_e: String,
    pub selected_option: Option<OptionLetter>,
}

impl QuestionForExamResponse {
    pub fn new(question: TryOutQuestion, selected_option: Option<OptionLetter>) -> Self {
        Self {
            id: question.id,
            subtest_id: question.subtest_id,
            order_number: question.order_number,
            question_text: question.question_text,
            image_url: question.image_url,
            difficulty_level: question.difficulty_level,
            option_a: question.option_a,
            option_b: question.option_b,
            option_c: question.option_c,
            option_d: question.option_d,
            option_e: question.option_e,
            selected_option,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSubtestResponse {
    pub subtest: SubtestResponse,
    pub started_at: DateTime<Utc>,
    pub time_remaining: i64,
    pub questions: Vec<QuestionForExamResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntryResponse {
    pub rank: usize,
    pub user_id: i64,
    pub username: String,
    pub total_score: Decimal,
    pub finished_at: Option<DateTime<Utc>>,
}

impl LeaderboardEntryResponse {
    /// Rows must already be in leaderboard order; ranks are 1-based and
    /// never shared.
    pub fn ranked(rows: Vec<LeaderboardRow>) -> Vec<Self> {
        rows.into_iter()
            .enumerate()
            .map(|(index, row)| Self {
                rank: index + 1,
                user_id: row.user_id,
                username: row.username,
                total_score: row.total_score,
                finished_at: row.finished_at,
            })
            .collect()
    }
}
