use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "attempt_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl AttemptStatus {
    pub fn can_transition_to(self, next: AttemptStatus) -> bool {
        matches!(
            (self, next),
            (AttemptStatus::NotStarted, AttemptStatus::InProgress)
                | (AttemptStatus::InProgress, AttemptStatus::Completed)
        )
    }
}

/// An attempt together with the registration fields every attempt
/// operation needs for ownership and question lookups.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TryOutAttempt {
    pub id: i64,
    pub registration_id: i64,
    pub status: AttemptStatus,
    pub current_subtest_id: Option<i64>,
    pub total_score: Option<Decimal>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub user_id: i64,
    pub try_out_package_id: i64,
    pub try_out_name: String,
}

/// Per-subtest progress, as stored in `subtest_results`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SubtestResult {
    pub id: i64,
    pub attempt_id: i64,
    pub subtest_id: i64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub correct_count: i32,
    pub wrong_count: i32,
    pub unanswered_count: i32,
    pub raw_score: Option<Decimal>,
    pub final_score: Option<Decimal>,
}

impl SubtestResult {
    pub fn is_submitted(&self) -> bool {
        self.finished_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LeaderboardRow {
    pub user_id: i64,
    pub username: String,
    pub total_score: Decimal,
    pub finished_at: Option<DateTime<Utc>>,
}
