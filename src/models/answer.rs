use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::question::OptionLetter;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserTryOutAnswer {
    pub id: i64,
    pub attempt_id: i64,
    pub question_id: i64,
    pub selected_option: Option<OptionLetter>,
    pub is_correct: Option<bool>,
    pub answered_at: Option<DateTime<Utc>>,
}
