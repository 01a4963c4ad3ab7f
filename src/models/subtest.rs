use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subtest {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub question_count: i32,
    pub time_limit_seconds: i32,
    pub max_score: Decimal,
}
