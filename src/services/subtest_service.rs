use sqlx::PgPool;

use crate::error::{Error, Result};
use crate::models::subtest::Subtest;

#[derive(Clone)]
pub struct SubtestService {
    pool: PgPool,
}

impl SubtestService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Catalog order is insertion order.
    pub async fn list(&self) -> Result<Vec<Subtest>> {
        let subtests = sqlx::query_as::<_, Subtest>(
            r#"
            SELECT id, code, name, question_count, time_limit_seconds, max_score
            FROM subtests
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(subtests)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Subtest> {
        sqlx::query_as::<_, Subtest>(
            r#"
            SELECT id, code, name, question_count, time_limit_seconds, max_score
            FROM subtests
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("subtest not found".to_string()))
    }

    pub async fn first(&self) -> Result<Option<Subtest>> {
        let subtest = sqlx::query_as::<_, Subtest>(
            r#"
            SELECT id, code, name, question_count, time_limit_seconds, max_score
            FROM subtests
            ORDER BY id
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(subtest)
    }
}
