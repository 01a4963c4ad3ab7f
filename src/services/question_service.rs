use std::collections::HashMap;

use sqlx::PgPool;

use crate::dto::question_dto::{CreateQuestionPayload, SubtestQuestionCountResponse, UpdateQuestionPayload};
use crate::error::{Error, Result};
use crate::models::question::TryOutQuestion;
use crate::models::subtest::Subtest;
use crate::services::subtest_service::SubtestService;
use crate::services::tryout_service::TryOutService;

const QUESTION_COLUMNS: &str = r#"
    id, try_out_package_id, subtest_id, question_text, image_url, explanation,
    difficulty_level, order_number, option_a, option_b, option_c, option_d, option_e,
    correct_option, created_by_user_id, created_at, updated_at
"#;

fn check_order_number(order_number: i32, subtest: &Subtest) -> Result<()> {
    if order_number < 1 || order_number > subtest.question_count {
        return Err(Error::BadRequest(format!(
            "order number must be between 1 and {} for {}",
            subtest.question_count, subtest.code
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct QuestionService {
    pool: PgPool,
    subtests: SubtestService,
    tryouts: TryOutService,
}

impl QuestionService {
    pub fn new(pool: PgPool, subtests: SubtestService, tryouts: TryOutService) -> Self {
        Self {
            pool,
            subtests,
            tryouts,
        }
    }

    /// Admins manage every package; tutors only the ones they were granted.
    pub async fn ensure_can_manage(&self, package_id: i64, user_id: i64, is_admin: bool) -> Result<()> {
        self.tryouts.get_by_id(package_id).await?;
        if is_admin {
            return Ok(());
        }
        if !self.tryouts.has_tutor_permission(package_id, user_id).await? {
            tracing::warn!(try_out_id = package_id, user_id, "Tutor without permission tried to manage questions");
            return Err(Error::Forbidden(
                "you do not have permission to manage this try out".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<TryOutQuestion> {
        let sql = format!("SELECT {QUESTION_COLUMNS} FROM try_out_questions WHERE id = $1");
        sqlx::query_as::<_, TryOutQuestion>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("question not found".to_string()))
    }

    pub async fn subtests_with_counts(&self, package_id: i64) -> Result<Vec<SubtestQuestionCountResponse>> {
        let catalog = self.subtests.list().await?;
        let counts: Vec<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT subtest_id, COUNT(*)
            FROM try_out_questions
            WHERE try_out_package_id = $1
            GROUP BY subtest_id
            "#,
        )
        .bind(package_id)
        .fetch_all(&self.pool)
        .await?;
        let counts: HashMap<i64, i64> = counts.into_iter().collect();

        Ok(catalog
            .into_iter()
            .map(|subtest| {
                let count = counts.get(&subtest.id).copied().unwrap_or(0);
                SubtestQuestionCountResponse::new(subtest, count)
            })
            .collect())
    }

    /// Questions ordered by subtest then `order_number`.
    pub async fn list_by_package(&self, package_id: i64) -> Result<Vec<TryOutQuestion>> {
        let sql = format!(
            r#"
            SELECT {QUESTION_COLUMNS}
            FROM try_out_questions
            WHERE try_out_package_id = $1
            ORDER BY subtest_id, order_number, id
            "#
        );
        let questions = sqlx::query_as::<_, TryOutQuestion>(&sql)
            .bind(package_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(questions)
    }

    pub async fn list_by_subtest(&self, package_id: i64, subtest_id: i64) -> Result<Vec<TryOutQuestion>> {
        let sql = format!(
            r#"
            SELECT {QUESTION_COLUMNS}
            FROM try_out_questions
            WHERE try_out_package_id = $1 AND subtest_id = $2
            ORDER BY order_number, id
            "#
        );
        let questions = sqlx::query_as::<_, TryOutQuestion>(&sql)
            .bind(package_id)
            .bind(subtest_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(questions)
    }

    pub async fn create(
        &self,
        package_id: i64,
        subtest_id: i64,
        payload: CreateQuestionPayload,
        created_by: i64,
    ) -> Result<TryOutQuestion> {
        let subtest = self.subtests.get_by_id(subtest_id).await?;
        check_order_number(payload.order_number, &subtest)?;

        let mut tx = self.pool.begin().await?;

        // Serializes concurrent creates for one package so the count check holds.
        let locked: Option<i64> =
            sqlx::query_scalar("SELECT id FROM try_out_packages WHERE id = $1 FOR UPDATE")
                .bind(package_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(Error::NotFound("try out not found".to_string()));
        }

        let existing: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM try_out_questions WHERE try_out_package_id = $1 AND subtest_id = $2",
        )
        .bind(package_id)
        .bind(subtest_id)
        .fetch_one(&mut *tx)
        .await?;
        if existing >= i64::from(subtest.question_count) {
            return Err(Error::Conflict(format!(
                "subtest {} already has {} questions",
                subtest.code, subtest.question_count
            )));
        }

        let sql = format!(
            r#"
            INSERT INTO try_out_questions (
                try_out_package_id, subtest_id, question_text, image_url, explanation,
                difficulty_level, order_number, option_a, option_b, option_c, option_d, option_e,
                correct_option, created_by_user_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {QUESTION_COLUMNS}
            "#
        );
        let question = sqlx::query_as::<_, TryOutQuestion>(&sql)
            .bind(package_id)
            .bind(subtest_id)
            .bind(payload.question_text)
            .bind(payload.image_url)
            .bind(payload.explanation)
            .bind(payload.difficulty_level)
            .bind(payload.order_number)
            .bind(payload.option_a)
            .bind(payload.option_b)
            .bind(payload.option_c)
            .bind(payload.option_d)
            .bind(payload.option_e)
            .bind(payload.correct_option)
            .bind(created_by)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            question_id = question.id,
            try_out_id = package_id,
            subtest = %subtest.code,
            "Question created"
        );
        Ok(question)
    }

    pub async fn update(&self, id: i64, payload: UpdateQuestionPayload) -> Result<TryOutQuestion> {
        let existing = self.get_by_id(id).await?;
        if let Some(order_number) = payload.order_number {
            let subtest = self.subtests.get_by_id(existing.subtest_id).await?;
            check_order_number(order_number, &subtest)?;
        }

        let sql = format!(
            r#"
            UPDATE try_out_questions
            SET
                question_text = COALESCE($2, question_text),
                image_url = COALESCE($3, image_url),
                explanation = COALESCE($4, explanation),
                difficulty_level = COALESCE($5, difficulty_level),
                order_number = COALESCE($6, order_number),
                option_a = COALESCE($7, option_a),
                option_b = COALESCE($8, option_b),
                option_c = COALESCE($9, option_c),
                option_d = COALESCE($10, option_d),
                option_e = COALESCE($11, option_e),
                correct_option = COALESCE($12, correct_option),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {QUESTION_COLUMNS}
            "#
        );
        let question = sqlx::query_as::<_, TryOutQuestion>(&sql)
            .bind(id)
            .bind(payload.question_text)
            .bind(payload.image_url)
            .bind(payload.explanation)
            .bind(payload.difficulty_level)
            .bind(payload.order_number)
            .bind(payload.option_a)
            .bind(payload.option_b)
            .bind(payload.option_c)
            .bind(payload.option_d)
            .bind(payload.option_e)
            .bind(payload.correct_option)
            .fetch_one(&self.pool)
            .await?;

        tracing::info!(question_id = id, "Question updated");
        Ok(question)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM try_out_questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("question not found".to_string()));
        }
        tracing::info!(question_id = id, "Question deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn order_number_must_fit_the_subtest() {
        let subtest = Subtest {
            id: 3,
            code: "PPU".into(),
            name: "Pengetahuan dan Pemahaman Umum".into(),
            question_count: 20,
            time_limit_seconds: 900,
            max_score: Decimal::new(87596, 2),
        };
        assert!(check_order_number(1, &subtest).is_ok());
        assert!(check_order_number(20, &subtest).is_ok());
        assert!(matches!(check_order_number(0, &subtest), Err(Error::BadRequest(_))));
        assert!(matches!(check_order_number(21, &subtest), Err(Error::BadRequest(_))));
    }
}
