use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use crate::dto::attempt_dto::{
    build_progress, AttemptResponse, AttemptStateResponse, LeaderboardEntryResponse,
    QuestionForExamResponse, SaveAnswersResponse, StartSubtestResponse, SubmitSubtestResponse,
    SubtestResultResponse, TryOutBrief,
};
use crate::error::{Error, Result};
use crate::models::answer::UserTryOutAnswer;
use crate::models::attempt::{AttemptStatus, LeaderboardRow, SubtestResult, TryOutAttempt};
use crate::models::question::OptionLetter;
use crate::models::registration::PaymentStatus;
use crate::models::subtest::Subtest;
use crate::services::question_service::QuestionService;
use crate::services::registration_service::RegistrationService;
use crate::services::scoring_service::{GradedAnswer, ScoringService};
use crate::services::subtest_service::SubtestService;
use crate::services::tryout_service::TryOutService;
use crate::utils::time::{seconds_remaining, Clock};

pub const LEADERBOARD_LIMIT: i64 = 100;

const ATTEMPT_SELECT: &str = r#"
    SELECT a.id, a.registration_id, a.status, a.current_subtest_id, a.total_score,
           a.started_at, a.finished_at, r.user_id, r.try_out_package_id,
           p.name AS try_out_name
    FROM try_out_attempts a
    JOIN try_out_registrations r ON r.id = a.registration_id
    JOIN try_out_packages p ON p.id = r.try_out_package_id
"#;

const RESULT_COLUMNS: &str = r#"
    id, attempt_id, subtest_id, started_at, finished_at, correct_count, wrong_count,
    unanswered_count, raw_score, final_score
"#;

fn ensure_owner(attempt: &TryOutAttempt, user_id: i64, action: &str) -> Result<()> {
    if attempt.user_id != user_id {
        return Err(Error::Forbidden(format!("you can only {} your own attempt", action)));
    }
    Ok(())
}

fn ensure_in_progress(attempt: &TryOutAttempt) -> Result<()> {
    match attempt.status {
        AttemptStatus::InProgress => Ok(()),
        AttemptStatus::Completed => Err(Error::Conflict("attempt is already completed".to_string())),
        AttemptStatus::NotStarted => Err(Error::Conflict("attempt has not been started".to_string())),
    }
}

#[derive(Clone)]
pub struct AttemptService {
    pool: PgPool,
    subtests: SubtestService,
    questions: QuestionService,
    registrations: RegistrationService,
    tryouts: TryOutService,
    clock: Arc<dyn Clock>,
    /// When set, submissions later than the time limit plus this many
    /// seconds are refused.
    grace_seconds: Option<i64>,
}

impl AttemptService {
    pub fn new(
        pool: PgPool,
        subtests: SubtestService,
        questions: QuestionService,
        registrations: RegistrationService,
        tryouts: TryOutService,
        clock: Arc<dyn Clock>,
        grace_seconds: Option<i64>,
    ) -> Self {
        Self {
            pool,
            subtests,
            questions,
            registrations,
            tryouts,
            clock,
            grace_seconds,
        }
    }

    async fn find(&self, attempt_id: i64) -> Result<TryOutAttempt> {
        let sql = format!("{ATTEMPT_SELECT} WHERE a.id = $1");
        sqlx::query_as::<_, TryOutAttempt>(&sql)
            .bind(attempt_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("attempt not found".to_string()))
    }

    /// Row-locks the attempt for the rest of the transaction. Every writer
    /// takes this lock first so submits and finish never interleave.
    async fn lock(tx: &mut Transaction<'_, Postgres>, attempt_id: i64) -> Result<TryOutAttempt> {
        let sql = format!("{ATTEMPT_SELECT} WHERE a.id = $1 FOR UPDATE OF a");
        sqlx::query_as::<_, TryOutAttempt>(&sql)
            .bind(attempt_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| Error::NotFound("attempt not found".to_string()))
    }

    async fn results(&self, attempt_id: i64) -> Result<Vec<SubtestResult>> {
        let sql = format!(
            "SELECT {RESULT_COLUMNS} FROM subtest_results WHERE attempt_id = $1 ORDER BY subtest_id"
        );
        let results = sqlx::query_as::<_, SubtestResult>(&sql)
            .bind(attempt_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(results)
    }

    async fn response(&self, attempt: TryOutAttempt) -> Result<AttemptResponse> {
        let results = self.results(attempt.id).await?;
        let catalog = self.subtests.list().await?;
        Ok(AttemptResponse::new(attempt, results, &catalog))
    }

    async fn selections(&self, attempt_id: i64, subtest_id: i64) -> Result<HashMap<i64, Option<OptionLetter>>> {
        let rows = sqlx::query_as::<_, UserTryOutAnswer>(
            r#"
            SELECT ans.id, ans.attempt_id, ans.question_id, ans.selected_option,
                   ans.is_correct, ans.answered_at
            FROM user_try_out_answers ans
            JOIN try_out_questions q ON q.id = ans.question_id
            WHERE ans.attempt_id = $1 AND q.subtest_id = $2
            "#,
        )
        .bind(attempt_id)
        .bind(subtest_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|answer| (answer.question_id, answer.selected_option))
            .collect())
    }

    async fn store_answers(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        attempt_id: i64,
        answers: &[GradedAnswer],
    ) -> Result<()> {
        let now = self.clock.now();
        for answer in answers {
            sqlx::query(
                r#"
                INSERT INTO user_try_out_answers (attempt_id, question_id, selected_option, is_correct, answered_at)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (attempt_id, question_id) DO UPDATE
                SET selected_option = EXCLUDED.selected_option,
                    is_correct = EXCLUDED.is_correct,
                    answered_at = EXCLUDED.answered_at
                "#,
            )
            .bind(attempt_id)
            .bind(answer.question_id)
            .bind(answer.selected_option)
            .bind(answer.is_correct)
            .bind(answer.selected_option.map(|_| now))
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Opens (or returns) the attempt for an approved registration.
    /// Concurrent calls converge on the same row.
    pub async fn start_attempt(&self, registration_id: i64, user_id: i64) -> Result<AttemptResponse> {
        let registration = self.registrations.get_by_id(registration_id).await?;
        if registration.user_id != user_id {
            return Err(Error::Forbidden(
                "you can only start an attempt for your own registration".to_string(),
            ));
        }
        if registration.payment_status != PaymentStatus::Approved {
            return Err(Error::PaymentRequired(format!(
                "payment is {}, it must be approved before starting",
                registration.payment_status
            )));
        }

        let first_subtest = self.subtests.first().await?;
        let created: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO try_out_attempts (registration_id, status, current_subtest_id, started_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (registration_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(registration_id)
        .bind(AttemptStatus::InProgress)
        .bind(first_subtest.map(|s| s.id))
        .bind(self.clock.now())
        .fetch_optional(&self.pool)
        .await?;

        let attempt_id = match created {
            Some(id) => {
                tracing::info!(attempt_id = id, registration_id, user_id, "Attempt started");
                id
            }
            None => {
                let id: i64 = sqlx::query_scalar("SELECT id FROM try_out_attempts WHERE registration_id = $1")
                    .bind(registration_id)
                    .fetch_one(&self.pool)
                    .await?;
                tracing::debug!(attempt_id = id, registration_id, "Returning existing attempt");
                id
            }
        };

        let attempt = self.find(attempt_id).await?;
        self.response(attempt).await
    }

    pub async fn current_state(&self, attempt_id: i64, user_id: i64) -> Result<AttemptStateResponse> {
        let attempt = self.find(attempt_id).await?;
        ensure_owner(&attempt, user_id, "view")?;

        let catalog = self.subtests.list().await?;
        let results = self.results(attempt_id).await?;

        let answered: Vec<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT q.subtest_id, COUNT(*)
            FROM user_try_out_answers ans
            JOIN try_out_questions q ON q.id = ans.question_id
            WHERE ans.attempt_id = $1 AND ans.selected_option IS NOT NULL
            GROUP BY q.subtest_id
            "#,
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;
        let answered: HashMap<i64, i64> = answered.into_iter().collect();

        let current_subtest = attempt
            .current_subtest_id
            .and_then(|id| catalog.iter().find(|s| s.id == id))
            .cloned();
        let time_remaining = current_subtest.as_ref().and_then(|subtest| {
            results
                .iter()
                .find(|r| r.subtest_id == subtest.id)
                .map(|r| seconds_remaining(r.started_at, subtest.time_limit_seconds, self.clock.now()))
        });

        Ok(AttemptStateResponse {
            id: attempt.id,
            status: attempt.status,
            try_out: TryOutBrief {
                id: attempt.try_out_package_id,
                name: attempt.try_out_name,
            },
            current_subtest: current_subtest.map(Into::into),
            time_remaining,
            subtest_progress: build_progress(&catalog, &results, &answered),
        })
    }

    /// Enters a subtest. The first entry stamps `started_at`; later entries
    /// resume the same clock. Submitted subtests cannot be reopened.
    pub async fn start_subtest(
        &self,
        attempt_id: i64,
        subtest_id: i64,
        user_id: i64,
    ) -> Result<StartSubtestResponse> {
        let subtest = self.subtests.get_by_id(subtest_id).await?;

        let mut tx = self.pool.begin().await?;
        let attempt = Self::lock(&mut tx, attempt_id).await?;
        ensure_owner(&attempt, user_id, "access")?;
        ensure_in_progress(&attempt)?;

        sqlx::query(
            r#"
            INSERT INTO subtest_results (attempt_id, subtest_id, started_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (attempt_id, subtest_id) DO NOTHING
            "#,
        )
        .bind(attempt_id)
        .bind(subtest_id)
        .bind(self.clock.now())
        .execute(&mut *tx)
        .await?;

        let sql = format!(
            "SELECT {RESULT_COLUMNS} FROM subtest_results WHERE attempt_id = $1 AND subtest_id = $2"
        );
        let result = sqlx::query_as::<_, SubtestResult>(&sql)
            .bind(attempt_id)
            .bind(subtest_id)
            .fetch_one(&mut *tx)
            .await?;
        if result.is_submitted() {
            return Err(Error::Conflict("subtest has already been submitted".to_string()));
        }

        sqlx::query("UPDATE try_out_attempts SET current_subtest_id = $2 WHERE id = $1")
            .bind(attempt_id)
            .bind(subtest_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let selections = self.selections(attempt_id, subtest_id).await?;
        let questions = self
            .questions
            .list_by_subtest(attempt.try_out_package_id, subtest_id)
            .await?
            .into_iter()
            .map(|q| {
                let selected = selections.get(&q.id).copied().flatten();
                QuestionForExamResponse::new(q, selected)
            })
            .collect();

        tracing::info!(attempt_id, subtest = %subtest.code, "Subtest entered");
        Ok(StartSubtestResponse {
            time_remaining: seconds_remaining(result.started_at, subtest.time_limit_seconds, self.clock.now()),
            started_at: result.started_at,
            subtest: subtest.into(),
            questions,
        })
    }

    /// Loads and checks the started, unsubmitted result row under lock.
    async fn lock_open_result(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        attempt_id: i64,
        subtest: &Subtest,
    ) -> Result<SubtestResult> {
        let sql = format!(
            "SELECT {RESULT_COLUMNS} FROM subtest_results WHERE attempt_id = $1 AND subtest_id = $2 FOR UPDATE"
        );
        let result = sqlx::query_as::<_, SubtestResult>(&sql)
            .bind(attempt_id)
            .bind(subtest.id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| Error::Conflict("subtest has not been started".to_string()))?;

        if result.is_submitted() {
            return Err(Error::Conflict("subtest has already been submitted".to_string()));
        }

        if let Some(grace) = self.grace_seconds {
            let deadline = result.started_at
                + Duration::seconds(i64::from(subtest.time_limit_seconds) + grace);
            if self.clock.now() > deadline {
                tracing::warn!(attempt_id, subtest = %subtest.code, "Submission after time limit refused");
                return Err(Error::Conflict("subtest time limit exceeded".to_string()));
            }
        }
        Ok(result)
    }

    /// Stores answers without closing the subtest.
    pub async fn save_answers(
        &self,
        attempt_id: i64,
        subtest_id: i64,
        selections: &[(i64, Option<OptionLetter>)],
        user_id: i64,
    ) -> Result<SaveAnswersResponse> {
        let subtest = self.subtests.get_by_id(subtest_id).await?;

        let mut tx = self.pool.begin().await?;
        let attempt = Self::lock(&mut tx, attempt_id).await?;
        ensure_owner(&attempt, user_id, "answer in")?;
        ensure_in_progress(&attempt)?;
        self.lock_open_result(&mut tx, attempt_id, &subtest).await?;

        let questions = self
            .questions
            .list_by_subtest(attempt.try_out_package_id, subtest_id)
            .await?;
        let (answers, skipped) = ScoringService::grade_answers(&questions, selections);
        self.store_answers(&mut tx, attempt_id, &answers).await?;
        tx.commit().await?;

        if !skipped.is_empty() {
            tracing::warn!(attempt_id, subtest = %subtest.code, skipped = ?skipped, "Ignored answers for unknown questions");
        }
        Ok(SaveAnswersResponse {
            saved_count: answers.len(),
            skipped_question_ids: skipped,
        })
    }

    /// Grades and closes a subtest. Exactly one submission per subtest
    /// succeeds; the rest see a conflict.
    pub async fn submit_subtest(
        &self,
        attempt_id: i64,
        subtest_id: i64,
        selections: &[(i64, Option<OptionLetter>)],
        user_id: i64,
    ) -> Result<SubmitSubtestResponse> {
        let subtest = self.subtests.get_by_id(subtest_id).await?;

        let mut tx = self.pool.begin().await?;
        let attempt = Self::lock(&mut tx, attempt_id).await?;
        ensure_owner(&attempt, user_id, "submit")?;
        ensure_in_progress(&attempt)?;
        let open = self.lock_open_result(&mut tx, attempt_id, &subtest).await?;

        let questions = self
            .questions
            .list_by_subtest(attempt.try_out_package_id, subtest_id)
            .await?;

        // Answers saved earlier count unless this submission overrides them.
        let mut merged: Vec<(i64, Option<OptionLetter>)> = self
            .selections(attempt_id, subtest_id)
            .await?
            .into_iter()
            .collect();
        merged.extend_from_slice(selections);

        let score = ScoringService::score_subtest(&subtest, &questions, &merged);
        self.store_answers(&mut tx, attempt_id, &score.answers).await?;

        let sql = format!(
            r#"
            UPDATE subtest_results
            SET finished_at = $2, correct_count = $3, wrong_count = $4,
                unanswered_count = $5, raw_score = $6, final_score = $7
            WHERE id = $1
            RETURNING {RESULT_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, SubtestResult>(&sql)
            .bind(open.id)
            .bind(self.clock.now())
            .bind(score.correct_count)
            .bind(score.wrong_count)
            .bind(score.unanswered_count)
            .bind(score.raw_score)
            .bind(score.final_score)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        if !score.skipped_question_ids.is_empty() {
            tracing::warn!(
                attempt_id,
                subtest = %subtest.code,
                skipped = ?score.skipped_question_ids,
                "Ignored answers for unknown questions"
            );
        }
        tracing::info!(
            attempt_id,
            subtest = %subtest.code,
            correct = score.correct_count,
            final_score = %score.final_score,
            "Subtest submitted"
        );

        Ok(SubmitSubtestResponse {
            result: SubtestResultResponse::new(result, Some(&subtest)),
            skipped_question_ids: score.skipped_question_ids,
        })
    }

    /// Completes the attempt with the mean of the submitted subtest scores.
    pub async fn finish_attempt(&self, attempt_id: i64, user_id: i64) -> Result<AttemptResponse> {
        let catalog_size = self.subtests.list().await?.len();

        let mut tx = self.pool.begin().await?;
        let attempt = Self::lock(&mut tx, attempt_id).await?;
        ensure_owner(&attempt, user_id, "finish")?;
        if !attempt.status.can_transition_to(AttemptStatus::Completed) {
            ensure_in_progress(&attempt)?;
        }

        let scores: Vec<Decimal> = sqlx::query_scalar(
            "SELECT final_score FROM subtest_results WHERE attempt_id = $1 AND final_score IS NOT NULL",
        )
        .bind(attempt_id)
        .fetch_all(&mut *tx)
        .await?;

        if scores.len() < catalog_size {
            tracing::warn!(
                attempt_id,
                submitted = scores.len(),
                expected = catalog_size,
                "Finishing attempt with unsubmitted subtests"
            );
        }
        let total = ScoringService::aggregate(&scores);

        sqlx::query(
            r#"
            UPDATE try_out_attempts
            SET status = $2, finished_at = $3, total_score = $4
            WHERE id = $1
            "#,
        )
        .bind(attempt_id)
        .bind(AttemptStatus::Completed)
        .bind(self.clock.now())
        .bind(total)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(attempt_id, user_id, total_score = %total, "Attempt finished");

        let attempt = self.find(attempt_id).await?;
        self.response(attempt).await
    }

    pub async fn results_for(&self, attempt_id: i64, user_id: i64) -> Result<AttemptResponse> {
        let attempt = self.find(attempt_id).await?;
        ensure_owner(&attempt, user_id, "view results of")?;
        if attempt.status != AttemptStatus::Completed {
            return Err(Error::Conflict("attempt is not completed yet".to_string()));
        }
        self.response(attempt).await
    }

    /// Top completed attempts: higher score first, earlier finish breaks ties.
    /// Drafts are only visible with `include_unpublished`.
    pub async fn leaderboard(
        &self,
        package_id: i64,
        include_unpublished: bool,
    ) -> Result<Vec<LeaderboardEntryResponse>> {
        let package = self.tryouts.get_by_id(package_id).await?;
        if !package.is_published && !include_unpublished {
            return Err(Error::NotFound("try out not found".to_string()));
        }

        let rows = sqlx::query_as::<_, LeaderboardRow>(
            r#"
            SELECT r.user_id, u.username, a.total_score, a.finished_at
            FROM try_out_attempts a
            JOIN try_out_registrations r ON r.id = a.registration_id
            JOIN users u ON u.id = r.user_id
            WHERE r.try_out_package_id = $1
              AND a.status = $2
              AND a.total_score IS NOT NULL
            ORDER BY a.total_score DESC, a.finished_at ASC, a.id ASC
            LIMIT $3
            "#,
        )
        .bind(package_id)
        .bind(AttemptStatus::Completed)
        .bind(LEADERBOARD_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(LeaderboardEntryResponse::ranked(rows))
    }
}
