use std::sync::Arc;

use sqlx::{PgPool, Postgres, Transaction};

use crate::error::{Error, Result};
use crate::models::registration::{PaymentStatus, RegistrationDetail, TryOutRegistration};
use crate::models::tryout::RegistrationWindow;
use crate::services::tryout_service::TryOutService;
use crate::utils::time::Clock;

const DETAIL_SELECT: &str = r#"
    SELECT r.id, r.user_id, u.username, u.email, r.try_out_package_id,
           p.name AS try_out_name, p.is_free, r.payment_proof_url, r.payment_status,
           r.rejection_reason, r.approved_by_user_id, r.approved_at, r.registered_at,
           a.id AS attempt_id
    FROM try_out_registrations r
    JOIN users u ON u.id = r.user_id
    JOIN try_out_packages p ON p.id = r.try_out_package_id
    LEFT JOIN try_out_attempts a ON a.registration_id = r.id
"#;

const REGISTRATION_COLUMNS: &str = r#"
    id, user_id, try_out_package_id, payment_proof_url, payment_status,
    rejection_reason, approved_by_user_id, approved_at, registered_at
"#;

#[derive(Clone)]
pub struct RegistrationService {
    pool: PgPool,
    tryouts: TryOutService,
    clock: Arc<dyn Clock>,
}

impl RegistrationService {
    pub fn new(pool: PgPool, tryouts: TryOutService, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            tryouts,
            clock,
        }
    }

    pub async fn get_detail(&self, id: i64) -> Result<RegistrationDetail> {
        let sql = format!("{DETAIL_SELECT} WHERE r.id = $1");
        sqlx::query_as::<_, RegistrationDetail>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("registration not found".to_string()))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<TryOutRegistration> {
        let sql = format!("SELECT {REGISTRATION_COLUMNS} FROM try_out_registrations WHERE id = $1");
        sqlx::query_as::<_, TryOutRegistration>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("registration not found".to_string()))
    }

    async fn lock(tx: &mut Transaction<'_, Postgres>, id: i64) -> Result<TryOutRegistration> {
        let sql = format!(
            "SELECT {REGISTRATION_COLUMNS} FROM try_out_registrations WHERE id = $1 FOR UPDATE"
        );
        sqlx::query_as::<_, TryOutRegistration>(&sql)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| Error::NotFound("registration not found".to_string()))
    }

    /// Registers `user_id` for a published package inside its registration
    /// window. Free packages are approved straight away.
    pub async fn register(&self, package_id: i64, user_id: i64) -> Result<RegistrationDetail> {
        let package = self.tryouts.get_by_id(package_id).await?;
        if !package.is_published {
            return Err(Error::NotFound("try out not found".to_string()));
        }

        match package.registration_window(self.clock.now()) {
            RegistrationWindow::NotYetOpen => {
                return Err(Error::BadRequest("registration has not started yet".to_string()))
            }
            RegistrationWindow::Closed => {
                return Err(Error::BadRequest("registration period has ended".to_string()))
            }
            RegistrationWindow::Open => {}
        }

        let status = PaymentStatus::initial(package.is_free);
        let inserted: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO try_out_registrations (user_id, try_out_package_id, payment_status)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, try_out_package_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(package_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;

        let Some(registration_id) = inserted else {
            return Err(Error::Conflict(
                "you are already registered for this try out".to_string(),
            ));
        };

        tracing::info!(
            registration_id,
            try_out_id = package_id,
            user_id,
            payment_status = %status,
            "User registered for try out"
        );
        self.get_detail(registration_id).await
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<RegistrationDetail>> {
        let sql = format!("{DETAIL_SELECT} WHERE r.user_id = $1 ORDER BY r.registered_at DESC, r.id DESC");
        let rows = sqlx::query_as::<_, RegistrationDetail>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn list_for_package(&self, package_id: i64) -> Result<Vec<RegistrationDetail>> {
        self.tryouts.get_by_id(package_id).await?;
        let sql = format!("{DETAIL_SELECT} WHERE r.try_out_package_id = $1 ORDER BY r.registered_at, r.id");
        let rows = sqlx::query_as::<_, RegistrationDetail>(&sql)
            .bind(package_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Pending registrations that already have a proof to review.
    pub async fn list_pending(&self) -> Result<Vec<RegistrationDetail>> {
        let sql = format!(
            r#"
            {DETAIL_SELECT}
            WHERE r.payment_status = $1 AND r.payment_proof_url IS NOT NULL
            ORDER BY r.registered_at, r.id
            "#
        );
        let rows = sqlx::query_as::<_, RegistrationDetail>(&sql)
            .bind(PaymentStatus::Pending)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn upload_payment_proof(
        &self,
        registration_id: i64,
        proof_url: &str,
        user_id: i64,
    ) -> Result<RegistrationDetail> {
        let mut tx = self.pool.begin().await?;
        let registration = Self::lock(&mut tx, registration_id).await?;

        if registration.user_id != user_id {
            return Err(Error::Forbidden(
                "you can only upload payment proof for your own registration".to_string(),
            ));
        }
        if !registration.payment_status.can_transition_to(PaymentStatus::Pending) {
            return Err(Error::Conflict("payment is already approved".to_string()));
        }

        let is_free: bool = sqlx::query_scalar("SELECT is_free FROM try_out_packages WHERE id = $1")
            .bind(registration.try_out_package_id)
            .fetch_one(&mut *tx)
            .await?;
        if is_free {
            return Err(Error::BadRequest(
                "this try out is free and needs no payment".to_string(),
            ));
        }

        sqlx::query(
            r#"
            UPDATE try_out_registrations
            SET payment_proof_url = $2, payment_status = $3
            WHERE id = $1
            "#,
        )
        .bind(registration_id)
        .bind(proof_url)
        .bind(PaymentStatus::Pending)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(registration_id, user_id, "Payment proof uploaded");
        self.get_detail(registration_id).await
    }

    pub async fn approve(&self, registration_id: i64, admin_id: i64) -> Result<RegistrationDetail> {
        let mut tx = self.pool.begin().await?;
        let registration = Self::lock(&mut tx, registration_id).await?;

        if !registration.payment_status.can_transition_to(PaymentStatus::Approved) {
            return Err(Error::Conflict("payment is already approved".to_string()));
        }
        if registration
            .payment_proof_url
            .as_deref()
            .map_or(true, |url| url.trim().is_empty())
        {
            return Err(Error::BadRequest("no payment proof has been uploaded".to_string()));
        }

        sqlx::query(
            r#"
            UPDATE try_out_registrations
            SET payment_status = $2, approved_by_user_id = $3, approved_at = $4,
                rejection_reason = NULL
            WHERE id = $1
            "#,
        )
        .bind(registration_id)
        .bind(PaymentStatus::Approved)
        .bind(admin_id)
        .bind(self.clock.now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(registration_id, admin_id, "Payment approved");
        self.get_detail(registration_id).await
    }

    pub async fn reject(
        &self,
        registration_id: i64,
        reason: Option<String>,
        admin_id: i64,
    ) -> Result<RegistrationDetail> {
        let mut tx = self.pool.begin().await?;
        let registration = Self::lock(&mut tx, registration_id).await?;

        if !registration.payment_status.can_transition_to(PaymentStatus::Rejected) {
            return Err(Error::Conflict(
                "cannot reject an already approved payment".to_string(),
            ));
        }

        // The proof is cleared so the user has to upload a new one.
        sqlx::query(
            r#"
            UPDATE try_out_registrations
            SET payment_status = $2, rejection_reason = $3, payment_proof_url = NULL
            WHERE id = $1
            "#,
        )
        .bind(registration_id)
        .bind(PaymentStatus::Rejected)
        .bind(reason)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(registration_id, admin_id, "Payment rejected");
        self.get_detail(registration_id).await
    }
}
