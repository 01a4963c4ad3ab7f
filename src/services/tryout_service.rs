use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::dto::tryout_dto::{CreateTryOutPayload, TryOutListQuery, UpdateTryOutPayload};
use crate::error::{is_unique_violation, Error, Result};
use crate::models::tryout::{TryOutPackage, TutorPermission};

const PACKAGE_COLUMNS: &str = r#"
    id, name, description, image_url, is_free, price, qris_image_url, payment_link,
    registration_start, registration_end, is_published, created_by_user_id,
    created_at, updated_at
"#;

const TUTOR_SELECT: &str = r#"
    SELECT tp.id, tp.try_out_package_id, tp.user_id, u.username, u.email,
           tp.granted_by_user_id, tp.granted_at
    FROM tutor_permissions tp
    LEFT JOIN users u ON u.id = tp.user_id
"#;

fn check_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if end < start {
        return Err(Error::BadRequest(
            "registration end must not be before registration start".to_string(),
        ));
    }
    Ok(())
}

/// Free packages never carry a price.
fn effective_price(is_free: bool, price: Option<Decimal>) -> Result<Decimal> {
    if is_free {
        return Ok(Decimal::ZERO);
    }
    let price = price.unwrap_or(Decimal::ZERO);
    if price.is_sign_negative() {
        return Err(Error::BadRequest("price must not be negative".to_string()));
    }
    Ok(price)
}

fn name_conflict(err: sqlx::Error) -> Error {
    if is_unique_violation(&err) {
        Error::Conflict("a try out with this name already exists".to_string())
    } else {
        err.into()
    }
}

#[derive(Clone)]
pub struct TryOutService {
    pool: PgPool,
}

impl TryOutService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, query: TryOutListQuery) -> Result<Vec<TryOutPackage>> {
        let include_unpublished = query.include_unpublished.unwrap_or(false);
        let search = query
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let sql = format!(
            r#"
            SELECT {PACKAGE_COLUMNS}
            FROM try_out_packages
            WHERE ($1 OR is_published)
              AND ($2::TEXT IS NULL OR name ILIKE '%' || $2 || '%')
            ORDER BY registration_start DESC, id DESC
            "#
        );
        let packages = sqlx::query_as::<_, TryOutPackage>(&sql)
            .bind(include_unpublished)
            .bind(search)
            .fetch_all(&self.pool)
            .await?;
        Ok(packages)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<TryOutPackage> {
        let sql = format!("SELECT {PACKAGE_COLUMNS} FROM try_out_packages WHERE id = $1");
        sqlx::query_as::<_, TryOutPackage>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("try out not found".to_string()))
    }

    pub async fn create(&self, payload: CreateTryOutPayload, admin_id: i64) -> Result<TryOutPackage> {
        check_window(payload.registration_start, payload.registration_end)?;
        let price = effective_price(payload.is_free, payload.price)?;

        let sql = format!(
            r#"
            INSERT INTO try_out_packages (
                name, description, image_url, is_free, price, qris_image_url, payment_link,
                registration_start, registration_end, is_published, created_by_user_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {PACKAGE_COLUMNS}
            "#
        );
        let package = sqlx::query_as::<_, TryOutPackage>(&sql)
            .bind(payload.name.trim())
            .bind(payload.description)
            .bind(payload.image_url)
            .bind(payload.is_free)
            .bind(price)
            .bind(payload.qris_image_url)
            .bind(payload.payment_link)
            .bind(payload.registration_start)
            .bind(payload.registration_end)
            .bind(payload.is_published)
            .bind(admin_id)
            .fetch_one(&self.pool)
            .await
            .map_err(name_conflict)?;

        tracing::info!(try_out_id = package.id, admin_id, "Try out created");
        Ok(package)
    }

    pub async fn update(&self, id: i64, payload: UpdateTryOutPayload) -> Result<TryOutPackage> {
        let existing = self.get_by_id(id).await?;

        let start = payload.registration_start.unwrap_or(existing.registration_start);
        let end = payload.registration_end.unwrap_or(existing.registration_end);
        check_window(start, end)?;

        let is_free = payload.is_free.unwrap_or(existing.is_free);
        let price = effective_price(is_free, payload.price.or(Some(existing.price)))?;

        let sql = format!(
            r#"
            UPDATE try_out_packages
            SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                image_url = COALESCE($4, image_url),
                is_free = $5,
                price = $6,
                qris_image_url = COALESCE($7, qris_image_url),
                payment_link = COALESCE($8, payment_link),
                registration_start = $9,
                registration_end = $10,
                is_published = COALESCE($11, is_published),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PACKAGE_COLUMNS}
            "#
        );
        let package = sqlx::query_as::<_, TryOutPackage>(&sql)
            .bind(id)
            .bind(payload.name.map(|n| n.trim().to_string()))
            .bind(payload.description)
            .bind(payload.image_url)
            .bind(is_free)
            .bind(price)
            .bind(payload.qris_image_url)
            .bind(payload.payment_link)
            .bind(start)
            .bind(end)
            .bind(payload.is_published)
            .fetch_one(&self.pool)
            .await
            .map_err(name_conflict)?;

        tracing::info!(try_out_id = id, "Try out updated");
        Ok(package)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM try_out_packages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("try out not found".to_string()));
        }
        tracing::info!(try_out_id = id, "Try out deleted");
        Ok(())
    }

    pub async fn list_tutors(&self, package_id: i64) -> Result<Vec<TutorPermission>> {
        self.get_by_id(package_id).await?;
        let sql = format!("{TUTOR_SELECT} WHERE tp.try_out_package_id = $1 ORDER BY tp.granted_at, tp.id");
        let tutors = sqlx::query_as::<_, TutorPermission>(&sql)
            .bind(package_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(tutors)
    }

    pub async fn grant_tutor(
        &self,
        package_id: i64,
        user_id: i64,
        granted_by: i64,
    ) -> Result<TutorPermission> {
        self.get_by_id(package_id).await?;

        let user_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        if !user_exists {
            return Err(Error::NotFound("user not found".to_string()));
        }

        let inserted: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO tutor_permissions (try_out_package_id, user_id, granted_by_user_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (try_out_package_id, user_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(package_id)
        .bind(user_id)
        .bind(granted_by)
        .fetch_optional(&self.pool)
        .await?;

        let Some(permission_id) = inserted else {
            return Err(Error::Conflict(
                "tutor already has permission for this try out".to_string(),
            ));
        };

        tracing::info!(try_out_id = package_id, tutor_id = user_id, granted_by, "Tutor permission granted");

        let sql = format!("{TUTOR_SELECT} WHERE tp.id = $1");
        let permission = sqlx::query_as::<_, TutorPermission>(&sql)
            .bind(permission_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(permission)
    }

    pub async fn revoke_tutor(&self, package_id: i64, user_id: i64) -> Result<()> {
        let result = sqlx::query(
            "DELETE FROM tutor_permissions WHERE try_out_package_id = $1 AND user_id = $2",
        )
        .bind(package_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("tutor permission not found".to_string()));
        }
        tracing::info!(try_out_id = package_id, tutor_id = user_id, "Tutor permission revoked");
        Ok(())
    }

    pub async fn has_tutor_permission(&self, package_id: i64, user_id: i64) -> Result<bool> {
        let allowed: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM tutor_permissions
                WHERE try_out_package_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(package_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(allowed)
    }
}
