use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::tryout::{TryOutPackage, TutorPermission};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTryOutPayload {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
    #[validate(url)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_free: bool,
    pub price: Option<Decimal>,
    #[validate(url)]
    pub qris_image_url: Option<String>,
    #[validate(url)]
    pub payment_link: Option<String>,
    pub registration_start: DateTime<Utc>,
    pub registration_end: DateTime<Utc>,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTryOutPayload {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(url)]
    pub image_url: Option<String>,
    pub is_free: Option<bool>,
    pub price: Option<Decimal>,
    #[validate(url)]
    pub qris_image_url: Option<String>,
    #[validate(url)]
    pub payment_link: Option<String>,
    pub registration_start: Option<DateTime<Utc>>,
    pub registration_end: Option<DateTime<Utc>>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TryOutListQuery {
    pub search: Option<String>,
    /// Admin listings pass `includeUnpublished=true`; the public catalog
    /// always hides drafts.
    pub include_unpublished: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TryOutResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_free: bool,
    pub price: Decimal,
    pub qris_image_url: Option<String>,
    pub payment_link: Option<String>,
    pub registration_start: DateTime<Utc>,
    pub registration_end: DateTime<Utc>,
    pub is_published: bool,
    pub created_by_user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TryOutPackage> for TryOutResponse {
    fn from(value: TryOutPackage) -> Self {
        Self {
            id: value.id,
            name: value.name,
            description: value.description,
            image_url: value.image_url,
            is_free: value.is_free,
            price: value.price,
            qris_image_url: value.qris_image_url,
            payment_link: value.payment_link,
            registration_start: value.registration_start,
            registration_end: value.registration_end,
            is_published: value.is_published,
            created_by_user_id: value.created_by_user_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GrantTutorPayload {
    #[validate(range(min = 1))]
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorPermissionResponse {
    pub id: i64,
    pub try_out_package_id: i64,
    pub user_id: i64,
    pub username: Option<String>,
    pub email: Option<String>,
    pub granted_by_user_id: Option<i64>,
    pub granted_at: DateTime<Utc>,
}

impl From<TutorPermission> for TutorPermissionResponse {
    fn from(value: TutorPermission) -> Self {
        Self {
            id: value.id,
            try_out_package_id: value.try_out_package_id,
            user_id: value.user_id,
            username: value.username,
            email: value.email,
            granted_by_user_id: value.granted_by_user_id,
            granted_at: value.granted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_payload_reads_camel_case() {
        let payload: CreateTryOutPayload = serde_json::from_value(json!({
            "name": "UTBK Simulation 1",
            "isFree": false,
            "price": 25000,
            "registrationStart": "2026-03-01T00:00:00Z",
            "registrationEnd": "2026-03-08T00:00:00Z"
        }))
        .unwrap();

        assert!(!payload.is_free);
        assert!(!payload.is_published);
        assert_eq!(payload.price, Some(Decimal::new(25000, 0)));
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn empty_name_fails_validation() {
        let payload = UpdateTryOutPayload {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(payload.validate().is_err());
    }
}
