use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::registration::{PaymentStatus, RegistrationDetail};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UploadPaymentProofPayload {
    #[validate(url)]
    pub payment_proof_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct RejectPaymentPayload {
    #[validate(length(max = 500))]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub try_out_package_id: i64,
    pub try_out_name: String,
    pub is_free: bool,
    pub payment_proof_url: Option<String>,
    pub payment_status: PaymentStatus,
    pub rejection_reason: Option<String>,
    pub approved_by_user_id: Option<i64>,
    pub approved_at: Option<DateTime<Utc>>,
    pub registered_at: DateTime<Utc>,
    pub has_attempt: bool,
    pub attempt_id: Option<i64>,
}

impl From<RegistrationDetail> for RegistrationResponse {
    fn from(value: RegistrationDetail) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            username: value.username,
            email: value.email,
            try_out_package_id: value.try_out_package_id,
            try_out_name: value.try_out_name,
            is_free: value.is_free,
            payment_proof_url: value.payment_proof_url,
            payment_status: value.payment_status,
            rejection_reason: value.rejection_reason,
            approved_by_user_id: value.approved_by_user_id,
            approved_at: value.approved_at,
            registered_at: value.registered_at,
            has_attempt: value.attempt_id.is_some(),
            attempt_id: value.attempt_id,
        }
    }
}
