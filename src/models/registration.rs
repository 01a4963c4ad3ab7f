use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
}

impl PaymentStatus {
    /// `approved` is terminal. `pending` and `rejected` move freely between
    /// each other and may both be approved.
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        match (self, next) {
            (PaymentStatus::Approved, _) => false,
            (PaymentStatus::Pending | PaymentStatus::Rejected, _) => true,
        }
    }

    /// Initial status for a new registration.
    pub fn initial(is_free: bool) -> PaymentStatus {
        if is_free {
            PaymentStatus::Approved
        } else {
            PaymentStatus::Pending
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TryOutRegistration {
    pub id: i64,
    pub user_id: i64,
    pub try_out_package_id: i64,
    pub payment_proof_url: Option<String>,
    pub payment_status: PaymentStatus,
    pub rejection_reason: Option<String>,
    pub approved_by_user_id: Option<i64>,
    pub approved_at: Option<DateTime<Utc>>,
    pub registered_at: DateTime<Utc>,
}

/// Registration joined with its package, owner and attempt flag, as the
/// listing endpoints return it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RegistrationDetail {
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
    pub attempt_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::PaymentStatus::*;
    use super::*;

    #[test]
    fn approved_is_terminal() {
        for next in [Pending, Approved, Rejected] {
            assert!(!Approved.can_transition_to(next));
        }
    }

    #[test]
    fn pending_and_rejected_cycle() {
        assert!(Pending.can_transition_to(Rejected));
        assert!(Rejected.can_transition_to(Pending));
        assert!(Pending.can_transition_to(Pending));
        assert!(Pending.can_transition_to(Approved));
        assert!(Rejected.can_transition_to(Approved));
    }

    #[test]
    fn free_packages_start_approved() {
        assert_eq!(PaymentStatus::initial(true), Approved);
        assert_eq!(PaymentStatus::initial(false), Pending);
    }
}
