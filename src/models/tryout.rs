use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TryOutPackage {
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

/// Where `now` falls relative to a package's registration window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationWindow {
    NotYetOpen,
    Open,
    Closed,
}

impl TryOutPackage {
    /// Both window bounds are inclusive.
    pub fn registration_window(&self, now: DateTime<Utc>) -> RegistrationWindow {
        if now < self.registration_start {
            RegistrationWindow::NotYetOpen
        } else if now > self.registration_end {
            RegistrationWindow::Closed
        } else {
            RegistrationWindow::Open
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TutorPermission {
    pub id: i64,
    pub try_out_package_id: i64,
    pub user_id: i64,
    pub username: Option<String>,
    pub email: Option<String>,
    pub granted_by_user_id: Option<i64>,
    pub granted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn package(start: DateTime<Utc>, end: DateTime<Utc>) -> TryOutPackage {
        TryOutPackage {
            id: 1,
            name: "UTBK Simulation 1".into(),
            description: None,
            image_url: None,
            is_free: true,
            price: Decimal::ZERO,
            qris_image_url: None,
            payment_link: None,
            registration_start: start,
            registration_end: end,
            is_published: true,
            created_by_user_id: None,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn window_edges_are_inclusive() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let end = start + Duration::days(7);
        let p = package(start, end);

        assert_eq!(p.registration_window(start - Duration::seconds(1)), RegistrationWindow::NotYetOpen);
        assert_eq!(p.registration_window(start), RegistrationWindow::Open);
        assert_eq!(p.registration_window(end), RegistrationWindow::Open);
        assert_eq!(p.registration_window(end + Duration::seconds(1)), RegistrationWindow::Closed);
    }
}
