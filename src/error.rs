use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json},
};

use crate::dto::response::ApiResponse;

pub type Result<T> = std::result::Result<T, Error>;

/// Postgres SQLSTATEs the services react to.
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION))
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payment required: {0}")]
    PaymentRequired(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

impl Error {
    fn status_and_message(&self) -> (StatusCode, &'static str) {
        match self {
            Error::BadRequest(_) => (StatusCode::BAD_REQUEST, "Bad request"),
            Error::Validation(_) => (StatusCode::BAD_REQUEST, "Validation failed"),
            Error::Forbidden(_) => (StatusCode::FORBIDDEN, "Permission denied"),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "Not found"),
            Error::Conflict(_) => (StatusCode::CONFLICT, "Conflict"),
            Error::PaymentRequired(_) => (StatusCode::PAYMENT_REQUIRED, "Payment required"),
            Error::Config(_) | Error::Database(_) | Error::Migrate(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = self.status_and_message();
        let detail = match &self {
            Error::BadRequest(msg)
            | Error::Forbidden(msg)
            | Error::NotFound(msg)
            | Error::Conflict(msg)
            | Error::PaymentRequired(msg) => msg.clone(),
            Error::Validation(err) => err.to_string(),
            other => {
                tracing::error!(error = ?other, "request failed");
                "An unexpected error occurred".to_string()
            }
        };

        let body = Json(ApiResponse::<()>::failed(message, detail));
        (status, body).into_response()
    }
}

// Extractor rejections surface as 400s carrying axum's own explanation.
impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Error::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::BadRequest(rejection.body_text())
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(ref db_err)
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                Error::Conflict(format!(
                    "Duplicate record violates {}",
                    db_err.constraint().unwrap_or("a unique constraint")
                ))
            }
            sqlx::Error::Database(ref db_err)
                if db_err.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) =>
            {
                Error::BadRequest("Referenced record does not exist".to_string())
            }
            other => Error::Database(other),
        }
    }
}
