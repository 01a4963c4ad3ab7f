use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::dto::response::ApiResponse;

pub const ROLE_ADMIN: &str = "ADMIN";
pub const ROLE_TUTOR: &str = "TUTOR";
pub const ROLE_STUDENT: &str = "STUDENT";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub role: Option<String>,
    pub exp: usize,
}

impl Claims {
    /// Roles compare case-insensitively; a missing role counts as student.
    pub fn has_role(&self, role: &str) -> bool {
        self.role
            .as_deref()
            .unwrap_or(ROLE_STUDENT)
            .eq_ignore_ascii_case(role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }
}

fn reject(status: StatusCode, message: &str, detail: &str) -> Response {
    (status, Json(ApiResponse::<()>::failed(message, detail))).into_response()
}

fn bearer_claims(req: &Request) -> Result<Claims, Response> {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return Err(reject(StatusCode::UNAUTHORIZED, "Unauthorized", "missing authorization header"));
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Err(reject(StatusCode::UNAUTHORIZED, "Unauthorized", "malformed authorization header"));
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err(reject(StatusCode::UNAUTHORIZED, "Unauthorized", "unsupported authorization scheme"));
    };

    let config = crate::config::get_config();
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    decode::<Claims>(
        token.trim(),
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|err| {
        tracing::debug!(error = %err, "Rejected bearer token");
        reject(StatusCode::UNAUTHORIZED, "Unauthorized", "invalid or expired token")
    })
}

async fn authorize(mut req: Request, next: Next, allowed: &[&str]) -> Response {
    let claims = match bearer_claims(&req) {
        Ok(claims) => claims,
        Err(response) => return response,
    };
    if !allowed.is_empty() && !allowed.iter().any(|role| claims.has_role(role)) {
        tracing::warn!(user_id = claims.user_id, role = ?claims.role, path = %req.uri().path(), "Role not allowed");
        return reject(StatusCode::FORBIDDEN, "Permission denied", "insufficient role");
    }
    req.extensions_mut().insert(claims);
    next.run(req).await
}

/// Attaches claims when a valid token is present and lets anonymous
/// requests through untouched.
pub async fn optional_auth(mut req: Request, next: Next) -> Response {
    if req.headers().contains_key(axum::http::header::AUTHORIZATION) {
        if let Ok(claims) = bearer_claims(&req) {
            req.extensions_mut().insert(claims);
        }
    }
    next.run(req).await
}

/// Any authenticated user.
pub async fn require_auth(req: Request, next: Next) -> Response {
    authorize(req, next, &[]).await
}

pub async fn require_admin(req: Request, next: Next) -> Response {
    authorize(req, next, &[ROLE_ADMIN]).await
}

pub async fn require_admin_or_tutor(req: Request, next: Next) -> Response {
    authorize(req, next, &[ROLE_ADMIN, ROLE_TUTOR]).await
}
