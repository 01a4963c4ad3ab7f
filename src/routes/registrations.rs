use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use validator::Validate;

use crate::{
    dto::{
        registration_dto::{RegistrationResponse, RejectPaymentPayload, UploadPaymentProofPayload},
        response::ApiResponse,
    },
    error::Result,
    extract::{Json, Path},
    middleware::auth::Claims,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/v1/tryouts/{id}/register",
    params(("id" = i64, Path, description = "Try out ID")),
    responses(
        (status = 201, description = "Registered", body = Json<ApiResponse<RegistrationResponse>>),
        (status = 400, description = "Outside the registration window"),
        (status = 404, description = "Try out not found"),
        (status = 409, description = "Already registered")
    )
)]
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let registration = state.registration_service.register(id, claims.user_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "Registered successfully",
            RegistrationResponse::from(registration),
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/me/tryout-registrations",
    responses(
        (status = 200, description = "Caller's registrations", body = Json<ApiResponse<Vec<RegistrationResponse>>>)
    )
)]
#[axum::debug_handler]
pub async fn my_registrations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let rows = state.registration_service.list_for_user(claims.user_id).await?;
    let data: Vec<RegistrationResponse> = rows.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success("Registrations retrieved successfully", data)))
}

#[utoipa::path(
    get,
    path = "/api/v1/tryouts/{id}/registrations",
    params(("id" = i64, Path, description = "Try out ID")),
    responses(
        (status = 200, description = "Registrations for the try out", body = Json<ApiResponse<Vec<RegistrationResponse>>>),
        (status = 404, description = "Try out not found")
    )
)]
#[axum::debug_handler]
pub async fn tryout_registrations(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let rows = state.registration_service.list_for_package(id).await?;
    let data: Vec<RegistrationResponse> = rows.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success("Registrations retrieved successfully", data)))
}

#[utoipa::path(
    get,
    path = "/api/v1/tryouts/registrations/pending",
    responses(
        (status = 200, description = "Payments waiting for review", body = Json<ApiResponse<Vec<RegistrationResponse>>>)
    )
)]
#[axum::debug_handler]
pub async fn pending_payments(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let rows = state.registration_service.list_pending().await?;
    let data: Vec<RegistrationResponse> = rows.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success("Pending payments retrieved successfully", data)))
}

#[utoipa::path(
    post,
    path = "/api/v1/tryouts/registrations/{id}/payment-proof",
    params(("id" = i64, Path, description = "Registration ID")),
    request_body = UploadPaymentProofPayload,
    responses(
        (status = 200, description = "Proof stored, payment pending", body = Json<ApiResponse<RegistrationResponse>>),
        (status = 400, description = "Free try out or invalid URL"),
        (status = 403, description = "Not the registration owner"),
        (status = 409, description = "Payment already approved")
    )
)]
#[axum::debug_handler]
pub async fn upload_payment_proof(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UploadPaymentProofPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let registration = state
        .registration_service
        .upload_payment_proof(id, payload.payment_proof_url.trim(), claims.user_id)
        .await?;
    Ok(Json(ApiResponse::success(
        "Payment proof uploaded successfully",
        RegistrationResponse::from(registration),
    )))
}

#[utoipa::path(
    put,
    path = "/api/v1/tryouts/registrations/{id}/approve",
    params(("id" = i64, Path, description = "Registration ID")),
    responses(
        (status = 200, description = "Payment approved", body = Json<ApiResponse<RegistrationResponse>>),
        (status = 400, description = "No proof uploaded"),
        (status = 409, description = "Payment already approved")
    )
)]
#[axum::debug_handler]
pub async fn approve_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let registration = state.registration_service.approve(id, claims.user_id).await?;
    Ok(Json(ApiResponse::success(
        "Payment approved successfully",
        RegistrationResponse::from(registration),
    )))
}

#[utoipa::path(
    put,
    path = "/api/v1/tryouts/registrations/{id}/reject",
    params(("id" = i64, Path, description = "Registration ID")),
    request_body = RejectPaymentPayload,
    responses(
        (status = 200, description = "Payment rejected", body = Json<ApiResponse<RegistrationResponse>>),
        (status = 409, description = "Payment already approved")
    )
)]
#[axum::debug_handler]
pub async fn reject_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<RejectPaymentPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let reason = payload
        .rejection_reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());
    let registration = state
        .registration_service
        .reject(id, reason, claims.user_id)
        .await?;
    Ok(Json(ApiResponse::success(
        "Payment rejected",
        RegistrationResponse::from(registration),
    )))
}
