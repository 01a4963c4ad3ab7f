use axum::{
    extract::State,
    http::StatusCode,
    Extension,
};
use validator::Validate;

use crate::{
    dto::{
        attempt_dto::{
            AttemptResponse, AttemptStateResponse, LeaderboardEntryResponse, SaveAnswersResponse,
            StartSubtestResponse, SubmitSubtestPayload, SubmitSubtestResponse,
        },
        response::ApiResponse,
    },
    error::Result,
    extract::{Json, Path},
    middleware::auth::Claims,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/v1/tryouts/registrations/{id}/start",
    params(("id" = i64, Path, description = "Registration ID")),
    responses(
        (status = 201, description = "Attempt started or resumed", body = Json<ApiResponse<AttemptResponse>>),
        (status = 402, description = "Payment not approved"),
        (status = 403, description = "Not the registration owner"),
        (status = 404, description = "Registration not found")
    )
)]
#[axum::debug_handler]
pub async fn start_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<ApiResponse<AttemptResponse>>)> {
    let attempt = state.attempt_service.start_attempt(id, claims.user_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Try out started", attempt)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/tryouts/attempts/{attemptId}/current",
    params(("attemptId" = i64, Path, description = "Attempt ID")),
    responses(
        (status = 200, description = "Attempt progress", body = Json<ApiResponse<AttemptStateResponse>>),
        (status = 403, description = "Not the attempt owner"),
        (status = 404, description = "Attempt not found")
    )
)]
#[axum::debug_handler]
pub async fn current_state(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
) -> Result<Json<ApiResponse<AttemptStateResponse>>> {
    let data = state
        .attempt_service
        .current_state(attempt_id, claims.user_id)
        .await?;
    Ok(Json(ApiResponse::success("Attempt state retrieved successfully", data)))
}

#[utoipa::path(
    get,
    path = "/api/v1/tryouts/attempts/{attemptId}/subtests/{subtestId}/start",
    params(
        ("attemptId" = i64, Path, description = "Attempt ID"),
        ("subtestId" = i64, Path, description = "Subtest ID")
    ),
    responses(
        (status = 200, description = "Subtest questions without answer keys", body = Json<ApiResponse<StartSubtestResponse>>),
        (status = 409, description = "Attempt not in progress or subtest already submitted")
    )
)]
#[axum::debug_handler]
pub async fn start_subtest(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((attempt_id, subtest_id)): Path<(i64, i64)>,
) -> Result<Json<ApiResponse<StartSubtestResponse>>> {
    let data = state
        .attempt_service
        .start_subtest(attempt_id, subtest_id, claims.user_id)
        .await?;
    Ok(Json(ApiResponse::success("Subtest started", data)))
}

#[utoipa::path(
    put,
    path = "/api/v1/tryouts/attempts/{attemptId}/subtests/{subtestId}/answers",
    params(
        ("attemptId" = i64, Path, description = "Attempt ID"),
        ("subtestId" = i64, Path, description = "Subtest ID")
    ),
    request_body = SubmitSubtestPayload,
    responses(
        (status = 200, description = "Answers saved", body = Json<ApiResponse<SaveAnswersResponse>>),
        (status = 409, description = "Subtest not open for answers")
    )
)]
#[axum::debug_handler]
pub async fn save_answers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((attempt_id, subtest_id)): Path<(i64, i64)>,
    Json(payload): Json<SubmitSubtestPayload>,
) -> Result<Json<ApiResponse<SaveAnswersResponse>>> {
    payload.validate()?;
    let data = state
        .attempt_service
        .save_answers(attempt_id, subtest_id, &payload.selections(), claims.user_id)
        .await?;
    Ok(Json(ApiResponse::success("Answers saved", data)))
}

#[utoipa::path(
    post,
    path = "/api/v1/tryouts/attempts/{attemptId}/subtests/{subtestId}/submit",
    params(
        ("attemptId" = i64, Path, description = "Attempt ID"),
        ("subtestId" = i64, Path, description = "Subtest ID")
    ),
    request_body = SubmitSubtestPayload,
    responses(
        (status = 200, description = "Subtest graded", body = Json<ApiResponse<SubmitSubtestResponse>>),
        (status = 409, description = "Subtest not started, already submitted or out of time")
    )
)]
#[axum::debug_handler]
pub async fn submit_subtest(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((attempt_id, subtest_id)): Path<(i64, i64)>,
    Json(payload): Json<SubmitSubtestPayload>,
) -> Result<Json<ApiResponse<SubmitSubtestResponse>>> {
    payload.validate()?;
    let data = state
        .attempt_service
        .submit_subtest(attempt_id, subtest_id, &payload.selections(), claims.user_id)
        .await?;
    Ok(Json(ApiResponse::success("Subtest submitted successfully", data)))
}

#[utoipa::path(
    post,
    path = "/api/v1/tryouts/attempts/{attemptId}/finish",
    params(("attemptId" = i64, Path, description = "Attempt ID")),
    responses(
        (status = 200, description = "Attempt completed", body = Json<ApiResponse<AttemptResponse>>),
        (status = 409, description = "Attempt not in progress")
    )
)]
#[axum::debug_handler]
pub async fn finish_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
) -> Result<Json<ApiResponse<AttemptResponse>>> {
    let data = state
        .attempt_service
        .finish_attempt(attempt_id, claims.user_id)
        .await?;
    Ok(Json(ApiResponse::success("Try out finished successfully", data)))
}

#[utoipa::path(
    get,
    path = "/api/v1/tryouts/attempts/{attemptId}/results",
    params(("attemptId" = i64, Path, description = "Attempt ID")),
    responses(
        (status = 200, description = "Final results", body = Json<ApiResponse<AttemptResponse>>),
        (status = 409, description = "Attempt not completed yet")
    )
)]
#[axum::debug_handler]
pub async fn results(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
) -> Result<Json<ApiResponse<AttemptResponse>>> {
    let data = state
        .attempt_service
        .results_for(attempt_id, claims.user_id)
        .await?;
    Ok(Json(ApiResponse::success("Results retrieved successfully", data)))
}

#[utoipa::path(
    get,
    path = "/api/v1/tryouts/{id}/leaderboard",
    params(("id" = i64, Path, description = "Try out ID")),
    responses(
        (status = 200, description = "Top completed attempts", body = Json<ApiResponse<Vec<LeaderboardEntryResponse>>>),
        (status = 404, description = "Try out not found")
    )
)]
#[axum::debug_handler]
pub async fn leaderboard(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<LeaderboardEntryResponse>>>> {
    let is_admin = claims.map_or(false, |Extension(c)| c.is_admin());
    let data = state.attempt_service.leaderboard(id, is_admin).await?;
    Ok(Json(ApiResponse::success("Leaderboard retrieved successfully", data)))
}
