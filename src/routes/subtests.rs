use axum::{extract::State, response::IntoResponse};

use crate::{
    dto::{question_dto::SubtestResponse, response::ApiResponse},
    error::Result,
    extract::Json,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/v1/subtests",
    responses(
        (status = 200, description = "Subtest catalog in exam order", body = Json<ApiResponse<Vec<SubtestResponse>>>)
    )
)]
#[axum::debug_handler]
pub async fn list_subtests(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let subtests = state.subtest_service.list().await?;
    let data: Vec<SubtestResponse> = subtests.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success("Subtests retrieved successfully", data)))
}
