use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use validator::Validate;

use crate::{
    dto::{
        question_dto::{
            CreateQuestionPayload, QuestionResponse, SubtestQuestionCountResponse,
            UpdateQuestionPayload,
        },
        response::ApiResponse,
    },
    error::Result,
    extract::{Json, Path},
    middleware::auth::Claims,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/v1/tryouts/{id}/subtests",
    params(("id" = i64, Path, description = "Try out ID")),
    responses(
        (status = 200, description = "Subtests with question counts", body = Json<ApiResponse<Vec<SubtestQuestionCountResponse>>>),
        (status = 403, description = "No permission for this try out")
    )
)]
#[axum::debug_handler]
pub async fn list_subtests_with_counts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state
        .question_service
        .ensure_can_manage(id, claims.user_id, claims.is_admin())
        .await?;
    let data: Vec<SubtestQuestionCountResponse> =
        state.question_service.subtests_with_counts(id).await?;
    Ok(Json(ApiResponse::success("Subtests retrieved successfully", data)))
}

#[utoipa::path(
    get,
    path = "/api/v1/tryouts/{id}/questions",
    params(("id" = i64, Path, description = "Try out ID")),
    responses(
        (status = 200, description = "All questions of the try out", body = Json<ApiResponse<Vec<QuestionResponse>>>),
        (status = 403, description = "No permission for this try out")
    )
)]
#[axum::debug_handler]
pub async fn list_questions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state
        .question_service
        .ensure_can_manage(id, claims.user_id, claims.is_admin())
        .await?;
    let questions = state.question_service.list_by_package(id).await?;
    let data: Vec<QuestionResponse> = questions.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success("Questions retrieved successfully", data)))
}

#[utoipa::path(
    get,
    path = "/api/v1/tryouts/{id}/subtests/{subtestId}/questions",
    params(
        ("id" = i64, Path, description = "Try out ID"),
        ("subtestId" = i64, Path, description = "Subtest ID")
    ),
    responses(
        (status = 200, description = "Questions of one subtest", body = Json<ApiResponse<Vec<QuestionResponse>>>),
        (status = 403, description = "No permission for this try out"),
        (status = 404, description = "Try out or subtest not found")
    )
)]
#[axum::debug_handler]
pub async fn list_subtest_questions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((id, subtest_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse> {
    state
        .question_service
        .ensure_can_manage(id, claims.user_id, claims.is_admin())
        .await?;
    state.subtest_service.get_by_id(subtest_id).await?;
    let questions = state.question_service.list_by_subtest(id, subtest_id).await?;
    let data: Vec<QuestionResponse> = questions.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success("Questions retrieved successfully", data)))
}

#[utoipa::path(
    post,
    path = "/api/v1/tryouts/{id}/subtests/{subtestId}/questions",
    params(
        ("id" = i64, Path, description = "Try out ID"),
        ("subtestId" = i64, Path, description = "Subtest ID")
    ),
    request_body = CreateQuestionPayload,
    responses(
        (status = 201, description = "Question created", body = Json<ApiResponse<QuestionResponse>>),
        (status = 400, description = "Invalid payload or order number"),
        (status = 403, description = "No permission for this try out"),
        (status = 409, description = "Subtest already full")
    )
)]
#[axum::debug_handler]
pub async fn create_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((id, subtest_id)): Path<(i64, i64)>,
    Json(payload): Json<CreateQuestionPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    state
        .question_service
        .ensure_can_manage(id, claims.user_id, claims.is_admin())
        .await?;
    let question = state
        .question_service
        .create(id, subtest_id, payload, claims.user_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Question created successfully", QuestionResponse::from(question))),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/tryouts/questions/{questionId}",
    params(("questionId" = i64, Path, description = "Question ID")),
    request_body = UpdateQuestionPayload,
    responses(
        (status = 200, description = "Question updated", body = Json<ApiResponse<QuestionResponse>>),
        (status = 403, description = "No permission for this try out"),
        (status = 404, description = "Question not found")
    )
)]
#[axum::debug_handler]
pub async fn update_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(question_id): Path<i64>,
    Json(payload): Json<UpdateQuestionPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let existing = state.question_service.get_by_id(question_id).await?;
    state
        .question_service
        .ensure_can_manage(existing.try_out_package_id, claims.user_id, claims.is_admin())
        .await?;
    let question = state.question_service.update(question_id, payload).await?;
    Ok(Json(ApiResponse::success(
        "Question updated successfully",
        QuestionResponse::from(question),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/v1/tryouts/questions/{questionId}",
    params(("questionId" = i64, Path, description = "Question ID")),
    responses(
        (status = 200, description = "Question deleted"),
        (status = 403, description = "No permission for this try out"),
        (status = 404, description = "Question not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(question_id): Path<i64>,
) -> Result<impl IntoResponse> {
    let existing = state.question_service.get_by_id(question_id).await?;
    state
        .question_service
        .ensure_can_manage(existing.try_out_package_id, claims.user_id, claims.is_admin())
        .await?;
    state.question_service.delete(question_id).await?;
    Ok(Json(ApiResponse::success("Question deleted successfully", ())))
}
