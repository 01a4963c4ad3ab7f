use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use validator::Validate;

use crate::{
    dto::{
        response::ApiResponse,
        tryout_dto::{
            CreateTryOutPayload, GrantTutorPayload, TryOutListQuery, TryOutResponse,
            TutorPermissionResponse, UpdateTryOutPayload,
        },
    },
    error::{Error, Result},
    extract::{Json, Path, Query},
    middleware::auth::Claims,
    AppState,
};

fn viewer_is_admin(claims: &Option<Extension<Claims>>) -> bool {
    claims.as_ref().map_or(false, |Extension(c)| c.is_admin())
}

#[utoipa::path(
    get,
    path = "/api/v1/tryouts",
    params(
        ("search" = Option<String>, Query, description = "Case-insensitive name filter"),
        ("includeUnpublished" = Option<bool>, Query, description = "Admins only: include drafts")
    ),
    responses(
        (status = 200, description = "Try out packages", body = Json<ApiResponse<Vec<TryOutResponse>>>)
    )
)]
#[axum::debug_handler]
pub async fn list_tryouts(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
    Query(mut query): Query<TryOutListQuery>,
) -> Result<impl IntoResponse> {
    if !viewer_is_admin(&claims) {
        query.include_unpublished = None;
    }
    let packages = state.tryout_service.list(query).await?;
    let data: Vec<TryOutResponse> = packages.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success("Try outs retrieved successfully", data)))
}

#[utoipa::path(
    get,
    path = "/api/v1/tryouts/{id}",
    params(("id" = i64, Path, description = "Try out ID")),
    responses(
        (status = 200, description = "Try out found", body = Json<ApiResponse<TryOutResponse>>),
        (status = 404, description = "Try out not found")
    )
)]
#[axum::debug_handler]
pub async fn get_tryout(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let package = state.tryout_service.get_by_id(id).await?;
    if !package.is_published && !viewer_is_admin(&claims) {
        return Err(Error::NotFound("try out not found".to_string()));
    }
    Ok(Json(ApiResponse::success(
        "Try out retrieved successfully",
        TryOutResponse::from(package),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/tryouts",
    request_body = CreateTryOutPayload,
    responses(
        (status = 201, description = "Try out created", body = Json<ApiResponse<TryOutResponse>>),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Name already taken")
    )
)]
#[axum::debug_handler]
pub async fn create_tryout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateTryOutPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let package = state.tryout_service.create(payload, claims.user_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Try out created successfully", TryOutResponse::from(package))),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/tryouts/{id}",
    params(("id" = i64, Path, description = "Try out ID")),
    request_body = UpdateTryOutPayload,
    responses(
        (status = 200, description = "Try out updated", body = Json<ApiResponse<TryOutResponse>>),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Try out not found")
    )
)]
#[axum::debug_handler]
pub async fn update_tryout(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateTryOutPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let package = state.tryout_service.update(id, payload).await?;
    Ok(Json(ApiResponse::success(
        "Try out updated successfully",
        TryOutResponse::from(package),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/v1/tryouts/{id}",
    params(("id" = i64, Path, description = "Try out ID")),
    responses(
        (status = 200, description = "Try out deleted"),
        (status = 404, description = "Try out not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_tryout(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.tryout_service.delete(id).await?;
    Ok(Json(ApiResponse::success("Try out deleted successfully", ())))
}

#[utoipa::path(
    get,
    path = "/api/v1/tryouts/{id}/tutors",
    params(("id" = i64, Path, description = "Try out ID")),
    responses(
        (status = 200, description = "Tutors with access", body = Json<ApiResponse<Vec<TutorPermissionResponse>>>),
        (status = 404, description = "Try out not found")
    )
)]
#[axum::debug_handler]
pub async fn list_tutors(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let tutors = state.tryout_service.list_tutors(id).await?;
    let data: Vec<TutorPermissionResponse> = tutors.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success("Tutor permissions retrieved successfully", data)))
}

#[utoipa::path(
    post,
    path = "/api/v1/tryouts/{id}/tutors",
    params(("id" = i64, Path, description = "Try out ID")),
    request_body = GrantTutorPayload,
    responses(
        (status = 201, description = "Permission granted", body = Json<ApiResponse<TutorPermissionResponse>>),
        (status = 404, description = "Try out or user not found"),
        (status = 409, description = "Permission already exists")
    )
)]
#[axum::debug_handler]
pub async fn grant_tutor(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<GrantTutorPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let permission = state
        .tryout_service
        .grant_tutor(id, payload.user_id, claims.user_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "Tutor permission granted successfully",
            TutorPermissionResponse::from(permission),
        )),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/tryouts/{id}/tutors/{userId}",
    params(
        ("id" = i64, Path, description = "Try out ID"),
        ("userId" = i64, Path, description = "Tutor user ID")
    ),
    responses(
        (status = 200, description = "Permission revoked"),
        (status = 404, description = "Permission not found")
    )
)]
#[axum::debug_handler]
pub async fn revoke_tutor(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse> {
    state.tryout_service.revoke_tutor(id, user_id).await?;
    Ok(Json(ApiResponse::success("Tutor permission revoked successfully", ())))
}
