//! # ユーザー管理ハンドラ
//!
//! admin 専用。ロールの確認はユースケースで行う（admin 以外は 403）。
//!
//! - `GET /api/v1/users` / `GET /api/v1/users/{id}`
//! - `POST /api/v1/users`
//! - `PUT /api/v1/users/{id}` / `DELETE /api/v1/users/{id}`

use std::sync::Arc;

use axum::{
    Extension,
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use devcamper_domain::user::{User, UserId};
use devcamper_infra::repository::USER_LIST_SCHEMA;
use devcamper_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::{QueryPairs, paginated, parse_list_query};
use crate::{
    error::ApiError,
    middleware::CurrentUser,
    usecase::{CreateUserInput, UpdateUserInput, UserUseCaseImpl},
};

pub struct UserState {
    pub usecase: UserUseCaseImpl,
}

/// ユーザー DTO
///
/// パスワードハッシュとリセットトークンは含めない。
#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id:         Uuid,
    pub name:       String,
    pub email:      String,
    pub role:       &'static str,
    pub created_at: String,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id:         *user.id().as_uuid(),
            name:       user.name().as_str().to_string(),
            email:      user.email().as_str().to_string(),
            role:       user.role().as_str(),
            created_at: user.created_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateUserRequest {
    pub name:     String,
    pub email:    String,
    pub password: String,
    pub role:     Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateUserRequest {
    pub name:  Option<String>,
    pub email: Option<String>,
    pub role:  Option<String>,
}

/// GET /api/v1/users
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<Arc<UserState>>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<QueryPairs>,
) -> Result<impl IntoResponse, ApiError> {
    let query = parse_list_query(&params, &USER_LIST_SCHEMA)?;
    let page = state.usecase.list(&current.requester(), &query).await?;

    let response = paginated(page, &query, |u| UserDto::from(u))?;
    Ok((StatusCode::OK, Json(response)))
}

/// GET /api/v1/users/{id}
#[tracing::instrument(skip_all, fields(%id))]
pub async fn get_user(
    State(state): State<Arc<UserState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = UserId::parse(&id)?;
    let user = state.usecase.get(&current.requester(), &id).await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(UserDto::from(&user)))))
}

/// POST /api/v1/users
#[tracing::instrument(skip_all)]
pub async fn create_user(
    State(state): State<Arc<UserState>>,
    Extension(current): Extension<CurrentUser>,
    WithRejection(Json(req), _): WithRejection<Json<CreateUserRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let input = CreateUserInput {
        name:     req.name,
        email:    req.email,
        password: req.password,
        role:     req.role,
    };
    let user = state.usecase.create(&current.requester(), input).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(UserDto::from(&user))),
    ))
}

/// PUT /api/v1/users/{id}
#[tracing::instrument(skip_all, fields(%id))]
pub async fn update_user(
    State(state): State<Arc<UserState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateUserRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let id = UserId::parse(&id)?;
    let input = UpdateUserInput {
        name:  req.name,
        email: req.email,
        role:  req.role,
    };
    let user = state
        .usecase
        .update(&current.requester(), &id, input)
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(UserDto::from(&user)))))
}

/// DELETE /api/v1/users/{id}
#[tracing::instrument(skip_all, fields(%id))]
pub async fn delete_user(
    State(state): State<Arc<UserState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = UserId::parse(&id)?;
    state.usecase.delete(&current.requester(), &id).await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(json!({})))))
}
