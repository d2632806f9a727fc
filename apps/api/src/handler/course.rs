//! # コースハンドラ
//!
//! - `GET /api/v1/courses` - 一覧（ブートキャンプ概要付き、ページング）
//! - `GET /api/v1/bootcamps/{id}/courses` - ブートキャンプ配下の全件
//! - `GET /api/v1/courses/{id}` - 詳細
//! - `POST /api/v1/bootcamps/{id}/courses` - 作成（ブートキャンプの所有者 / admin）
//! - `PUT /api/v1/courses/{id}` - 部分更新
//! - `DELETE /api/v1/courses/{id}` - 削除
//!
//! 作成・更新・削除のたびにブートキャンプの平均費用が再計算される。

use std::sync::Arc;

use axum::{
    Extension,
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use devcamper_domain::{
    bootcamp::{BootcampId, BootcampSummary},
    course::{Course, CourseId},
};
use devcamper_infra::repository::COURSE_LIST_SCHEMA;
use devcamper_shared::{ApiResponse, CountedResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::{BootcampRef, QueryPairs, paginated, parse_list_query};
use crate::{
    error::ApiError,
    middleware::CurrentUser,
    usecase::{CourseUseCaseImpl, CreateCourseInput, UpdateCourseInput},
};

pub struct CourseState {
    pub usecase: CourseUseCaseImpl,
}

#[derive(Debug, Serialize)]
pub struct CourseDto {
    pub id:                    Uuid,
    pub title:                 String,
    pub description:           String,
    pub weeks:                 i32,
    pub tuition:               i32,
    pub minimum_skill:         &'static str,
    pub scholarship_available: bool,
    pub bootcamp:              BootcampRef,
    pub user:                  Uuid,
    pub created_at:            String,
}

impl CourseDto {
    fn new(course: &Course, bootcamp: BootcampRef) -> Self {
        Self {
            id: *course.id().as_uuid(),
            title: course.title().as_str().to_string(),
            description: course.description().as_str().to_string(),
            weeks: course.weeks().as_i32(),
            tuition: course.tuition().as_i32(),
            minimum_skill: course.minimum_skill().as_str(),
            scholarship_available: course.scholarship_available(),
            bootcamp,
            user: *course.user_id().as_uuid(),
            created_at: course.created_at().to_rfc3339(),
        }
    }
}

impl From<&Course> for CourseDto {
    fn from(course: &Course) -> Self {
        Self::new(course, BootcampRef::Id(*course.bootcamp_id().as_uuid()))
    }
}

impl From<&(Course, BootcampSummary)> for CourseDto {
    fn from((course, summary): &(Course, BootcampSummary)) -> Self {
        Self::new(course, BootcampRef::from(summary))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateCourseRequest {
    pub title:                 String,
    pub description:           String,
    pub weeks:                 i32,
    pub tuition:               i32,
    pub minimum_skill:         String,
    pub scholarship_available: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateCourseRequest {
    pub title:                 Option<String>,
    pub description:           Option<String>,
    pub weeks:                 Option<i32>,
    pub tuition:               Option<i32>,
    pub minimum_skill:         Option<String>,
    pub scholarship_available: Option<bool>,
}

/// GET /api/v1/courses
#[tracing::instrument(skip_all)]
pub async fn list_courses(
    State(state): State<Arc<CourseState>>,
    Query(params): Query<QueryPairs>,
) -> Result<impl IntoResponse, ApiError> {
    let query = parse_list_query(&params, &COURSE_LIST_SCHEMA)?;
    let page = state.usecase.list(&query).await?;

    let response = paginated(page, &query, |c| CourseDto::from(c))?;
    Ok((StatusCode::OK, Json(response)))
}

/// GET /api/v1/bootcamps/{id}/courses
#[tracing::instrument(skip_all, fields(bootcamp_id = %bootcamp_id))]
pub async fn list_bootcamp_courses(
    State(state): State<Arc<CourseState>>,
    Path(bootcamp_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let bootcamp_id = BootcampId::parse(&bootcamp_id)?;
    let (courses, summary) = state.usecase.list_by_bootcamp(&bootcamp_id).await?;

    let data: Vec<CourseDto> = courses
        .iter()
        .map(|course| CourseDto::new(course, BootcampRef::from(&summary)))
        .collect();

    Ok((StatusCode::OK, Json(CountedResponse::new(data))))
}

/// GET /api/v1/courses/{id}
#[tracing::instrument(skip_all, fields(%id))]
pub async fn get_course(
    State(state): State<Arc<CourseState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = CourseId::parse(&id)?;
    let found = state.usecase.get(&id).await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(CourseDto::from(&found)))))
}

/// POST /api/v1/bootcamps/{id}/courses
#[tracing::instrument(skip_all, fields(bootcamp_id = %bootcamp_id))]
pub async fn create_course(
    State(state): State<Arc<CourseState>>,
    Extension(current): Extension<CurrentUser>,
    Path(bootcamp_id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<CreateCourseRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let bootcamp_id = BootcampId::parse(&bootcamp_id)?;
    let input = CreateCourseInput {
        title:                 req.title,
        description:           req.description,
        weeks:                 req.weeks,
        tuition:               req.tuition,
        minimum_skill:         req.minimum_skill,
        scholarship_available: req.scholarship_available,
    };

    let course = state
        .usecase
        .create(&current.requester(), &bootcamp_id, input)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(CourseDto::from(&course))),
    ))
}

/// PUT /api/v1/courses/{id}
#[tracing::instrument(skip_all, fields(%id))]
pub async fn update_course(
    State(state): State<Arc<CourseState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateCourseRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let id = CourseId::parse(&id)?;
    let input = UpdateCourseInput {
        title:                 req.title,
        description:           req.description,
        weeks:                 req.weeks,
        tuition:               req.tuition,
        minimum_skill:         req.minimum_skill,
        scholarship_available: req.scholarship_available,
    };

    let course = state
        .usecase
        .update(&current.requester(), &id, input)
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(CourseDto::from(&course)))))
}

/// DELETE /api/v1/courses/{id}
#[tracing::instrument(skip_all, fields(%id))]
pub async fn delete_course(
    State(state): State<Arc<CourseState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = CourseId::parse(&id)?;
    state.usecase.delete(&current.requester(), &id).await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(json!({})))))
}
