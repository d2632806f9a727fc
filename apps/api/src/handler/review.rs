//! # レビューハンドラ
//!
//! - `GET /api/v1/reviews` - 一覧（ページング）
//! - `GET /api/v1/bootcamps/{id}/reviews` - ブートキャンプ配下の全件
//! - `GET /api/v1/reviews/{id}` - 詳細
//! - `POST /api/v1/bootcamps/{id}/reviews` - 投稿（user / admin、1 ブートキャンプにつき 1 件）
//! - `PUT /api/v1/reviews/{id}` / `DELETE /api/v1/reviews/{id}` - 投稿者 / admin のみ

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
    review::{Review, ReviewId},
};
use devcamper_infra::repository::REVIEW_LIST_SCHEMA;
use devcamper_shared::{ApiResponse, CountedResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::{BootcampRef, QueryPairs, paginated, parse_list_query};
use crate::{
    error::ApiError,
    middleware::CurrentUser,
    usecase::{CreateReviewInput, ReviewUseCaseImpl, UpdateReviewInput},
};

pub struct ReviewState {
    pub usecase: ReviewUseCaseImpl,
}

#[derive(Debug, Serialize)]
pub struct ReviewDto {
    pub id:         Uuid,
    pub title:      String,
    pub text:       String,
    pub rating:     i32,
    pub bootcamp:   BootcampRef,
    pub user:       Uuid,
    pub created_at: String,
}

impl ReviewDto {
    fn new(review: &Review, bootcamp: BootcampRef) -> Self {
        Self {
            id: *review.id().as_uuid(),
            title: review.title().as_str().to_string(),
            text: review.text().as_str().to_string(),
            rating: review.rating().as_i32(),
            bootcamp,
            user: *review.user_id().as_uuid(),
            created_at: review.created_at().to_rfc3339(),
        }
    }
}

impl From<&Review> for ReviewDto {
    fn from(review: &Review) -> Self {
        Self::new(review, BootcampRef::Id(*review.bootcamp_id().as_uuid()))
    }
}

impl From<&(Review, BootcampSummary)> for ReviewDto {
    fn from((review, summary): &(Review, BootcampSummary)) -> Self {
        Self::new(review, BootcampRef::from(summary))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateReviewRequest {
    pub title:  String,
    pub text:   String,
    pub rating: i32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateReviewRequest {
    pub title:  Option<String>,
    pub text:   Option<String>,
    pub rating: Option<i32>,
}

/// GET /api/v1/reviews
#[tracing::instrument(skip_all)]
pub async fn list_reviews(
    State(state): State<Arc<ReviewState>>,
    Query(params): Query<QueryPairs>,
) -> Result<impl IntoResponse, ApiError> {
    let query = parse_list_query(&params, &REVIEW_LIST_SCHEMA)?;
    let page = state.usecase.list(&query).await?;

    let response = paginated(page, &query, |r| ReviewDto::from(r))?;
    Ok((StatusCode::OK, Json(response)))
}

/// GET /api/v1/bootcamps/{id}/reviews
#[tracing::instrument(skip_all, fields(bootcamp_id = %bootcamp_id))]
pub async fn list_bootcamp_reviews(
    State(state): State<Arc<ReviewState>>,
    Path(bootcamp_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let bootcamp_id = BootcampId::parse(&bootcamp_id)?;
    let (reviews, summary) = state.usecase.list_by_bootcamp(&bootcamp_id).await?;

    let data: Vec<ReviewDto> = reviews
        .iter()
        .map(|review| ReviewDto::new(review, BootcampRef::from(&summary)))
        .collect();

    Ok((StatusCode::OK, Json(CountedResponse::new(data))))
}

/// GET /api/v1/reviews/{id}
#[tracing::instrument(skip_all, fields(%id))]
pub async fn get_review(
    State(state): State<Arc<ReviewState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = ReviewId::parse(&id)?;
    let found = state.usecase.get(&id).await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(ReviewDto::from(&found)))))
}

/// POST /api/v1/bootcamps/{id}/reviews
///
/// 同じブートキャンプへの 2 件目は 400。
#[tracing::instrument(skip_all, fields(bootcamp_id = %bootcamp_id))]
pub async fn create_review(
    State(state): State<Arc<ReviewState>>,
    Extension(current): Extension<CurrentUser>,
    Path(bootcamp_id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<CreateReviewRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let bootcamp_id = BootcampId::parse(&bootcamp_id)?;
    let input = CreateReviewInput {
        title:  req.title,
        text:   req.text,
        rating: req.rating,
    };

    let review = state
        .usecase
        .create(&current.requester(), &bootcamp_id, input)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(ReviewDto::from(&review))),
    ))
}

/// PUT /api/v1/reviews/{id}
#[tracing::instrument(skip_all, fields(%id))]
pub async fn update_review(
    State(state): State<Arc<ReviewState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateReviewRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let id = ReviewId::parse(&id)?;
    let input = UpdateReviewInput {
        title:  req.title,
        text:   req.text,
        rating: req.rating,
    };

    let review = state
        .usecase
        .update(&current.requester(), &id, input)
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(ReviewDto::from(&review)))))
}

/// DELETE /api/v1/reviews/{id}
#[tracing::instrument(skip_all, fields(%id))]
pub async fn delete_review(
    State(state): State<Arc<ReviewState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = ReviewId::parse(&id)?;
    state.usecase.delete(&current.requester(), &id).await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(json!({})))))
}
