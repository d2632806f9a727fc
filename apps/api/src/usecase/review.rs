//! レビューユースケース
//!
//! 1 ユーザーにつき 1 ブートキャンプ 1 件まで（DB の一意制約で保証）。
//! 書き込み後は所属ブートキャンプの平均評価を再計算する。

use std::sync::Arc;

use devcamper_domain::{
    bootcamp::{BootcampId, BootcampSummary},
    clock::Clock,
    list_query::{ListQuery, Page},
    ownership::{Requester, ensure_owner_or_admin, ensure_role},
    review::{
        NewReview,
        Rating,
        Review,
        ReviewChanges,
        ReviewId,
        ReviewText,
        ReviewTitle,
    },
    user::UserRole,
};
use devcamper_infra::repository::{BootcampRepository, ReviewRepository};

use super::helpers::{FindResultExt, parse_optional, refresh_average_rating};
use crate::error::ApiError;

const REVIEWING_ROLES: &[UserRole] = &[UserRole::User, UserRole::Admin];

/// レビュー作成の入力
#[derive(Debug, Default)]
pub struct CreateReviewInput {
    pub title:  String,
    pub text:   String,
    pub rating: i32,
}

/// レビュー更新の入力（`None` は変更なし）
#[derive(Debug, Default)]
pub struct UpdateReviewInput {
    pub title:  Option<String>,
    pub text:   Option<String>,
    pub rating: Option<i32>,
}

/// レビューユースケース
pub struct ReviewUseCaseImpl {
    review_repository:   Arc<dyn ReviewRepository>,
    bootcamp_repository: Arc<dyn BootcampRepository>,
    clock:               Arc<dyn Clock>,
}

impl ReviewUseCaseImpl {
    pub fn new(
        review_repository: Arc<dyn ReviewRepository>,
        bootcamp_repository: Arc<dyn BootcampRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            review_repository,
            bootcamp_repository,
            clock,
        }
    }

    pub async fn list(
        &self,
        query: &ListQuery,
    ) -> Result<Page<(Review, BootcampSummary)>, ApiError> {
        Ok(self.review_repository.list(query).await?)
    }

    pub async fn list_by_bootcamp(
        &self,
        bootcamp_id: &BootcampId,
    ) -> Result<(Vec<Review>, BootcampSummary), ApiError> {
        let bootcamp = self
            .bootcamp_repository
            .find_by_id(bootcamp_id)
            .await
            .or_not_found("Bootcamp", bootcamp_id)?;
        let reviews = self.review_repository.find_by_bootcamp(bootcamp_id).await?;

        Ok((reviews, bootcamp.summary()))
    }

    pub async fn get(&self, id: &ReviewId) -> Result<(Review, BootcampSummary), ApiError> {
        let review = self.find(id).await?;
        let bootcamp = self
            .bootcamp_repository
            .find_by_id(review.bootcamp_id())
            .await
            .or_not_found("Bootcamp", review.bootcamp_id())?;

        Ok((review, bootcamp.summary()))
    }

    /// ブートキャンプにレビューを追加する
    ///
    /// 同じブートキャンプへの 2 件目は一意制約違反（400）になる。
    pub async fn create(
        &self,
        requester: &Requester,
        bootcamp_id: &BootcampId,
        input: CreateReviewInput,
    ) -> Result<Review, ApiError> {
        ensure_role(requester, REVIEWING_ROLES)?;

        self.bootcamp_repository
            .find_by_id(bootcamp_id)
            .await
            .or_not_found("Bootcamp", bootcamp_id)?;

        let review = Review::new(NewReview {
            bootcamp_id: bootcamp_id.clone(),
            user_id:     requester.id().clone(),
            title:       ReviewTitle::new(input.title)?,
            text:        ReviewText::new(input.text)?,
            rating:      Rating::new(input.rating)?,
            now:         self.clock.now(),
        });

        self.review_repository.insert(&review).await?;
        self.recompute_average_rating(bootcamp_id).await?;

        Ok(review)
    }

    pub async fn update(
        &self,
        requester: &Requester,
        id: &ReviewId,
        input: UpdateReviewInput,
    ) -> Result<Review, ApiError> {
        let review = self.find(id).await?;
        ensure_owner_or_admin(requester, review.user_id(), &format!("update review {id}"))?;

        let changes = ReviewChanges {
            title:  parse_optional(input.title, ReviewTitle::new)?,
            text:   parse_optional(input.text, ReviewText::new)?,
            rating: input.rating.map(Rating::new).transpose()?,
        };

        let updated = review.apply(changes);
        self.review_repository.update(&updated).await?;
        self.recompute_average_rating(updated.bootcamp_id()).await?;

        Ok(updated)
    }

    pub async fn delete(&self, requester: &Requester, id: &ReviewId) -> Result<(), ApiError> {
        let review = self.find(id).await?;
        ensure_owner_or_admin(requester, review.user_id(), &format!("delete review {id}"))?;

        self.review_repository.delete(id).await?;
        self.recompute_average_rating(review.bootcamp_id()).await?;

        Ok(())
    }

    async fn find(&self, id: &ReviewId) -> Result<Review, ApiError> {
        self.review_repository
            .find_by_id(id)
            .await
            .or_not_found("Review", id)
    }

    async fn recompute_average_rating(&self, bootcamp_id: &BootcampId) -> Result<(), ApiError> {
        refresh_average_rating(
            self.review_repository.as_ref(),
            self.bootcamp_repository.as_ref(),
            bootcamp_id,
        )
        .await
    }
}
