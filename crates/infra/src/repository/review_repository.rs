//! # ReviewRepository
//!
//! レビューの永続化を担当するリポジトリ。
//! `(bootcamp_id, user_id)` の一意制約により 1 ユーザー 1 件を保証する。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use devcamper_domain::{
    bootcamp::{BootcampId, BootcampSummary},
    list_query::{FieldKind, FieldSpec, ListQuery, ListSchema, Page},
    review::{Rating, Review, ReviewId, ReviewText, ReviewTitle},
    user::UserId,
};
use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

use super::{invalid_row, list_sql::push_list_clauses};
use crate::error::InfraError;

/// レビュー一覧のクエリ許可リスト
pub const REVIEW_LIST_SCHEMA: ListSchema = ListSchema {
    fields:     &[
        FieldSpec::new("title", "r.title", FieldKind::Text),
        FieldSpec::new("rating", "r.rating", FieldKind::Integer),
        FieldSpec::new("bootcamp", "r.bootcamp_id", FieldKind::Uuid),
        FieldSpec::new("user", "r.user_id", FieldKind::Uuid),
        FieldSpec::new("created_at", "r.created_at", FieldKind::Timestamp),
    ],
    selectable: &[
        "id",
        "title",
        "text",
        "rating",
        "bootcamp",
        "user",
        "created_at",
    ],
};

const SELECT_REVIEWS: &str = r#"
    SELECT r.id, r.bootcamp_id, r.user_id, r.title, r.text, r.rating, r.created_at
    FROM reviews r"#;

const SELECT_REVIEWS_WITH_BOOTCAMP: &str = r#"
    SELECT
        r.id, r.bootcamp_id, r.user_id, r.title, r.text, r.rating, r.created_at,
        b.name AS bootcamp_name, b.description AS bootcamp_description
    FROM reviews r
    JOIN bootcamps b ON b.id = r.bootcamp_id"#;

/// レビューリポジトリトレイト
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// 一覧クエリで 1 ページ分を取得する（ブートキャンプの概要付き）
    async fn list(&self, query: &ListQuery)
    -> Result<Page<(Review, BootcampSummary)>, InfraError>;

    /// ブートキャンプのレビューをすべて取得する
    async fn find_by_bootcamp(&self, bootcamp_id: &BootcampId) -> Result<Vec<Review>, InfraError>;

    /// ユーザーがレビューを書いているブートキャンプの ID（重複なし）
    async fn bootcamp_ids_by_user(&self, user_id: &UserId) -> Result<Vec<BootcampId>, InfraError>;

    /// ID でレビューを検索する
    async fn find_by_id(&self, id: &ReviewId) -> Result<Option<Review>, InfraError>;

    /// レビューを挿入する
    ///
    /// 同じユーザーが同じブートキャンプに 2 件目を挿入すると
    /// `InfraErrorKind::Duplicate` を返す。
    async fn insert(&self, review: &Review) -> Result<(), InfraError>;

    async fn update(&self, review: &Review) -> Result<(), InfraError>;

    async fn delete(&self, id: &ReviewId) -> Result<(), InfraError>;
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id:          Uuid,
    bootcamp_id: Uuid,
    user_id:     Uuid,
    title:       String,
    text:        String,
    rating:      i32,
    created_at:  DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ReviewWithBootcampRow {
    #[sqlx(flatten)]
    review:               ReviewRow,
    bootcamp_name:        String,
    bootcamp_description: String,
}

impl TryFrom<ReviewRow> for Review {
    type Error = InfraError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        Ok(Review::from_db(
            ReviewId::from_uuid(row.id),
            BootcampId::from_uuid(row.bootcamp_id),
            UserId::from_uuid(row.user_id),
            ReviewTitle::new(row.title).map_err(invalid_row)?,
            ReviewText::new(row.text).map_err(invalid_row)?,
            Rating::new(row.rating).map_err(invalid_row)?,
            row.created_at,
        ))
    }
}

impl TryFrom<ReviewWithBootcampRow> for (Review, BootcampSummary) {
    type Error = InfraError;

    fn try_from(row: ReviewWithBootcampRow) -> Result<Self, Self::Error> {
        let summary = BootcampSummary {
            id:          BootcampId::from_uuid(row.review.bootcamp_id),
            name:        row.bootcamp_name,
            description: row.bootcamp_description,
        };
        Ok((Review::try_from(row.review)?, summary))
    }
}

/// PostgreSQL 実装の ReviewRepository
#[derive(Debug, Clone)]
pub struct PostgresReviewRepository {
    pool: PgPool,
}

impl PostgresReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewRepository for PostgresReviewRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(page = query.page, limit = query.limit))]
    async fn list(
        &self,
        query: &ListQuery,
    ) -> Result<Page<(Review, BootcampSummary)>, InfraError> {
        let mut builder = QueryBuilder::new(SELECT_REVIEWS_WITH_BOOTCAMP);
        push_list_clauses(&mut builder, query);

        let rows: Vec<ReviewWithBootcampRow> =
            builder.build_query_as().fetch_all(&self.pool).await?;
        let items = rows
            .into_iter()
            .map(<(Review, BootcampSummary)>::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::from_overfetch(items, query.limit))
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%bootcamp_id))]
    async fn find_by_bootcamp(&self, bootcamp_id: &BootcampId) -> Result<Vec<Review>, InfraError> {
        let rows: Vec<ReviewRow> = sqlx::query_as(&format!(
            "{SELECT_REVIEWS} WHERE r.bootcamp_id = $1 ORDER BY r.created_at DESC"
        ))
        .bind(bootcamp_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Review::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%user_id))]
    async fn bootcamp_ids_by_user(&self, user_id: &UserId) -> Result<Vec<BootcampId>, InfraError> {
        let ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT DISTINCT bootcamp_id FROM reviews WHERE user_id = $1")
                .bind(user_id.as_uuid())
                .fetch_all(&self.pool)
                .await?;

        Ok(ids.into_iter().map(BootcampId::from_uuid).collect())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn find_by_id(&self, id: &ReviewId) -> Result<Option<Review>, InfraError> {
        let row: Option<ReviewRow> = sqlx::query_as(&format!("{SELECT_REVIEWS} WHERE r.id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Review::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(id = %review.id()))]
    async fn insert(&self, review: &Review) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO reviews (id, bootcamp_id, user_id, title, text, rating, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(review.id().as_uuid())
        .bind(review.bootcamp_id().as_uuid())
        .bind(review.user_id().as_uuid())
        .bind(review.title().as_str())
        .bind(review.text().as_str())
        .bind(review.rating().as_i32())
        .bind(review.created_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(id = %review.id()))]
    async fn update(&self, review: &Review) -> Result<(), InfraError> {
        sqlx::query("UPDATE reviews SET title = $2, text = $3, rating = $4 WHERE id = $1")
            .bind(review.id().as_uuid())
            .bind(review.title().as_str())
            .bind(review.text().as_str())
            .bind(review.rating().as_i32())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn delete(&self, id: &ReviewId) -> Result<(), InfraError> {
        sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
