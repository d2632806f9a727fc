//! # CourseRepository
//!
//! コースの永続化を担当するリポジトリ。
//! 一覧ではブートキャンプを結合し、名前と説明を添えて返す。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use devcamper_domain::{
    bootcamp::{BootcampId, BootcampSummary},
    course::{
        Course,
        CourseDescription,
        CourseId,
        CourseRecord,
        CourseTitle,
        MinimumSkill,
        Tuition,
        Weeks,
    },
    list_query::{FieldKind, FieldSpec, ListQuery, ListSchema, Page},
    user::UserId,
};
use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

use super::{invalid_row, list_sql::push_list_clauses};
use crate::error::InfraError;

/// コース一覧のクエリ許可リスト
pub const COURSE_LIST_SCHEMA: ListSchema = ListSchema {
    fields:     &[
        FieldSpec::new("title", "c.title", FieldKind::Text),
        FieldSpec::new("weeks", "c.weeks", FieldKind::Integer),
        FieldSpec::new("tuition", "c.tuition", FieldKind::Integer),
        FieldSpec::new("minimum_skill", "c.minimum_skill", FieldKind::Text),
        FieldSpec::new(
            "scholarship_available",
            "c.scholarship_available",
            FieldKind::Boolean,
        ),
        FieldSpec::new("bootcamp", "c.bootcamp_id", FieldKind::Uuid),
        FieldSpec::new("user", "c.user_id", FieldKind::Uuid),
        FieldSpec::new("created_at", "c.created_at", FieldKind::Timestamp),
    ],
    selectable: &[
        "id",
        "title",
        "description",
        "weeks",
        "tuition",
        "minimum_skill",
        "scholarship_available",
        "bootcamp",
        "user",
        "created_at",
    ],
};

const SELECT_COURSES: &str = r#"
    SELECT
        c.id, c.bootcamp_id, c.user_id, c.title, c.description, c.weeks, c.tuition,
        c.minimum_skill, c.scholarship_available, c.created_at
    FROM courses c"#;

const SELECT_COURSES_WITH_BOOTCAMP: &str = r#"
    SELECT
        c.id, c.bootcamp_id, c.user_id, c.title, c.description, c.weeks, c.tuition,
        c.minimum_skill, c.scholarship_available, c.created_at,
        b.name AS bootcamp_name, b.description AS bootcamp_description
    FROM courses c
    JOIN bootcamps b ON b.id = c.bootcamp_id"#;

/// コースリポジトリトレイト
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// 一覧クエリで 1 ページ分を取得する（ブートキャンプの概要付き）
    async fn list(&self, query: &ListQuery)
    -> Result<Page<(Course, BootcampSummary)>, InfraError>;

    /// ブートキャンプのコースをすべて取得する
    async fn find_by_bootcamp(&self, bootcamp_id: &BootcampId) -> Result<Vec<Course>, InfraError>;

    /// ユーザーがコースを書いているブートキャンプの ID（重複なし）
    async fn bootcamp_ids_by_user(&self, user_id: &UserId) -> Result<Vec<BootcampId>, InfraError>;

    /// ID でコースを検索する
    async fn find_by_id(&self, id: &CourseId) -> Result<Option<Course>, InfraError>;

    async fn insert(&self, course: &Course) -> Result<(), InfraError>;

    async fn update(&self, course: &Course) -> Result<(), InfraError>;

    async fn delete(&self, id: &CourseId) -> Result<(), InfraError>;
}

#[derive(sqlx::FromRow)]
struct CourseRow {
    id:                    Uuid,
    bootcamp_id:           Uuid,
    user_id:               Uuid,
    title:                 String,
    description:           String,
    weeks:                 i32,
    tuition:               i32,
    minimum_skill:         String,
    scholarship_available: bool,
    created_at:            DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CourseWithBootcampRow {
    #[sqlx(flatten)]
    course:               CourseRow,
    bootcamp_name:        String,
    bootcamp_description: String,
}

impl TryFrom<CourseRow> for Course {
    type Error = InfraError;

    fn try_from(row: CourseRow) -> Result<Self, Self::Error> {
        Ok(Course::from_db(CourseRecord {
            id:                    CourseId::from_uuid(row.id),
            bootcamp_id:           BootcampId::from_uuid(row.bootcamp_id),
            user_id:               UserId::from_uuid(row.user_id),
            title:                 CourseTitle::new(row.title).map_err(invalid_row)?,
            description:           CourseDescription::new(row.description)
                .map_err(invalid_row)?,
            weeks:                 Weeks::new(row.weeks).map_err(invalid_row)?,
            tuition:               Tuition::new(row.tuition).map_err(invalid_row)?,
            minimum_skill:         MinimumSkill::parse(&row.minimum_skill).map_err(invalid_row)?,
            scholarship_available: row.scholarship_available,
            created_at:            row.created_at,
        }))
    }
}

impl TryFrom<CourseWithBootcampRow> for (Course, BootcampSummary) {
    type Error = InfraError;

    fn try_from(row: CourseWithBootcampRow) -> Result<Self, Self::Error> {
        let summary = BootcampSummary {
            id:          BootcampId::from_uuid(row.course.bootcamp_id),
            name:        row.bootcamp_name,
            description: row.bootcamp_description,
        };
        Ok((Course::try_from(row.course)?, summary))
    }
}

/// PostgreSQL 実装の CourseRepository
#[derive(Debug, Clone)]
pub struct PostgresCourseRepository {
    pool: PgPool,
}

impl PostgresCourseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CourseRepository for PostgresCourseRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(page = query.page, limit = query.limit))]
    async fn list(
        &self,
        query: &ListQuery,
    ) -> Result<Page<(Course, BootcampSummary)>, InfraError> {
        let mut builder = QueryBuilder::new(SELECT_COURSES_WITH_BOOTCAMP);
        push_list_clauses(&mut builder, query);

        let rows: Vec<CourseWithBootcampRow> =
            builder.build_query_as().fetch_all(&self.pool).await?;
        let items = rows
            .into_iter()
            .map(<(Course, BootcampSummary)>::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::from_overfetch(items, query.limit))
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%bootcamp_id))]
    async fn find_by_bootcamp(&self, bootcamp_id: &BootcampId) -> Result<Vec<Course>, InfraError> {
        let rows: Vec<CourseRow> = sqlx::query_as(&format!(
            "{SELECT_COURSES} WHERE c.bootcamp_id = $1 ORDER BY c.created_at DESC"
        ))
        .bind(bootcamp_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Course::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%user_id))]
    async fn bootcamp_ids_by_user(&self, user_id: &UserId) -> Result<Vec<BootcampId>, InfraError> {
        let ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT DISTINCT bootcamp_id FROM courses WHERE user_id = $1")
                .bind(user_id.as_uuid())
                .fetch_all(&self.pool)
                .await?;

        Ok(ids.into_iter().map(BootcampId::from_uuid).collect())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn find_by_id(&self, id: &CourseId) -> Result<Option<Course>, InfraError> {
        let row: Option<CourseRow> = sqlx::query_as(&format!("{SELECT_COURSES} WHERE c.id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Course::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(id = %course.id()))]
    async fn insert(&self, course: &Course) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO courses (
                id, bootcamp_id, user_id, title, description, weeks, tuition,
                minimum_skill, scholarship_available, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(course.id().as_uuid())
        .bind(course.bootcamp_id().as_uuid())
        .bind(course.user_id().as_uuid())
        .bind(course.title().as_str())
        .bind(course.description().as_str())
        .bind(course.weeks().as_i32())
        .bind(course.tuition().as_i32())
        .bind(course.minimum_skill().as_str())
        .bind(course.scholarship_available())
        .bind(course.created_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(id = %course.id()))]
    async fn update(&self, course: &Course) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            UPDATE courses SET
                title = $2, description = $3, weeks = $4, tuition = $5,
                minimum_skill = $6, scholarship_available = $7
            WHERE id = $1
            "#,
        )
        .bind(course.id().as_uuid())
        .bind(course.title().as_str())
        .bind(course.description().as_str())
        .bind(course.weeks().as_i32())
        .bind(course.tuition().as_i32())
        .bind(course.minimum_skill().as_str())
        .bind(course.scholarship_available())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn delete(&self, id: &CourseId) -> Result<(), InfraError> {
        sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
