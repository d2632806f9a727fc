//! # UserRepository
//!
//! ユーザーの永続化を担当するリポジトリ。
//! パスワードハッシュとリセットトークンのハッシュも同じテーブルに保存する。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use devcamper_domain::{
    list_query::{FieldKind, FieldSpec, ListQuery, ListSchema, Page},
    password::PasswordHash,
    user::{Email, PasswordReset, User, UserId, UserName, UserRole},
};
use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

use super::{invalid_row, list_sql::push_list_clauses};
use crate::error::InfraError;

/// ユーザー一覧のクエリ許可リスト
pub const USER_LIST_SCHEMA: ListSchema = ListSchema {
    fields:     &[
        FieldSpec::new("name", "u.name", FieldKind::Text),
        FieldSpec::new("email", "u.email", FieldKind::Text),
        FieldSpec::new("role", "u.role", FieldKind::Text),
        FieldSpec::new("created_at", "u.created_at", FieldKind::Timestamp),
    ],
    selectable: &["id", "name", "email", "role", "created_at"],
};

const SELECT_USERS: &str = r#"
    SELECT
        u.id, u.name, u.email, u.role, u.password_hash,
        u.reset_password_token, u.reset_password_expire, u.created_at
    FROM users u"#;

/// ユーザーリポジトリトレイト
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// 一覧クエリで 1 ページ分を取得する
    async fn list(&self, query: &ListQuery) -> Result<Page<User>, InfraError>;

    /// ID でユーザーを検索する
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, InfraError>;

    /// メールアドレスでユーザーを検索する
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, InfraError>;

    /// リセットトークンのハッシュでユーザーを検索する
    ///
    /// 期限切れかどうかは呼び出し側で判定する。
    async fn find_by_reset_token_hash(&self, token_hash: &str)
    -> Result<Option<User>, InfraError>;

    /// ユーザーを挿入する
    ///
    /// メールアドレスが重複する場合は `InfraErrorKind::Duplicate`
    async fn insert(&self, user: &User) -> Result<(), InfraError>;

    /// ユーザーを更新する（詳細・ロール・パスワード・リセット情報）
    async fn update(&self, user: &User) -> Result<(), InfraError>;

    /// ユーザーを削除する
    async fn delete(&self, id: &UserId) -> Result<(), InfraError>;
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id:                    Uuid,
    name:                  String,
    email:                 String,
    role:                  String,
    password_hash:         String,
    reset_password_token:  Option<String>,
    reset_password_expire: Option<DateTime<Utc>>,
    created_at:            DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = InfraError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let password_reset = match (row.reset_password_token, row.reset_password_expire) {
            (Some(hash), Some(expires_at)) => Some(PasswordReset::from_db(hash, expires_at)),
            _ => None,
        };

        Ok(User::from_db(
            UserId::from_uuid(row.id),
            UserName::new(row.name).map_err(invalid_row)?,
            Email::new(row.email).map_err(invalid_row)?,
            UserRole::parse(&row.role).map_err(invalid_row)?,
            PasswordHash::new(row.password_hash),
            password_reset,
            row.created_at,
        ))
    }
}

/// PostgreSQL 実装の UserRepository
#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, condition: &str, value: &str) -> Result<Option<User>, InfraError> {
        let row: Option<UserRow> = sqlx::query_as(&format!("{SELECT_USERS} WHERE {condition}"))
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.map(User::try_from).transpose()
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(page = query.page, limit = query.limit))]
    async fn list(&self, query: &ListQuery) -> Result<Page<User>, InfraError> {
        let mut builder = QueryBuilder::new(SELECT_USERS);
        push_list_clauses(&mut builder, query);

        let rows: Vec<UserRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        let users = rows
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::from_overfetch(users, query.limit))
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, InfraError> {
        let row: Option<UserRow> = sqlx::query_as(&format!("{SELECT_USERS} WHERE u.id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(User::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, InfraError> {
        self.find_one("u.email = $1", email.as_str()).await
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_by_reset_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<User>, InfraError> {
        self.find_one("u.reset_password_token = $1", token_hash).await
    }

    #[tracing::instrument(skip_all, level = "debug", fields(id = %user.id()))]
    async fn insert(&self, user: &User) -> Result<(), InfraError> {
        let reset = user.password_reset();
        sqlx::query(
            r#"
            INSERT INTO users (
                id, name, email, role, password_hash,
                reset_password_token, reset_password_expire, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id().as_uuid())
        .bind(user.name().as_str())
        .bind(user.email().as_str())
        .bind(user.role().as_str())
        .bind(user.password_hash().as_str())
        .bind(reset.map(PasswordReset::token_hash))
        .bind(reset.map(PasswordReset::expires_at))
        .bind(user.created_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(id = %user.id()))]
    async fn update(&self, user: &User) -> Result<(), InfraError> {
        let reset = user.password_reset();
        sqlx::query(
            r#"
            UPDATE users SET
                name = $2, email = $3, role = $4, password_hash = $5,
                reset_password_token = $6, reset_password_expire = $7
            WHERE id = $1
            "#,
        )
        .bind(user.id().as_uuid())
        .bind(user.name().as_str())
        .bind(user.email().as_str())
        .bind(user.role().as_str())
        .bind(user.password_hash().as_str())
        .bind(reset.map(PasswordReset::token_hash))
        .bind(reset.map(PasswordReset::expires_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn delete(&self, id: &UserId) -> Result<(), InfraError> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
