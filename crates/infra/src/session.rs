//! # セッション管理
//!
//! Redis を使用したセッション管理を提供する。
//!
//! ## Redis キー設計
//!
//! | キー | 値 | TTL |
//! |-----|-----|-----|
//! | `session:{token}` | SessionData (JSON) | `SESSION_TTL_SECONDS`（既定 30 日） |
//!
//! トークンは UUID v4 の文字列で、クライアントには Bearer トークンまたは
//! `token` Cookie として渡す。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use devcamper_domain::user::UserId;
use redis::{AsyncCommands, aio::ConnectionManager};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::InfraError;

/// セッションの既定有効期限（秒）: 30 日
pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 30 * 24 * 60 * 60;

/// セッションデータ
///
/// Redis に JSON 形式で保存される。ロールや名前は保持せず、
/// リクエストごとに DB から最新のユーザーを読み込む。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    user_id:    UserId,
    created_at: DateTime<Utc>,
}

impl SessionData {
    pub fn new(user_id: UserId, created_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            created_at,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// セッション管理トレイト
#[async_trait]
pub trait SessionManager: Send + Sync {
    /// セッションを作成し、トークンを返す
    async fn create(&self, data: &SessionData) -> Result<String, InfraError>;

    /// セッションを取得する
    ///
    /// 存在しない、または期限切れの場合は `None`
    async fn get(&self, token: &str) -> Result<Option<SessionData>, InfraError>;

    /// セッションを削除する
    ///
    /// 存在しないセッションを削除しても成功とする。
    async fn delete(&self, token: &str) -> Result<(), InfraError>;

    /// 疎通確認
    async fn ping(&self) -> Result<(), InfraError>;
}

/// Redis を使用したセッションマネージャ
pub struct RedisSessionManager {
    conn:        ConnectionManager,
    ttl_seconds: u64,
}

impl RedisSessionManager {
    /// 新しい RedisSessionManager を作成する
    ///
    /// - `redis_url`: Redis 接続 URL（例: `redis://localhost:6379`）
    /// - `ttl_seconds`: セッションの有効期限
    pub async fn new(redis_url: &str, ttl_seconds: u64) -> Result<Self, InfraError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn, ttl_seconds })
    }

    fn session_key(token: &str) -> String {
        format!("session:{token}")
    }
}

#[async_trait]
impl SessionManager for RedisSessionManager {
    #[tracing::instrument(skip_all, level = "debug", fields(user_id = %data.user_id()))]
    async fn create(&self, data: &SessionData) -> Result<String, InfraError> {
        let token = Uuid::new_v4().to_string();
        let json = serde_json::to_string(data)?;

        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(Self::session_key(&token), json, self.ttl_seconds)
            .await?;

        Ok(token)
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn get(&self, token: &str) -> Result<Option<SessionData>, InfraError> {
        let mut conn = self.conn.clone();
        let result: Option<String> = conn.get(Self::session_key(token)).await?;

        match result {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn delete(&self, token: &str) -> Result<(), InfraError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(Self::session_key(token)).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), InfraError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
