//! # PostgreSQL データベース接続管理
//!
//! 接続プールの作成とマイグレーションの実行を行う。
//!
//! ```rust,ignore
//! use devcamper_infra::db;
//!
//! let pool = db::create_pool("postgres://localhost/devcamper").await?;
//! db::run_migrations(&pool).await?;
//! ```

use std::time::Duration;

use sqlx::{PgPool, postgres::PgPoolOptions};

/// データベースマイグレーションを実行する
///
/// `sqlx::migrate!()` で埋め込まれたマイグレーションを順番に適用する。
/// 適用済みのマイグレーションはスキップされる。
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

/// PostgreSQL 接続プールを作成する
///
/// - `max_connections(10)`: 最大接続数
/// - `acquire_timeout(5秒)`: 接続取得のタイムアウト
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}
