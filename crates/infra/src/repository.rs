//! # リポジトリ実装
//!
//! エンティティの永続化を PostgreSQL（sqlx）で実装する。
//!
//! - **トレイト経由**: ユースケース層は `Arc<dyn XxxRepository>` に依存し、
//!   テストでは [`crate::mock`] のインメモリ実装に差し替える
//! - **実行時クエリ**: `sqlx::query_as` と `FromRow` で行をマッピングする
//! - **一覧クエリ**: [`list_sql`] がフィルタ・ソート・ページングを
//!   バインドパラメータ付きの SQL に組み立てる

pub mod bootcamp_repository;
pub mod course_repository;
pub mod list_sql;
pub mod review_repository;
pub mod user_repository;

pub use bootcamp_repository::{BOOTCAMP_LIST_SCHEMA, BootcampRepository, PostgresBootcampRepository};
pub use course_repository::{COURSE_LIST_SCHEMA, CourseRepository, PostgresCourseRepository};
use devcamper_domain::DomainError;
pub use review_repository::{PostgresReviewRepository, REVIEW_LIST_SCHEMA, ReviewRepository};
pub use user_repository::{PostgresUserRepository, USER_LIST_SCHEMA, UserRepository};

use crate::InfraError;

/// DB から読み出した値がドメインの制約を満たさない場合のエラー
pub(crate) fn invalid_row(error: DomainError) -> InfraError {
    InfraError::unexpected(format!("DB に格納された値が不正です: {error}"))
}
