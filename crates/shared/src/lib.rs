//! # DevCamper 共有ユーティリティ
//!
//! ワークスペース全体で使用される共通ユーティリティを提供する。
//!
//! ## 設計方針
//!
//! - 他のすべてのクレート（domain, infra, api）から依存される
//! - ビジネスロジックを含まない純粋なユーティリティのみを配置
//! - axum には依存しない（`IntoResponse` 変換は api クレートの責務）

pub mod api_response;
#[cfg(feature = "observability")]
pub mod canonical_log;
pub mod error_response;
pub mod health;
pub mod observability;
pub mod paginated_response;

pub use api_response::{ApiResponse, CountedResponse};
pub use error_response::ErrorResponse;
pub use health::{CheckStatus, HealthResponse, ReadinessResponse, ReadinessStatus};
pub use paginated_response::{PageLink, PaginatedResponse, Pagination};
