//! # API エラー定義
//!
//! ハンドラ・ユースケースが返すエラーと、HTTP レスポンスへの変換を定義する。
//!
//! ## エラーの階層
//!
//! ```text
//! DomainError ─┐
//! InfraError ──┼─→ ApiError ─→ { "success": false, "error": "..." }
//! JsonRejection┘
//! ```
//!
//! 一意制約違反（[`InfraError::is_duplicate`]）は 400 として扱い、
//! それ以外のインフラエラーは詳細をログにのみ出力して 500 を返す。

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use devcamper_domain::DomainError;
use devcamper_infra::InfraError;
use devcamper_shared::ErrorResponse;
use thiserror::Error;

/// 一意制約違反時のメッセージ
pub const DUPLICATE_MESSAGE: &str = "Duplicate field value entered";
/// 未認証時のメッセージ
pub const UNAUTHORIZED_MESSAGE: &str = "Not authorized to access this route";

/// API 層で発生するエラー
#[derive(Debug, Error)]
pub enum ApiError {
    /// リソースが見つからない（404）
    #[error("{0}")]
    NotFound(String),

    /// 不正なリクエスト（400）
    #[error("{0}")]
    BadRequest(String),

    /// 未認証・認証情報の誤り（401）
    #[error("{0}")]
    Unauthorized(String),

    /// 権限不足（403）
    #[error("{0}")]
    Forbidden(String),

    /// レート制限超過（429）
    #[error("Too many requests, please try again later")]
    TooManyRequests,

    /// インフラ層のエラー（一意制約違反は 400、それ以外は 500）
    #[error("インフラエラー: {0}")]
    Infra(#[from] InfraError),

    /// 内部エラー（500）
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn unauthorized() -> Self {
        Self::Unauthorized(UNAUTHORIZED_MESSAGE.to_string())
    }

    /// HTTP ステータスとクライアントに返すメッセージ
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::TooManyRequests => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            Self::Infra(e) if e.is_duplicate() => {
                (StatusCode::BAD_REQUEST, DUPLICATE_MESSAGE.to_string())
            }
            Self::Infra(_) | Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::internal_error().error,
            ),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::Validation(msg) | DomainError::Conflict(msg) => Self::BadRequest(msg),
            e @ DomainError::NotFound { .. } => Self::NotFound(e.to_string()),
            DomainError::Forbidden(msg) => Self::Forbidden(msg),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        if status.is_server_error() {
            match &self {
                Self::Infra(e) => {
                    tracing::error!(
                        error.kind = "infra",
                        span_trace = %e.span_trace(),
                        "インフラエラー: {e}"
                    );
                }
                other => tracing::error!(error.kind = "internal", "{other}"),
            }
        }

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}
