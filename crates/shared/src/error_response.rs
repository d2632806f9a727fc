//! # エラーレスポンス
//!
//! 全エンドポイントで共通のエラーレスポンス `{ "success": false, "error": "..." }` を提供する。
//!
//! ## 設計
//!
//! - `ErrorResponse` は純粋なデータ構造（`Serialize` / `Deserialize` のみ）
//! - HTTP ステータスはボディに含めず、レスポンスのステータスラインで表す
//! - axum の `IntoResponse` 変換は api クレートの責務

use serde::{Deserialize, Serialize};

/// 500 系エラーで返す固定メッセージ（内部情報を漏らさない）
pub const INTERNAL_ERROR_MESSAGE: &str = "Server Error";

/// エラーレスポンス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error:   String,
}

impl ErrorResponse {
    /// エラーメッセージからレスポンスを作成する
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error:   error.into(),
        }
    }

    /// 500 Internal Server Error 用のレスポンス
    ///
    /// メッセージは固定値。
    pub fn internal_error() -> Self {
        Self::new(INTERNAL_ERROR_MESSAGE)
    }
}
