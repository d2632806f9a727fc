//! # ドメイン層エラー定義
//!
//! ビジネスルール違反やドメイン固有の例外状態を表現するエラー型。
//!
//! ## エラーの種類と HTTP ステータスの対応
//!
//! | エラー種別 | HTTP ステータス | 用途 |
//! |-----------|----------------|------|
//! | `Validation` | 400 Bad Request | 入力値の検証失敗 |
//! | `NotFound` | 404 Not Found | エンティティが存在しない |
//! | `Conflict` | 400 Bad Request | 一意性制約・件数制限の違反 |
//! | `Forbidden` | 403 Forbidden | 所有者・ロール不一致 |
//!
//! ```rust
//! use devcamper_domain::DomainError;
//!
//! fn validate_name(name: &str) -> Result<(), DomainError> {
//!     if name.is_empty() {
//!         return Err(DomainError::Validation("Please add a name".to_string()));
//!     }
//!     Ok(())
//! }
//!
//! assert!(validate_name("").is_err());
//! ```

use thiserror::Error;

/// ドメイン層で発生するエラー
///
/// API 層でこのエラーを受け取り、適切な HTTP レスポンスに変換する。
/// メッセージはそのままクライアントに返されるため、内部情報を含めないこと。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// バリデーションエラー
    ///
    /// - 必須フィールドが未入力
    /// - 文字数・値域の超過
    /// - 不正なフォーマット
    #[error("{0}")]
    Validation(String),

    /// エンティティが見つからない
    #[error("{entity_type} not found with id of {id}")]
    NotFound {
        /// エンティティの種類（"Bootcamp", "Course" など）
        entity_type: &'static str,
        /// 検索に使用した識別子
        id:          String,
    },

    /// 競合エラー
    ///
    /// 同一ユーザーによる 2 件目のレビュー、2 件目のブートキャンプ公開など、
    /// 既存データとの組み合わせで成立しない操作に使用する。
    #[error("{0}")]
    Conflict(String),

    /// 権限エラー
    ///
    /// 認証（Authentication）ではなく認可（Authorization）の失敗を表す。
    #[error("{0}")]
    Forbidden(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_foundのメッセージにエンティティ名とidを含む() {
        let error = DomainError::NotFound {
            entity_type: "Bootcamp",
            id:          "abc".to_string(),
        };

        assert_eq!(error.to_string(), "Bootcamp not found with id of abc");
    }

    #[test]
    fn test_validationのメッセージはそのまま返る() {
        let error = DomainError::Validation("Please add a title".to_string());

        assert_eq!(error.to_string(), "Please add a title");
    }
}
