//! # インフラ層エラー定義
//!
//! データベースや外部サービスとの通信で発生するエラーを表現する。
//!
//! ## 構造
//!
//! `std::io::Error` と同じ struct + enum パターンを採用:
//! - [`InfraError`]: エラー種別（[`InfraErrorKind`]）と [`SpanTrace`] を保持するラッパー
//! - [`InfraErrorKind`]: エラーの具体的な種別（Database, Redis, Duplicate 等）
//!
//! `From` 実装や convenience constructor でエラーを生成すると、
//! その時点のスパン情報が自動的に記録される。

use std::fmt;

use derive_more::Display;
use thiserror::Error;
use tracing_error::SpanTrace;

/// インフラ層で発生するエラー
///
/// エラー種別に応じた処理には [`kind()`](InfraError::kind) を使用する:
///
/// ```ignore
/// match error.kind() {
///     InfraErrorKind::Duplicate(constraint) => { /* 400 */ }
///     _ => { /* 500 */ }
/// }
/// ```
#[derive(Display)]
#[display("{kind}")]
pub struct InfraError {
    kind:       InfraErrorKind,
    span_trace: SpanTrace,
}

/// インフラ層エラーの種別
#[derive(Debug, Error)]
pub enum InfraErrorKind {
    /// データベースエラー
    ///
    /// SQL クエリの実行失敗、接続エラーなど。一意制約違反は [`Self::Duplicate`] に分類する。
    #[error("データベースエラー: {0}")]
    Database(#[source] sqlx::Error),

    /// 一意制約違反
    ///
    /// 値は違反した制約名（不明な場合は空文字列）。
    #[error("一意制約違反: {0}")]
    Duplicate(String),

    /// Redis エラー
    #[error("Redis エラー: {0}")]
    Redis(#[source] redis::RedisError),

    /// シリアライズ/デシリアライズエラー
    #[error("シリアライズエラー: {0}")]
    Serialization(#[source] serde_json::Error),

    /// 外部 HTTP API のエラー
    ///
    /// ジオコーディング API への接続失敗、不正なレスポンスなど。
    #[error("外部 API エラー: {0}")]
    Http(#[source] reqwest::Error),

    /// ファイル入出力エラー
    #[error("ファイル入出力エラー: {0}")]
    Io(#[source] std::io::Error),

    /// 予期しないエラー
    ///
    /// DB に格納された値がドメインの制約を満たさない場合など。
    #[error("予期しないエラー: {0}")]
    Unexpected(String),
}

// ===== InfraError のメソッド =====

impl InfraError {
    /// エラー種別を取得する
    pub fn kind(&self) -> &InfraErrorKind {
        &self.kind
    }

    /// SpanTrace を取得する
    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    /// 一意制約違反かどうか
    pub fn is_duplicate(&self) -> bool {
        matches!(self.kind, InfraErrorKind::Duplicate(_))
    }

    // ===== Convenience constructors =====

    /// 一意制約違反エラーを生成する
    pub fn duplicate(constraint: impl Into<String>) -> Self {
        Self::from_kind(InfraErrorKind::Duplicate(constraint.into()))
    }

    /// 予期しないエラーを生成する
    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::from_kind(InfraErrorKind::Unexpected(msg.into()))
    }

    fn from_kind(kind: InfraErrorKind) -> Self {
        Self {
            kind,
            span_trace: SpanTrace::capture(),
        }
    }
}

// ===== トレイト実装 =====

impl fmt::Debug for InfraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfraError")
            .field("kind", &self.kind)
            .field("span_trace", &self.span_trace)
            .finish()
    }
}

impl std::error::Error for InfraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.kind.source()
    }
}

// ===== From 実装（SpanTrace 自動キャプチャ） =====

impl From<sqlx::Error> for InfraError {
    fn from(source: sqlx::Error) -> Self {
        let duplicate = source
            .as_database_error()
            .filter(|e| e.is_unique_violation())
            .map(|e| e.constraint().unwrap_or_default().to_string());

        match duplicate {
            Some(constraint) => Self::from_kind(InfraErrorKind::Duplicate(constraint)),
            None => Self::from_kind(InfraErrorKind::Database(source)),
        }
    }
}

impl From<redis::RedisError> for InfraError {
    fn from(source: redis::RedisError) -> Self {
        Self::from_kind(InfraErrorKind::Redis(source))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(source: serde_json::Error) -> Self {
        Self::from_kind(InfraErrorKind::Serialization(source))
    }
}

impl From<reqwest::Error> for InfraError {
    fn from(source: reqwest::Error) -> Self {
        Self::from_kind(InfraErrorKind::Http(source))
    }
}

impl From<std::io::Error> for InfraError {
    fn from(source: std::io::Error) -> Self {
        Self::from_kind(InfraErrorKind::Io(source))
    }
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::layer::SubscriberExt as _;

    use super::*;

    /// テスト用に ErrorLayer 付き subscriber を設定する
    fn with_error_layer(f: impl FnOnce()) {
        let subscriber = tracing_subscriber::registry().with(tracing_error::ErrorLayer::default());
        let _guard = tracing::subscriber::set_default(subscriber);
        f();
    }

    #[test]
    fn test_from_sqlx_errorでspan_traceがキャプチャされる() {
        with_error_layer(|| {
            let span = tracing::info_span!("test_repo", bootcamp_id = "abc");
            let _enter = span.enter();

            let err: InfraError = sqlx::Error::RowNotFound.into();

            assert!(matches!(err.kind(), InfraErrorKind::Database(_)));
            assert!(!err.is_duplicate());
            let trace_str = format!("{}", err.span_trace());
            assert!(
                trace_str.contains("test_repo"),
                "SpanTrace がスパン名を含むこと: {trace_str}",
            );
        });
    }

    #[test]
    fn test_from_redis_errorはredis種別になる() {
        let redis_err: redis::RedisError = (redis::ErrorKind::Io, "接続失敗").into();
        let err: InfraError = redis_err.into();

        assert!(matches!(err.kind(), InfraErrorKind::Redis(_)));
    }

    #[test]
    fn test_from_io_errorはio種別になる() {
        let err: InfraError = std::io::Error::other("disk full").into();

        assert!(matches!(err.kind(), InfraErrorKind::Io(_)));
    }

    #[test]
    fn test_duplicateは一意制約違反として判定される() {
        with_error_layer(|| {
            let span = tracing::info_span!("test_insert");
            let _enter = span.enter();

            let err = InfraError::duplicate("users_email_key");

            assert!(err.is_duplicate());
            assert_eq!(format!("{err}"), "一意制約違反: users_email_key");
            assert!(format!("{}", err.span_trace()).contains("test_insert"));
        });
    }

    #[test]
    fn test_sourceがinfra_error_kindに委譲する() {
        use std::error::Error;

        let err: InfraError = sqlx::Error::RowNotFound.into();
        assert!(err.source().is_some());

        let err = InfraError::unexpected("test");
        assert!(err.source().is_none());
    }
}
