//! # 通知
//!
//! メール通知のメッセージ型とエラー型。送信手段はインフラ層が実装する。

use thiserror::Error;

/// 送信するメール
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to:        String,
    pub subject:   String,
    pub html_body: String,
    pub text_body: String,
}

/// 通知処理のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    /// テンプレートの描画に失敗
    #[error("テンプレート描画失敗: {0}")]
    TemplateFailed(String),

    /// メール送信に失敗
    #[error("メール送信失敗: {0}")]
    SendFailed(String),
}
