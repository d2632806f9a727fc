//! # メール送信
//!
//! パスワードリセットメールなどの送信を担当する。
//!
//! - **SMTP**: lettre の `AsyncSmtpTransport`（開発環境では Mailpit などに接続）
//! - **Noop**: 送信せずログ出力のみ（既定）
//!
//! `MAIL_BACKEND` 環境変数で実装を切り替える。

mod noop;
mod smtp;

use async_trait::async_trait;
use devcamper_domain::notification::{EmailMessage, NotificationError};
pub use noop::NoopNotificationSender;
pub use smtp::SmtpNotificationSender;

/// メール送信トレイト
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// メールを送信する
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError>;
}
