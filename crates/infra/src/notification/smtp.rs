//! SMTP 通知送信実装
//!
//! lettre の `AsyncSmtpTransport` を使用してメールを送信する。

use async_trait::async_trait;
use devcamper_domain::notification::{EmailMessage, NotificationError};
use lettre::{
    AsyncSmtpTransport,
    AsyncTransport,
    Tokio1Executor,
    message::{Message, MultiPart, SinglePart, header::ContentType},
};

use super::NotificationSender;

/// SMTP 通知送信
pub struct SmtpNotificationSender {
    transport:    AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpNotificationSender {
    /// - `host`: SMTP サーバーのホスト名（例: "localhost"）
    /// - `port`: SMTP サーバーのポート番号（例: 1025）
    /// - `from_address`: 送信元メールアドレス
    pub fn new(host: &str, port: u16, from_address: String) -> Self {
        // TLS なしで接続（ローカル SMTP 向け）
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(port)
            .build();

        Self {
            transport,
            from_address,
        }
    }

    fn build_message(&self, email: &EmailMessage) -> Result<Message, NotificationError> {
        Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|e| NotificationError::SendFailed(format!("送信元アドレス不正: {e}")))?,
            )
            .to(email
                .to
                .parse()
                .map_err(|e| NotificationError::SendFailed(format!("宛先アドレス不正: {e}")))?)
            .subject(&email.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text_body.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html_body.clone()),
                    ),
            )
            .map_err(|e| NotificationError::SendFailed(format!("メッセージ構築失敗: {e}")))
    }
}

#[async_trait]
impl NotificationSender for SmtpNotificationSender {
    #[tracing::instrument(skip_all, fields(to = %email.to))]
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        let message = self.build_message(email)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotificationError::SendFailed(format!("SMTP 送信失敗: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(to: &str) -> EmailMessage {
        EmailMessage {
            to:        to.to_string(),
            subject:   "Password reset token".to_string(),
            html_body: "<p>reset</p>".to_string(),
            text_body: "reset".to_string(),
        }
    }

    #[test]
    fn test_トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SmtpNotificationSender>();
    }

    #[tokio::test]
    async fn test_不正な宛先はメッセージ構築で失敗する() {
        let sender = SmtpNotificationSender::new("localhost", 1025, "noreply@devcamper.io".to_string());

        let result = sender.build_message(&email("not an address"));

        assert!(matches!(result, Err(NotificationError::SendFailed(_))));
    }

    #[tokio::test]
    async fn test_正しい宛先ならメッセージを構築できる() {
        let sender = SmtpNotificationSender::new("localhost", 1025, "noreply@devcamper.io".to_string());

        assert!(sender.build_message(&email("john@gmail.com")).is_ok());
    }
}
