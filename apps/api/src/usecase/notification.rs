//! # テンプレートレンダラー
//!
//! tera テンプレートエンジンでパスワードリセットメールを HTML/plaintext 両形式で生成する。
//! テンプレートは `include_str!` でバイナリに埋め込む。

use devcamper_domain::{
    notification::{EmailMessage, NotificationError},
    user::{RESET_TOKEN_TTL_MINUTES, User},
};
use tera::{Context, Tera};

const PASSWORD_RESET_SUBJECT: &str = "Password reset token";

/// テンプレートレンダラー
pub struct TemplateRenderer {
    engine: Tera,
}

impl TemplateRenderer {
    pub fn new() -> Result<Self, NotificationError> {
        let mut engine = Tera::default();

        engine
            .add_raw_templates(vec![
                (
                    "password_reset.html",
                    include_str!("../../templates/password_reset.html"),
                ),
                (
                    "password_reset.txt",
                    include_str!("../../templates/password_reset.txt"),
                ),
            ])
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        Ok(Self { engine })
    }

    /// パスワードリセットメールを生成する
    ///
    /// `reset_url` は平文トークンを含む `PUT /api/v1/auth/resetpassword/{token}` の URL。
    pub fn render_password_reset(
        &self,
        user: &User,
        reset_url: &str,
    ) -> Result<EmailMessage, NotificationError> {
        let mut context = Context::new();
        context.insert("user_name", user.name().as_str());
        context.insert("reset_url", reset_url);
        context.insert("expires_in_minutes", &RESET_TOKEN_TTL_MINUTES);

        let html_body = self
            .engine
            .render("password_reset.html", &context)
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        let text_body = self
            .engine
            .render("password_reset.txt", &context)
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        Ok(EmailMessage {
            to: user.email().as_str().to_string(),
            subject: PASSWORD_RESET_SUBJECT.to_string(),
            html_body,
            text_body,
        })
    }
}
