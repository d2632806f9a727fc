//! # 認証ユースケース
//!
//! 登録・ログイン・ログアウト・本人情報の更新・パスワードリセットを扱う。
//! 認証に成功するとセッションを発行し、そのトークンを返す。
//!
//! ## タイミング攻撃対策
//!
//! ログイン時にユーザーが存在しない場合もダミーハッシュで検証を実行し、
//! 処理時間を均一化する。

use std::sync::Arc;

use devcamper_domain::{
    clock::Clock,
    password::{PasswordHash, PlainPassword},
    user::{Email, NewUser, PasswordReset, User, UserName, UserRole},
};
use devcamper_infra::{
    NotificationSender,
    PasswordHasher,
    SessionData,
    SessionManager,
    repository::UserRepository,
    reset_token,
};

use super::{helpers::parse_optional, notification::TemplateRenderer};
use crate::error::ApiError;

/// ダミーハッシュ（有効な Argon2id 形式）
const DUMMY_HASH: &str = "$argon2id$v=19$m=65536,t=1,p=1$AAAAAAAAAAAAAAAAAAAAAA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// 自己登録の入力
#[derive(Debug, Default)]
pub struct RegisterInput {
    pub name:     String,
    pub email:    String,
    pub password: String,
    /// `user` または `publisher`（未指定は `user`）
    pub role:     Option<String>,
}

/// 発行したセッション
#[derive(Debug)]
pub struct IssuedSession {
    pub user:  User,
    pub token: String,
}

/// 認証ユースケース
pub struct AuthUseCaseImpl {
    user_repository:     Arc<dyn UserRepository>,
    session_manager:     Arc<dyn SessionManager>,
    password_hasher:     Arc<dyn PasswordHasher>,
    notification_sender: Arc<dyn NotificationSender>,
    template_renderer:   Arc<TemplateRenderer>,
    clock:               Arc<dyn Clock>,
    /// リセット URL の組み立てに使うサーバーの公開 URL
    public_url:          String,
}

impl AuthUseCaseImpl {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        session_manager: Arc<dyn SessionManager>,
        password_hasher: Arc<dyn PasswordHasher>,
        notification_sender: Arc<dyn NotificationSender>,
        template_renderer: Arc<TemplateRenderer>,
        clock: Arc<dyn Clock>,
        public_url: String,
    ) -> Self {
        Self {
            user_repository,
            session_manager,
            password_hasher,
            notification_sender,
            template_renderer,
            clock,
            public_url,
        }
    }

    /// ユーザーを登録してセッションを発行する
    pub async fn register(&self, input: RegisterInput) -> Result<IssuedSession, ApiError> {
        let role = UserRole::for_registration(input.role.as_deref())?;
        let password = PlainPassword::new_validated(input.password)?;

        let user = User::new(NewUser {
            name: UserName::new(input.name)?,
            email: Email::new(input.email)?,
            role,
            password_hash: self.password_hasher.hash(&password)?,
            now: self.clock.now(),
        });

        self.user_repository.insert(&user).await?;
        tracing::info!(user_id = %user.id(), role = %user.role(), "ユーザーを登録しました");

        self.issue_session(user).await
    }

    /// メールアドレスとパスワードでログインする
    ///
    /// どちらかが未入力なら 400、ユーザー不在・パスワード不一致はいずれも 401。
    pub async fn login(
        &self,
        email: Option<String>,
        password: Option<String>,
    ) -> Result<IssuedSession, ApiError> {
        let (Some(email), Some(password)) = (
            email.filter(|e| !e.trim().is_empty()),
            password.filter(|p| !p.is_empty()),
        ) else {
            return Err(ApiError::BadRequest(
                "Please provide an email and password".to_string(),
            ));
        };
        let password = PlainPassword::new(password);

        let user = match Email::new(email) {
            Ok(email) => self.user_repository.find_by_email(&email).await?,
            Err(_) => None,
        };

        let Some(user) = user else {
            self.dummy_verification(&password);
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        if self
            .password_hasher
            .verify(&password, user.password_hash())?
            .is_mismatch()
        {
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        self.issue_session(user).await
    }

    /// セッションを削除する
    pub async fn logout(&self, token: &str) -> Result<(), ApiError> {
        self.session_manager.delete(token).await?;
        Ok(())
    }

    /// 名前とメールアドレスを更新する
    pub async fn update_details(
        &self,
        user: User,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<User, ApiError> {
        let name = parse_optional(name, UserName::new)?;
        let email = parse_optional(email, Email::new)?;

        let updated = user.with_details(name, email);
        self.user_repository.update(&updated).await?;

        Ok(updated)
    }

    /// 現在のパスワードを確認してから変更し、新しいセッションを発行する
    pub async fn update_password(
        &self,
        user: User,
        current_password: String,
        new_password: String,
    ) -> Result<IssuedSession, ApiError> {
        let current = PlainPassword::new(current_password);
        if self
            .password_hasher
            .verify(&current, user.password_hash())?
            .is_mismatch()
        {
            return Err(ApiError::Unauthorized("Password is incorrect".to_string()));
        }

        let new_password = PlainPassword::new_validated(new_password)?;
        let updated = user.with_password(self.password_hasher.hash(&new_password)?);
        self.user_repository.update(&updated).await?;

        self.issue_session(updated).await
    }

    /// リセットトークンを発行してメールで送る
    ///
    /// 送信に失敗した場合はリセット情報を破棄して 500 を返す。
    #[tracing::instrument(skip_all)]
    pub async fn forgot_password(&self, email: String) -> Result<(), ApiError> {
        let no_user = || ApiError::NotFound("There is no user with that email".to_string());

        let email = Email::new(email).map_err(|_| no_user())?;
        let user = self
            .user_repository
            .find_by_email(&email)
            .await?
            .ok_or_else(no_user)?;

        let issued = reset_token::issue();
        let user = user.with_password_reset(PasswordReset::issue(issued.hash, self.clock.now()));
        self.user_repository.update(&user).await?;

        let reset_url = format!(
            "{}/api/v1/auth/resetpassword/{}",
            self.public_url, issued.token
        );

        let sent = match self.template_renderer.render_password_reset(&user, &reset_url) {
            Ok(message) => self.notification_sender.send_email(&message).await,
            Err(e) => Err(e),
        };

        if let Err(e) = sent {
            tracing::error!(user_id = %user.id(), error = %e, "リセットメールの送信に失敗しました");
            self.user_repository
                .update(&user.without_password_reset())
                .await?;
            return Err(ApiError::Internal("Email could not be sent".to_string()));
        }

        tracing::info!(user_id = %user.id(), "リセットメールを送信しました");
        Ok(())
    }

    /// リセットトークンを検証して新しいパスワードを設定する
    pub async fn reset_password(
        &self,
        token: &str,
        password: String,
    ) -> Result<IssuedSession, ApiError> {
        let invalid = || ApiError::BadRequest("Invalid token".to_string());

        let token_hash = reset_token::hash(token);
        let user = self
            .user_repository
            .find_by_reset_token_hash(&token_hash)
            .await?
            .ok_or_else(invalid)?;

        let now = self.clock.now();
        let valid = user
            .password_reset()
            .is_some_and(|reset| reset.is_valid_for(&token_hash, now));
        if !valid {
            return Err(invalid());
        }

        let password = PlainPassword::new_validated(password)?;
        let updated = user.with_password(self.password_hasher.hash(&password)?);
        self.user_repository.update(&updated).await?;

        self.issue_session(updated).await
    }

    async fn issue_session(&self, user: User) -> Result<IssuedSession, ApiError> {
        let token = self
            .session_manager
            .create(&SessionData::new(user.id().clone(), self.clock.now()))
            .await?;

        Ok(IssuedSession { user, token })
    }

    /// ダミーハッシュで検証を実行する（結果は使わない）
    fn dummy_verification(&self, password: &PlainPassword) {
        let _ = self
            .password_hasher
            .verify(password, &PasswordHash::new(DUMMY_HASH));
    }
}
