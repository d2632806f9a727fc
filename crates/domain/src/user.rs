//! # ユーザー
//!
//! ユーザーエンティティとそれに関連する値オブジェクトを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 用途 |
//! |---|------------|------|
//! | [`User`] | ユーザー | ブートキャンプ・コース・レビューの所有者 |
//! | [`UserRole`] | ロール | user / publisher / admin |
//! | [`PasswordReset`] | パスワードリセット | リセットトークンのハッシュと有効期限 |
//!
//! ## 設計方針
//!
//! - パスワードハッシュとリセット情報はエンティティに保持するが、
//!   シリアライズ可能な型には含めない（API 層の DTO で除外する）
//! - 変更はすべて `with_*` メソッドで新しいインスタンスを返す
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use devcamper_domain::{
//!     password::PasswordHash,
//!     user::{Email, NewUser, User, UserName, UserRole},
//! };
//!
//! let user = User::new(NewUser {
//!     name:          UserName::new("John Doe")?,
//!     email:         Email::new("john@gmail.com")?,
//!     role:          UserRole::Publisher,
//!     password_hash: PasswordHash::new("$argon2id$..."),
//!     now:           chrono::Utc::now(),
//! });
//!
//! assert!(!user.is_admin());
//! # Ok(())
//! # }
//! ```

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};

use crate::{DomainError, ownership::Requester, password::PasswordHash};

/// パスワードリセットトークンの有効期間（分）
pub const RESET_TOKEN_TTL_MINUTES: i64 = 10;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"));

define_uuid_id! {
    /// ユーザー ID
    pub struct UserId => "User";
}

define_validated_string! {
    /// ユーザー名
    pub struct UserName {
        label: "name",
        max_length: 100,
    }
}

/// メールアドレス（値オブジェクト）
///
/// `local@domain.tld` 形式を要求し、前後の空白を除去して小文字で保持する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    /// メールアドレスを作成する
    ///
    /// # エラー
    ///
    /// 空、形式不正、255 文字超過の場合は `DomainError::Validation`
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_lowercase();

        if value.is_empty() {
            return Err(DomainError::Validation("Please add an email".to_string()));
        }

        if value.len() > 255 || !EMAIL_PATTERN.is_match(&value) {
            return Err(DomainError::Validation(
                "Please add a valid email".to_string(),
            ));
        }

        Ok(Self(value))
    }

    /// 文字列参照を取得する
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 所有権を持つ文字列に変換する
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ユーザーロール
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    IntoStaticStr,
    EnumString,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserRole {
    /// 一般ユーザー（レビューを書ける）
    User,
    /// 公開者（ブートキャンプとコースを公開できる）
    Publisher,
    /// 管理者（すべてのリソースを操作できる）
    Admin,
}

impl UserRole {
    /// 文字列からロールを解釈する
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        value
            .parse()
            .map_err(|_| DomainError::Validation(format!("Invalid role: {value}")))
    }

    /// 自己登録で選択可能なロールを解釈する
    ///
    /// 未指定は `User`。`admin` は自己登録では選べない。
    pub fn for_registration(value: Option<&str>) -> Result<Self, DomainError> {
        match value {
            None => Ok(Self::User),
            Some(value) => match Self::parse(value)? {
                Self::Admin => Err(DomainError::Validation(
                    "Role must be user or publisher".to_string(),
                )),
                role => Ok(role),
            },
        }
    }

    /// 文字列表現を返す
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// パスワードリセット情報
///
/// 平文のトークンは保持せず、SHA-256 ハッシュのみを保持する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordReset {
    token_hash: String,
    expires_at: DateTime<Utc>,
}

impl PasswordReset {
    /// 現在時刻から有効期間を設定してリセット情報を作成する
    pub fn issue(token_hash: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            token_hash: token_hash.into(),
            expires_at: now + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
        }
    }

    /// データベースから復元する
    pub fn from_db(token_hash: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            token_hash,
            expires_at,
        }
    }

    pub fn token_hash(&self) -> &str {
        &self.token_hash
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// 指定したハッシュに一致し、かつ期限内かどうか
    pub fn is_valid_for(&self, token_hash: &str, now: DateTime<Utc>) -> bool {
        self.token_hash == token_hash && now < self.expires_at
    }
}

/// 新規ユーザーの作成パラメータ
pub struct NewUser {
    pub name:          UserName,
    pub email:         Email,
    pub role:          UserRole,
    pub password_hash: PasswordHash,
    pub now:           DateTime<Utc>,
}

/// ユーザーエンティティ
///
/// # 不変条件
///
/// - `email` は全ユーザーで一意（DB の一意制約で担保）
/// - パスワード変更時にリセット情報は破棄される
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id:             UserId,
    name:           UserName,
    email:          Email,
    role:           UserRole,
    password_hash:  PasswordHash,
    password_reset: Option<PasswordReset>,
    created_at:     DateTime<Utc>,
}

impl User {
    /// 新しいユーザーを作成する
    pub fn new(params: NewUser) -> Self {
        Self {
            id:             UserId::new(),
            name:           params.name,
            email:          params.email,
            role:           params.role,
            password_hash:  params.password_hash,
            password_reset: None,
            created_at:     params.now,
        }
    }

    /// データベースから復元する
    pub fn from_db(
        id: UserId,
        name: UserName,
        email: Email,
        role: UserRole,
        password_hash: PasswordHash,
        password_reset: Option<PasswordReset>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            email,
            role,
            password_hash,
            password_reset,
            created_at,
        }
    }

    // Getter メソッド

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn name(&self) -> &UserName {
        &self.name
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn role(&self) -> UserRole {
        self.role
    }

    pub fn password_hash(&self) -> &PasswordHash {
        &self.password_hash
    }

    pub fn password_reset(&self) -> Option<&PasswordReset> {
        self.password_reset.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// 認可判定に使う要求者情報を返す
    pub fn requester(&self) -> Requester {
        Requester::new(self.id.clone(), self.role)
    }

    // ビジネスロジックメソッド

    /// 名前とメールアドレスを更新した新しいインスタンスを返す
    pub fn with_details(self, name: Option<UserName>, email: Option<Email>) -> Self {
        Self {
            name: name.unwrap_or(self.name),
            email: email.unwrap_or(self.email),
            ..self
        }
    }

    /// ロールを変更した新しいインスタンスを返す
    pub fn with_role(self, role: UserRole) -> Self {
        Self { role, ..self }
    }

    /// パスワードを変更した新しいインスタンスを返す
    ///
    /// 発行済みのリセット情報は破棄される。
    pub fn with_password(self, password_hash: PasswordHash) -> Self {
        Self {
            password_hash,
            password_reset: None,
            ..self
        }
    }

    /// リセット情報を設定した新しいインスタンスを返す
    pub fn with_password_reset(self, reset: PasswordReset) -> Self {
        Self {
            password_reset: Some(reset),
            ..self
        }
    }

    /// リセット情報を破棄した新しいインスタンスを返す
    pub fn without_password_reset(self) -> Self {
        Self {
            password_reset: None,
            ..self
        }
    }
}
