//! # DevCamper インフラ層
//!
//! 外部システムとの接続・通信を担当するインフラストラクチャ層。
//!
//! ## 責務
//!
//! - **データベース接続**: PostgreSQL への接続プール管理とマイグレーション
//! - **リポジトリ実装**: ユーザー・ブートキャンプ・コース・レビューの永続化
//! - **セッション**: Redis によるセッショントークン管理
//! - **外部サービス**: MapQuest ジオコーディング、SMTP メール送信
//! - **ファイル保存**: ブートキャンプ写真のローカル保存
//!
//! ## 依存関係
//!
//! ```text
//! api → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`db`] - PostgreSQL データベース接続管理
//! - [`error`] - インフラ層エラー定義
//! - [`repository`] - リポジトリ実装
//! - [`session`] - Redis セッション管理
//! - [`password`] - Argon2id パスワードハッシュ
//! - [`reset_token`] - パスワードリセットトークンの生成とハッシュ
//! - [`geocoder`] - 住所・郵便番号のジオコーディング
//! - [`storage`] - 写真ファイルの保存
//! - [`notification`] - メール送信
//! - `mock` - テスト用インメモリ実装（`test-utils` feature）

pub mod db;
pub mod error;
pub mod geocoder;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod notification;
pub mod password;
pub mod repository;
pub mod reset_token;
pub mod session;
pub mod storage;

pub use error::{InfraError, InfraErrorKind};
pub use geocoder::{Geocoder, MapQuestGeocoder};
pub use notification::{NoopNotificationSender, NotificationSender, SmtpNotificationSender};
pub use password::{Argon2PasswordHasher, PasswordHasher};
pub use session::{RedisSessionManager, SessionData, SessionManager};
pub use storage::{LocalPhotoStorage, PhotoStorage};
