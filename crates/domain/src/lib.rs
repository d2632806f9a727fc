//! # DevCamper ドメイン層
//!
//! ブートキャンプディレクトリのドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **エンティティ**: 一意の識別子を持つオブジェクト（Bootcamp, Course, Review, User）
//! - **値オブジェクト**: 生成時に検証される不変オブジェクト（BootcampName, Rating など）
//! - **ドメインサービス**: 所有者チェック、集計値の算出、地理計算
//! - **ドメインエラー**: ビジネスルール違反を表現するエラー型
//!
//! ## 依存関係の方向
//!
//! ```text
//! api → infra → domain
//! ```
//!
//! ドメイン層はインフラ層（DB、外部サービス）には一切依存しない。
//!
//! ## 使用例
//!
//! ```rust
//! use devcamper_domain::{
//!     ownership::{Requester, ensure_owner_or_admin},
//!     user::{UserId, UserRole},
//! };
//!
//! let owner = UserId::new();
//! let requester = Requester::new(owner.clone(), UserRole::Publisher);
//!
//! assert!(ensure_owner_or_admin(&requester, &owner, "update this bootcamp").is_ok());
//! ```

#[macro_use]
mod macros;

pub mod bootcamp;
pub mod clock;
pub mod course;
pub mod error;
pub mod geo;
pub mod list_query;
pub mod notification;
pub mod ownership;
pub mod password;
pub mod review;
pub mod user;

pub use error::DomainError;
