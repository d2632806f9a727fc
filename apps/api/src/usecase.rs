//! # ユースケース層
//!
//! DevCamper API のビジネスロジックを実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: リポジトリ・外部サービスを `Arc<dyn Trait>` で外部から注入
//! - **薄いハンドラ**: ハンドラは入出力の変換のみ、認可と検証はユースケースに集約
//! - **集計の再計算**: コース・レビューの書き込み後に所属ブートキャンプの平均値を更新

pub(crate) mod helpers;

pub mod auth;
pub mod bootcamp;
pub mod course;
pub mod notification;
pub mod review;
pub mod user;

pub use auth::{AuthUseCaseImpl, IssuedSession, RegisterInput};
pub use bootcamp::{BootcampUseCaseImpl, CreateBootcampInput, PhotoUpload, UpdateBootcampInput};
pub use course::{CourseUseCaseImpl, CreateCourseInput, UpdateCourseInput};
pub use notification::TemplateRenderer;
pub use review::{CreateReviewInput, ReviewUseCaseImpl, UpdateReviewInput};
pub use user::{CreateUserInput, UpdateUserInput, UserUseCaseImpl};
