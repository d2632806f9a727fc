//! # DevCamper API サーバー
//!
//! ブートキャンプ・コース・レビュー・ユーザーを扱う REST API。
//!
//! ## レイヤー構成
//!
//! ```text
//! handler → usecase → (domain, infra)
//!    ↑
//! middleware（認証・レート制限）
//! ```
//!
//! - [`config`] - 環境変数からの設定読み込み
//! - [`error`] - API エラー定義と HTTP レスポンスへの変換
//! - [`handler`] - HTTP リクエストハンドラと DTO
//! - [`middleware`] - 認証・レート制限
//! - [`usecase`] - 認可・検証・集計を含むアプリケーションロジック
//! - [`app_builder`] - State の組み立てとルーター定義
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use devcamper_api::{app_builder::build_app, config::ApiConfig};
//!
//! let config = ApiConfig::from_env()?;
//! let app = build_app(&config, deps);
//! ```

pub mod app_builder;
pub mod config;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod usecase;

#[cfg(test)]
mod test_utils;
