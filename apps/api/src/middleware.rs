//! # ミドルウェア
//!
//! 認証とレート制限のミドルウェアを提供する。

mod auth;
mod rate_limit;

pub use auth::{AuthnState, CurrentUser, TOKEN_COOKIE_NAME, require_auth};
pub use rate_limit::{FixedWindowLimiter, rate_limit};
