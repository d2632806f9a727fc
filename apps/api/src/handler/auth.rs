//! # 認証ハンドラ
//!
//! セッショントークンを発行するエンドポイントは `{ "success": true, "token": "..." }`
//! を返し、同じトークンを HttpOnly の `token` Cookie にも設定する。
//!
//! ## エンドポイント
//!
//! - `POST /api/v1/auth/register` - 登録
//! - `POST /api/v1/auth/login` - ログイン
//! - `GET /api/v1/auth/logout` - ログアウト（要認証）
//! - `GET /api/v1/auth/me` - 現在のユーザー（要認証）
//! - `PUT /api/v1/auth/updatedetails` - 名前・メールアドレスの変更（要認証）
//! - `PUT /api/v1/auth/updatepassword` - パスワード変更（要認証）
//! - `POST /api/v1/auth/forgotpassword` - リセットメールの送信
//! - `PUT /api/v1/auth/resetpassword/{resettoken}` - パスワードの再設定

use std::sync::Arc;

use axum::{
    Extension,
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::{
    CookieJar,
    WithRejection,
    cookie::{Cookie, SameSite},
};
use devcamper_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::user::UserDto;
use crate::{
    error::ApiError,
    middleware::{CurrentUser, TOKEN_COOKIE_NAME},
    usecase::{AuthUseCaseImpl, IssuedSession, RegisterInput},
};

/// 認証 API の共有状態
pub struct AuthState {
    pub usecase:             AuthUseCaseImpl,
    /// Cookie の有効期限（秒）
    pub session_ttl_seconds: u64,
    /// Cookie に `Secure` を付けるか
    pub secure_cookie:       bool,
}

// --- リクエスト/レスポンス型 ---

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub name:     String,
    pub email:    String,
    pub password: String,
    pub role:     Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email:    Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateDetailsRequest {
    pub name:  Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub new_password:     String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResetPasswordRequest {
    pub password: String,
}

/// トークン発行レスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub success: bool,
    pub token:   String,
}

// --- ハンドラ ---

/// POST /api/v1/auth/register
#[tracing::instrument(skip_all)]
pub async fn register(
    State(state): State<Arc<AuthState>>,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let issued = state
        .usecase
        .register(RegisterInput {
            name:     req.name,
            email:    req.email,
            password: req.password,
            role:     req.role,
        })
        .await?;

    Ok(token_response(&state, jar, issued))
}

/// POST /api/v1/auth/login
///
/// ## レスポンス
///
/// - `200 OK`: トークン（Cookie にも設定）
/// - `400 Bad Request`: メールアドレスまたはパスワードが未入力
/// - `401 Unauthorized`: 資格情報が誤っている
#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<Arc<AuthState>>,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let issued = state.usecase.login(req.email, req.password).await?;

    Ok(token_response(&state, jar, issued))
}

/// GET /api/v1/auth/logout
///
/// セッションを削除し、Cookie をクリアする。
#[tracing::instrument(skip_all)]
pub async fn logout(
    State(state): State<Arc<AuthState>>,
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    state.usecase.logout(&current.token).await?;

    let jar = jar.add(build_clear_cookie());
    Ok((jar, Json(ApiResponse::new(json!({})))))
}

/// GET /api/v1/auth/me
pub async fn get_me(Extension(current): Extension<CurrentUser>) -> impl IntoResponse {
    Json(ApiResponse::new(UserDto::from(&current.user)))
}

/// PUT /api/v1/auth/updatedetails
#[tracing::instrument(skip_all)]
pub async fn update_details(
    State(state): State<Arc<AuthState>>,
    Extension(current): Extension<CurrentUser>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateDetailsRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .usecase
        .update_details(current.user, req.name, req.email)
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(UserDto::from(&user)))))
}

/// PUT /api/v1/auth/updatepassword
///
/// 現在のパスワードが誤っていれば 401。成功すると新しいトークンを発行する。
#[tracing::instrument(skip_all)]
pub async fn update_password(
    State(state): State<Arc<AuthState>>,
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<UpdatePasswordRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let issued = state
        .usecase
        .update_password(current.user, req.current_password, req.new_password)
        .await?;

    Ok(token_response(&state, jar, issued))
}

/// POST /api/v1/auth/forgotpassword
#[tracing::instrument(skip_all)]
pub async fn forgot_password(
    State(state): State<Arc<AuthState>>,
    WithRejection(Json(req), _): WithRejection<Json<ForgotPasswordRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    state.usecase.forgot_password(req.email).await?;

    Ok((StatusCode::OK, Json(ApiResponse::new("Email sent"))))
}

/// PUT /api/v1/auth/resetpassword/{resettoken}
#[tracing::instrument(skip_all)]
pub async fn reset_password(
    State(state): State<Arc<AuthState>>,
    Path(reset_token): Path<String>,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<ResetPasswordRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let issued = state
        .usecase
        .reset_password(&reset_token, req.password)
        .await?;

    Ok(token_response(&state, jar, issued))
}

// --- ヘルパー関数 ---

fn token_response(
    state: &AuthState,
    jar: CookieJar,
    issued: IssuedSession,
) -> (CookieJar, Json<TokenResponse>) {
    let jar = jar.add(build_token_cookie(
        &issued.token,
        state.session_ttl_seconds,
        state.secure_cookie,
    ));

    (
        jar,
        Json(TokenResponse {
            success: true,
            token:   issued.token,
        }),
    )
}

/// トークン Cookie を構築する
fn build_token_cookie(token: &str, ttl_seconds: u64, secure: bool) -> Cookie<'static> {
    let max_age = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);

    Cookie::build((TOKEN_COOKIE_NAME, token.to_string()))
        .path("/")
        .max_age(time::Duration::seconds(max_age))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// トークン Cookie をクリアするための Cookie を構築する
fn build_clear_cookie() -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE_NAME, ""))
        .path("/")
        .max_age(time::Duration::seconds(0))
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}
