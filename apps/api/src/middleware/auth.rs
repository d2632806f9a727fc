//! # 認証ミドルウェア
//!
//! リクエストのトークンからセッションを引き、ユーザーを読み込んで
//! リクエストの extensions に [`CurrentUser`] として格納する。
//!
//! トークンは `Authorization: Bearer <token>` を優先し、なければ
//! `token` Cookie を使う。
//!
//! ## 使い方
//!
//! ```rust,ignore
//! use axum::middleware::from_fn_with_state;
//!
//! Router::new()
//!     .route("/api/v1/auth/me", get(me))
//!     .layer(from_fn_with_state(authn_state, require_auth))
//! ```

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use devcamper_domain::{ownership::Requester, user::User};
use devcamper_infra::{SessionManager, repository::UserRepository};

use crate::error::ApiError;

/// 認証トークンを格納する Cookie 名
pub const TOKEN_COOKIE_NAME: &str = "token";

/// 認証ミドルウェアの状態
#[derive(Clone)]
pub struct AuthnState {
    pub session_manager: Arc<dyn SessionManager>,
    pub user_repository: Arc<dyn UserRepository>,
}

/// 認証済みのユーザーと、そのリクエストで使われたトークン
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user:  User,
    pub token: String,
}

impl CurrentUser {
    pub fn requester(&self) -> Requester {
        self.user.requester()
    }
}

/// リクエストからトークンを取り出す
fn extract_token(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    match bearer {
        Some(token) => Some(token.to_string()),
        None => jar
            .get(TOKEN_COOKIE_NAME)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty()),
    }
}

async fn authenticate(state: &AuthnState, token: String) -> Result<CurrentUser, ApiError> {
    let session = state
        .session_manager
        .get(&token)
        .await?
        .ok_or_else(ApiError::unauthorized)?;

    // セッションが残っていてもユーザーが削除済みなら未認証
    let user = state
        .user_repository
        .find_by_id(session.user_id())
        .await?
        .ok_or_else(ApiError::unauthorized)?;

    Ok(CurrentUser { user, token })
}

/// 認証ミドルウェア
///
/// トークンがない、セッションが存在しない、ユーザーが存在しない場合は 401 を返す。
pub async fn require_auth(
    State(state): State<AuthnState>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_token(request.headers(), &jar) else {
        return ApiError::unauthorized().into_response();
    };

    match authenticate(&state, token).await {
        Ok(current) => {
            tracing::debug!(user_id = %current.user.id(), "認証しました");
            request.extensions_mut().insert(current);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        Extension,
        Router,
        http::{Method, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
    };
    use devcamper_domain::user::UserRole;
    use devcamper_infra::{
        SessionData,
        mock::{MockSessionManager, MockUserRepository},
    };
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    use super::*;
    use crate::test_utils::{create_user, fixed_now};

    async fn whoami(Extension(current): Extension<CurrentUser>) -> String {
        current.user.email().as_str().to_string()
    }

    fn create_test_app(sessions: MockSessionManager, users: MockUserRepository) -> Router {
        let state = AuthnState {
            session_manager: Arc::new(sessions),
            user_repository: Arc::new(users),
        };

        Router::new()
            .route("/test", get(whoami))
            .layer(from_fn_with_state(state, require_auth))
    }

    fn signed_in(token: &str) -> (MockSessionManager, MockUserRepository) {
        let users = MockUserRepository::new();
        let user = create_user(UserRole::User, "john@gmail.com");
        let sessions = MockSessionManager::new();
        sessions.add_session(token, SessionData::new(user.id().clone(), fixed_now()));
        users.add_user(user);
        (sessions, users)
    }

    async fn send(app: Router, header: Option<(&str, &str)>) -> (StatusCode, String) {
        let mut builder = Request::builder().method(Method::GET).uri("/test");
        if let Some((name, value)) = header {
            builder = builder.header(name, value);
        }
        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_bearerトークンで認証できる() {
        let (sessions, users) = signed_in("abc");

        let (status, body) = send(
            create_test_app(sessions, users),
            Some(("Authorization", "Bearer abc")),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "john@gmail.com");
    }

    #[tokio::test]
    async fn test_cookieのトークンで認証できる() {
        let (sessions, users) = signed_in("abc");

        let (status, _) =
            send(create_test_app(sessions, users), Some(("Cookie", "token=abc"))).await;

        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_トークンがなければ401() {
        let (sessions, users) = signed_in("abc");

        let (status, body) = send(create_test_app(sessions, users), None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("Not authorized to access this route"));
    }

    #[tokio::test]
    async fn test_未知のトークンは401() {
        let (sessions, users) = signed_in("abc");

        let (status, _) = send(
            create_test_app(sessions, users),
            Some(("Authorization", "Bearer unknown")),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_ユーザーが削除済みなら401() {
        let (sessions, _) = signed_in("abc");

        let (status, _) = send(
            create_test_app(sessions, MockUserRepository::new()),
            Some(("Authorization", "Bearer abc")),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_bearerヘッダーがcookieより優先される() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer from-header".parse().unwrap());
        let jar = CookieJar::new().add(axum_extra::extract::cookie::Cookie::new(
            TOKEN_COOKIE_NAME,
            "from-cookie",
        ));

        assert_eq!(extract_token(&headers, &jar), Some("from-header".to_string()));
    }
}
