//! # アプリケーション構築
//!
//! インフラ初期化済みの依存を受け取り、ユースケース → State → Router の順に組み立てる。
//! `main.rs` はインフラ初期化とサーバー起動に集中する。
//!
//! ## ルートグループ
//!
//! - 公開 API: 一覧・詳細・半径検索・登録・ログイン・パスワードリセット
//! - 認証必須 API: 作成・更新・削除・写真・`/auth/me` など（[`require_auth`] を適用）
//!
//! 同じパスでも GET は公開、PUT / DELETE は認証必須というように、
//! メソッドごとに別の Router へ登録して `merge` する。

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, header},
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use devcamper_domain::clock::Clock;
use devcamper_infra::{
    Geocoder,
    NotificationSender,
    PasswordHasher,
    PhotoStorage,
    SessionManager,
    repository::{BootcampRepository, CourseRepository, ReviewRepository, UserRepository},
};
use devcamper_shared::{
    canonical_log::CanonicalLogLineLayer,
    observability::{MakeRequestUuidV7, make_request_span},
};
use sqlx::PgPool;
use tower_http::{
    cors::CorsLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::{
    config::ApiConfig,
    handler::{
        AuthState,
        BootcampState,
        CourseState,
        ReadinessState,
        ReviewState,
        UserState,
        create_bootcamp,
        create_course,
        create_review,
        create_user,
        delete_bootcamp,
        delete_course,
        delete_review,
        delete_user,
        forgot_password,
        get_bootcamp,
        get_bootcamps_in_radius,
        get_course,
        get_me,
        get_review,
        get_user,
        health_check,
        list_bootcamp_courses,
        list_bootcamp_reviews,
        list_bootcamps,
        list_courses,
        list_reviews,
        list_users,
        login,
        logout,
        readiness_check,
        register,
        reset_password,
        update_bootcamp,
        update_course,
        update_details,
        update_password,
        update_review,
        update_user,
        upload_bootcamp_photo,
    },
    middleware::{AuthnState, FixedWindowLimiter, rate_limit, require_auth},
    usecase::{
        AuthUseCaseImpl,
        BootcampUseCaseImpl,
        CourseUseCaseImpl,
        ReviewUseCaseImpl,
        TemplateRenderer,
        UserUseCaseImpl,
    },
};

/// multipart の境界やヘッダー分として写真の上限に上乗せするバイト数
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// ルーター構築に必要な依存
pub struct AppDependencies {
    pub pool:                PgPool,
    pub session_manager:     Arc<dyn SessionManager>,
    pub user_repository:     Arc<dyn UserRepository>,
    pub bootcamp_repository: Arc<dyn BootcampRepository>,
    pub course_repository:   Arc<dyn CourseRepository>,
    pub review_repository:   Arc<dyn ReviewRepository>,
    pub password_hasher:     Arc<dyn PasswordHasher>,
    pub geocoder:            Arc<dyn Geocoder>,
    pub photo_storage:       Arc<dyn PhotoStorage>,
    pub notification_sender: Arc<dyn NotificationSender>,
    pub template_renderer:   Arc<TemplateRenderer>,
    pub clock:               Arc<dyn Clock>,
}

/// DI とルーター定義を行う
pub fn build_app(config: &ApiConfig, deps: AppDependencies) -> Router {
    let authn_state = AuthnState {
        session_manager: deps.session_manager.clone(),
        user_repository: deps.user_repository.clone(),
    };
    let limiter = Arc::new(FixedWindowLimiter::new(config.rate_limit));

    let readiness_state = Arc::new(ReadinessState {
        pool:            deps.pool,
        session_manager: deps.session_manager.clone(),
    });
    let auth_state = Arc::new(AuthState {
        usecase:             AuthUseCaseImpl::new(
            deps.user_repository.clone(),
            deps.session_manager,
            deps.password_hasher.clone(),
            deps.notification_sender,
            deps.template_renderer,
            deps.clock.clone(),
            config.public_url.clone(),
        ),
        session_ttl_seconds: config.session_ttl_seconds,
        secure_cookie:       config.production,
    });
    let bootcamp_state = Arc::new(BootcampState {
        usecase: BootcampUseCaseImpl::new(
            deps.bootcamp_repository.clone(),
            deps.geocoder,
            deps.photo_storage,
            deps.clock.clone(),
            config.max_file_upload,
        ),
    });
    let user_state = Arc::new(UserState {
        usecase: UserUseCaseImpl::new(
            deps.user_repository.clone(),
            deps.bootcamp_repository.clone(),
            deps.course_repository.clone(),
            deps.review_repository.clone(),
            deps.password_hasher,
            deps.clock.clone(),
        ),
    });
    let course_state = Arc::new(CourseState {
        usecase: CourseUseCaseImpl::new(
            deps.course_repository,
            deps.bootcamp_repository.clone(),
            deps.clock.clone(),
        ),
    });
    let review_state = Arc::new(ReviewState {
        usecase: ReviewUseCaseImpl::new(
            deps.review_repository,
            deps.bootcamp_repository,
            deps.clock,
        ),
    });

    let public = Router::new()
        .merge(
            Router::new()
                .route("/api/v1/auth/register", post(register))
                .route("/api/v1/auth/login", post(login))
                .route("/api/v1/auth/forgotpassword", post(forgot_password))
                .route(
                    "/api/v1/auth/resetpassword/{resettoken}",
                    put(reset_password),
                )
                .with_state(auth_state.clone()),
        )
        .merge(
            Router::new()
                .route("/api/v1/bootcamps", get(list_bootcamps))
                .route("/api/v1/bootcamps/{id}", get(get_bootcamp))
                .route(
                    "/api/v1/bootcamps/radius/{zipcode}/{distance}",
                    get(get_bootcamps_in_radius),
                )
                .with_state(bootcamp_state.clone()),
        )
        .merge(
            Router::new()
                .route("/api/v1/courses", get(list_courses))
                .route("/api/v1/courses/{id}", get(get_course))
                .route("/api/v1/bootcamps/{id}/courses", get(list_bootcamp_courses))
                .with_state(course_state.clone()),
        )
        .merge(
            Router::new()
                .route("/api/v1/reviews", get(list_reviews))
                .route("/api/v1/reviews/{id}", get(get_review))
                .route("/api/v1/bootcamps/{id}/reviews", get(list_bootcamp_reviews))
                .with_state(review_state.clone()),
        );

    let protected = Router::new()
        .merge(
            Router::new()
                .route("/api/v1/auth/logout", get(logout))
                .route("/api/v1/auth/me", get(get_me))
                .route("/api/v1/auth/updatedetails", put(update_details))
                .route("/api/v1/auth/updatepassword", put(update_password))
                .with_state(auth_state),
        )
        .merge(
            Router::new()
                .route("/api/v1/bootcamps", post(create_bootcamp))
                .route(
                    "/api/v1/bootcamps/{id}",
                    put(update_bootcamp).delete(delete_bootcamp),
                )
                .route(
                    "/api/v1/bootcamps/{id}/photo",
                    put(upload_bootcamp_photo).layer(DefaultBodyLimit::max(
                        config.max_file_upload.saturating_add(MULTIPART_OVERHEAD),
                    )),
                )
                .with_state(bootcamp_state),
        )
        .merge(
            Router::new()
                .route("/api/v1/bootcamps/{id}/courses", post(create_course))
                .route(
                    "/api/v1/courses/{id}",
                    put(update_course).delete(delete_course),
                )
                .with_state(course_state),
        )
        .merge(
            Router::new()
                .route("/api/v1/bootcamps/{id}/reviews", post(create_review))
                .route(
                    "/api/v1/reviews/{id}",
                    put(update_review).delete(delete_review),
                )
                .with_state(review_state),
        )
        .merge(
            Router::new()
                .route("/api/v1/users", get(list_users).post(create_user))
                .route(
                    "/api/v1/users/{id}",
                    get(get_user).put(update_user).delete(delete_user),
                )
                .with_state(user_state),
        )
        .route_layer(from_fn_with_state(authn_state, require_auth));

    let api = public
        .merge(protected)
        .layer(from_fn_with_state(limiter, rate_limit));

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/health/ready",
            get(readiness_check).with_state(readiness_state),
        )
        .merge(api)
        .nest_service("/uploads", ServeDir::new(&config.file_upload_path))
        .layer(CorsLayer::permissive())
        // セキュリティヘッダー
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("x-dns-prefetch-control"),
            HeaderValue::from_static("off"),
        ))
        // Request ID レイヤー（下に書いたものが外側）
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(CanonicalLogLineLayer)
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, time::Duration};

    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use devcamper_domain::user::UserRole;
    use devcamper_infra::{
        SessionData,
        mock::{
            MockBootcampRepository,
            MockCourseRepository,
            MockGeocoder,
            MockNotificationSender,
            MockPasswordHasher,
            MockPhotoStorage,
            MockReviewRepository,
            MockSessionManager,
            MockUserRepository,
        },
    };
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::{Value, json};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        config::{MailBackend, MailConfig, RateLimitConfig},
        test_utils::{create_bootcamp, create_user, fixed_clock, fixed_now},
    };

    fn config(max_requests: u32) -> ApiConfig {
        ApiConfig {
            host:                "127.0.0.1".to_string(),
            port:                5000,
            database_url:        "postgres://devcamper@127.0.0.1:1/devcamper".to_string(),
            redis_url:           "redis://127.0.0.1:1".to_string(),
            geocoder_base_url:   "http://127.0.0.1:1".to_string(),
            geocoder_api_key:    "test".to_string(),
            file_upload_path:    PathBuf::from("./public/uploads"),
            max_file_upload:     1_000_000,
            session_ttl_seconds: 3600,
            rate_limit:          RateLimitConfig {
                max_requests,
                window: Duration::from_secs(600),
            },
            mail:                MailConfig {
                backend:      MailBackend::Noop,
                smtp_host:    "localhost".to_string(),
                smtp_port:    1025,
                from_address: "noreply@devcamper.io".to_string(),
            },
            public_url:          "http://localhost:5000".to_string(),
            production:          false,
        }
    }

    struct Sut {
        app:       Router,
        users:     MockUserRepository,
        sessions:  MockSessionManager,
        bootcamps: MockBootcampRepository,
    }

    fn sut_with(max_requests: u32) -> Sut {
        let users = MockUserRepository::new();
        let sessions = MockSessionManager::new();
        let bootcamps = MockBootcampRepository::new();
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://devcamper@127.0.0.1:1/devcamper")
            .unwrap();

        let deps = AppDependencies {
            pool,
            session_manager: Arc::new(sessions.clone()),
            user_repository: Arc::new(users.clone()),
            bootcamp_repository: Arc::new(bootcamps.clone()),
            course_repository: Arc::new(MockCourseRepository::new(bootcamps.clone())),
            review_repository: Arc::new(MockReviewRepository::new(bootcamps.clone())),
            password_hasher: Arc::new(MockPasswordHasher),
            geocoder: Arc::new(MockGeocoder::new()),
            photo_storage: Arc::new(MockPhotoStorage::new()),
            notification_sender: Arc::new(MockNotificationSender::new()),
            template_renderer: Arc::new(TemplateRenderer::new().unwrap()),
            clock: Arc::new(fixed_clock()),
        };

        Sut {
            app: build_app(&config(max_requests), deps),
            users,
            sessions,
            bootcamps,
        }
    }

    fn sut() -> Sut {
        sut_with(100)
    }

    /// ユーザーを登録し、そのユーザーのトークンを返す
    fn sign_in(sut: &Sut, role: UserRole) -> (devcamper_domain::user::User, String) {
        let user = create_user(role, "publisher@gmail.com");
        sut.users.add_user(user.clone());
        sut.sessions
            .add_session("valid-token", SessionData::new(user.id().clone(), fixed_now()));
        (user, "valid-token".to_string())
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, body)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_一覧は認証なしで取得できる() {
        let sut = sut();

        let (status, headers, body) = send(sut.app, get_request("/api/v1/bootcamps")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert!(headers.contains_key("x-request-id"));
        assert_eq!(headers["x-content-type-options"], "nosniff");
    }

    #[tokio::test]
    async fn test_認証なしの作成は401() {
        let sut = sut();

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/bootcamps")
            .header("content-type", "application/json")
            .body(Body::from(json!({"name": "Devworks"}).to_string()))
            .unwrap();
        let (status, _, body) = send(sut.app, request).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Not authorized to access this route");
    }

    #[tokio::test]
    async fn test_同じパスでもgetは公開でdeleteは認証必須() {
        let sut = sut();
        let owner = create_user(UserRole::Publisher, "owner@gmail.com");
        let bootcamp = create_bootcamp(owner.id(), "Devworks Bootcamp");
        sut.bootcamps.add_bootcamp(bootcamp.clone());
        let uri = format!("/api/v1/bootcamps/{}", bootcamp.id());

        let (get_status, _, _) = send(sut.app.clone(), get_request(&uri)).await;
        let delete = Request::builder()
            .method(Method::DELETE)
            .uri(&uri)
            .body(Body::empty())
            .unwrap();
        let (delete_status, _, _) = send(sut.app, delete).await;

        assert_eq!(get_status, StatusCode::OK);
        assert_eq!(delete_status, StatusCode::UNAUTHORIZED);
        assert!(sut.bootcamps.get(bootcamp.id()).is_some());
    }

    #[tokio::test]
    async fn test_bearerトークンでmeを取得できる() {
        let sut = sut();
        let (user, token) = sign_in(&sut, UserRole::Publisher);

        let request = Request::builder()
            .uri("/api/v1/auth/me")
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(sut.app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], user.id().to_string());
    }

    #[tokio::test]
    async fn test_admin以外のユーザー管理は403() {
        let sut = sut();
        let (_, token) = sign_in(&sut, UserRole::Publisher);

        let request = Request::builder()
            .uri("/api/v1/users")
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = send(sut.app, request).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_レート制限を超えると429() {
        let sut = sut_with(2);

        let mut statuses = Vec::new();
        for _ in 0..3 {
            let (status, _, _) = send(sut.app.clone(), get_request("/api/v1/courses")).await;
            statuses.push(status);
        }

        assert_eq!(
            statuses,
            vec![StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]
        );
    }

    #[tokio::test]
    async fn test_ヘルスチェックはレート制限の対象外() {
        let sut = sut_with(1);

        for _ in 0..3 {
            let (status, _, _) = send(sut.app.clone(), get_request("/health")).await;
            assert_eq!(status, StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_未定義のパスは404() {
        let sut = sut();

        let (status, _, _) = send(sut.app, get_request("/api/v1/unknown")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_未定義のパスへの削除も認証ではなく404() {
        let sut = sut();

        let request = Request::builder()
            .method(Method::DELETE)
            .uri("/api/v1/unknown/1")
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = send(sut.app, request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[rstest]
    #[case("/api/v1/bootcamps?page=4294967295")]
    #[case("/api/v1/courses?page=4294967295")]
    #[case("/api/v1/reviews?page=4294967295")]
    #[tokio::test]
    async fn test_最大のページ番号でも一覧は空で返る(#[case] uri: &str) {
        let sut = sut();

        let (status, _, body) = send(sut.app, get_request(uri)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);
        assert_eq!(body["pagination"]["prev"]["page"], 4_294_967_294_u64);
        assert!(body["pagination"].get("next").is_none());
    }
}
