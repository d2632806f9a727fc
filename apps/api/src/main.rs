//! # DevCamper API サーバー
//!
//! ブートキャンプ検索サイトのバックエンド。
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │    Client    │────▶│ devcamper-api│────▶│  PostgreSQL  │
//! │              │     │  port: 5000  │     └──────────────┘
//! └──────────────┘     └──────────────┘
//!                         │        │
//!                         ▼        ▼
//!                  ┌──────────┐ ┌──────────────┐
//!                  │  Redis   │ │ MapQuest/SMTP│
//!                  │(session) │ └──────────────┘
//!                  └──────────┘
//! ```
//!
//! 環境変数は [`devcamper_api::config`] を参照。
//!
//! ## 起動方法
//!
//! ```bash
//! # 開発環境（.env ファイルを使用）
//! cargo run -p devcamper-api
//! ```

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context as _;
use devcamper_api::{
    app_builder::{AppDependencies, build_app},
    config::{ApiConfig, MailBackend},
    usecase::TemplateRenderer,
};
use devcamper_domain::clock::SystemClock;
use devcamper_infra::{
    Argon2PasswordHasher,
    LocalPhotoStorage,
    MapQuestGeocoder,
    NoopNotificationSender,
    NotificationSender,
    RedisSessionManager,
    SmtpNotificationSender,
    db,
    repository::{
        PostgresBootcampRepository,
        PostgresCourseRepository,
        PostgresReviewRepository,
        PostgresUserRepository,
    },
};
use devcamper_shared::observability::{TracingConfig, init_tracing};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    init_tracing(&TracingConfig::from_env("devcamper-api"));
    let _tracing_guard = tracing::info_span!("app", service = "devcamper-api").entered();

    let config = ApiConfig::from_env().context("設定の読み込みに失敗しました")?;
    tracing::info!("API サーバーを起動します: {}:{}", config.host, config.port);

    // 依存関係の初期化
    let pool = db::create_pool(&config.database_url)
        .await
        .context("データベースへの接続に失敗しました")?;
    db::run_migrations(&pool)
        .await
        .context("マイグレーションの実行に失敗しました")?;

    let session_manager = RedisSessionManager::new(&config.redis_url, config.session_ttl_seconds)
        .await
        .context("Redis への接続に失敗しました")?;

    let notification_sender: Arc<dyn NotificationSender> = match config.mail.backend {
        MailBackend::Smtp => Arc::new(SmtpNotificationSender::new(
            &config.mail.smtp_host,
            config.mail.smtp_port,
            config.mail.from_address.clone(),
        )),
        MailBackend::Noop => Arc::new(NoopNotificationSender),
    };

    tokio::fs::create_dir_all(&config.file_upload_path)
        .await
        .with_context(|| {
            format!(
                "アップロード先を作成できません: {}",
                config.file_upload_path.display()
            )
        })?;

    let deps = AppDependencies {
        session_manager:     Arc::new(session_manager),
        user_repository:     Arc::new(PostgresUserRepository::new(pool.clone())),
        bootcamp_repository: Arc::new(PostgresBootcampRepository::new(pool.clone())),
        course_repository:   Arc::new(PostgresCourseRepository::new(pool.clone())),
        review_repository:   Arc::new(PostgresReviewRepository::new(pool.clone())),
        password_hasher:     Arc::new(Argon2PasswordHasher::new()?),
        geocoder:            Arc::new(MapQuestGeocoder::new(
            config.geocoder_base_url.clone(),
            config.geocoder_api_key.clone(),
        )),
        photo_storage:       Arc::new(LocalPhotoStorage::new(config.file_upload_path.clone())),
        notification_sender,
        template_renderer:   Arc::new(TemplateRenderer::new()?),
        clock:               Arc::new(SystemClock),
        pool,
    };

    let app = build_app(&config, deps);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("不正なバインドアドレスです")?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("API サーバーが起動しました: {}", addr);

    // レート制限で接続元 IP を使うため ConnectInfo を有効にする
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
