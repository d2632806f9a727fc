//! # ヘルスチェックハンドラ
//!
//! - `/health` - Liveness Check（常に `"healthy"` を返す）
//! - `/health/ready` - Readiness Check（PostgreSQL / Redis の接続状態を確認）
//!
//! レスポンス型は [`devcamper_shared::HealthResponse`] / [`devcamper_shared::ReadinessResponse`] を参照。

use std::{collections::BTreeMap, future::Future, sync::Arc, time::Duration};

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use devcamper_infra::SessionManager;
use devcamper_shared::{CheckStatus, HealthResponse, ReadinessResponse, ReadinessStatus};
use sqlx::PgPool;

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// ヘルスチェックエンドポイント
///
/// データベースや Redis への接続は確認せず、プロセスの起動状態のみを返す。
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy(env!("CARGO_PKG_VERSION")))
}

/// Readiness Check 用の State
pub struct ReadinessState {
    pub pool:            PgPool,
    pub session_manager: Arc<dyn SessionManager>,
}

/// Readiness Check エンドポイント
///
/// PostgreSQL と Redis の接続状態を並行チェックする。
/// 全チェック OK → 200、1 つでも失敗 → 503。
#[tracing::instrument(skip_all)]
pub async fn readiness_check(State(state): State<Arc<ReadinessState>>) -> impl IntoResponse {
    let (database, redis) = tokio::join!(
        check("database", async {
            sqlx::query("SELECT 1")
                .execute(&state.pool)
                .await
                .map(|_| ())
                .map_err(|e| e.to_string())
        }),
        check("redis", async {
            state
                .session_manager
                .ping()
                .await
                .map_err(|e| e.to_string())
        }),
    );

    let checks = BTreeMap::from([
        ("database".to_string(), database),
        ("redis".to_string(), redis),
    ]);
    let response = ReadinessResponse::from_checks(checks);
    let status = match response.status {
        ReadinessStatus::Ready => StatusCode::OK,
        ReadinessStatus::NotReady => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(response))
}

/// 依存先を 1 つ確認する（タイムアウト: 5 秒）
async fn check<F>(name: &'static str, probe: F) -> CheckStatus
where
    F: Future<Output = Result<(), String>>,
{
    match tokio::time::timeout(CHECK_TIMEOUT, probe).await {
        Ok(Ok(())) => CheckStatus::Ok,
        Ok(Err(e)) => {
            tracing::warn!(check = name, error = %e, "readiness check failed");
            CheckStatus::Error
        }
        Err(_) => {
            tracing::warn!(check = name, "readiness check timed out");
            CheckStatus::Error
        }
    }
}
