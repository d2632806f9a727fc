//! # コースデモ API
//!
//! メモリ上のコース一覧を扱う小さな API。DevCamper 本体とは独立している。
//!
//! ## エンドポイント
//!
//! - `GET /` - 挨拶文
//! - `GET /api/courses` - 全件
//! - `POST /api/courses` - 追加（名前は 5 文字以上）
//! - `GET /api/course/{id}` - 1 件
//! - `PUT /api/courses/{id}` - 名前の変更（3 文字以上）
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | デフォルト |
//! |--------|------|-----------|
//! | `PORT` | No | `3000` |

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context as _;
use axum::{
    Json,
    Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
};
use devcamper_shared::{
    canonical_log::CanonicalLogLineLayer,
    observability::{TracingConfig, init_tracing},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{net::TcpListener, sync::RwLock};
use validator::Validate;

const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Course {
    id:   u32,
    name: String,
}

/// コース一覧（初期値は `course1` 〜 `course3`）
#[derive(Clone)]
struct AppState {
    courses: Arc<RwLock<Vec<Course>>>,
}

impl AppState {
    fn seeded() -> Self {
        let courses = (1..=3)
            .map(|id| Course {
                id,
                name: format!("course{id}"),
            })
            .collect();
        Self {
            courses: Arc::new(RwLock::new(courses)),
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
struct CreateCourseRequest {
    #[validate(length(min = 5, message = "name must be at least 5 characters long"))]
    name: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
struct UpdateCourseRequest {
    #[validate(length(min = 3, message = "name must be at least 3 characters long"))]
    name: String,
}

/// デモ API のエラー（いずれも 400、本文はプレーンテキスト）
#[derive(Debug, Error)]
enum DemoError {
    #[error("Course Not Found")]
    NotFound,

    #[error("{0}")]
    Invalid(String),
}

impl From<validator::ValidationErrors> for DemoError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .values()
            .flat_map(|errors| errors.iter())
            .filter_map(|error| error.message.as_ref().map(ToString::to_string))
            .collect::<Vec<_>>()
            .join(", ");
        Self::Invalid(message)
    }
}

impl From<JsonRejection> for DemoError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Invalid(rejection.body_text())
    }
}

impl IntoResponse for DemoError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

/// パスの ID を解釈する（数値でなければ存在しない ID と同じ扱い）
fn parse_id(raw: &str) -> Result<u32, DemoError> {
    raw.trim().parse().map_err(|_| DemoError::NotFound)
}

async fn hello() -> &'static str {
    "Hello WoRlD"
}

async fn list_courses(State(state): State<AppState>) -> Json<Vec<Course>> {
    Json(state.courses.read().await.clone())
}

async fn create_course(
    State(state): State<AppState>,
    payload: Result<Json<CreateCourseRequest>, JsonRejection>,
) -> Result<Json<Course>, DemoError> {
    let Json(req) = payload?;
    req.validate()?;

    let mut courses = state.courses.write().await;
    let id = u32::try_from(courses.len())
        .map_err(|_| DemoError::Invalid("Too many courses".to_string()))?
        + 1;
    let course = Course { id, name: req.name };
    courses.push(course.clone());

    tracing::info!(course.id = id, "コースを追加しました");
    Ok(Json(course))
}

async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Course>, DemoError> {
    let id = parse_id(&id)?;
    let courses = state.courses.read().await;

    courses
        .iter()
        .find(|c| c.id == id)
        .cloned()
        .map(Json)
        .ok_or(DemoError::NotFound)
}

/// 存在確認を先に行い、その後に名前を検証する
async fn update_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateCourseRequest>, JsonRejection>,
) -> Result<Json<Course>, DemoError> {
    let id = parse_id(&id)?;
    let mut courses = state.courses.write().await;
    let course = courses
        .iter_mut()
        .find(|c| c.id == id)
        .ok_or(DemoError::NotFound)?;

    let Json(req) = payload?;
    req.validate()?;

    course.name = req.name;
    Ok(Json(course.clone()))
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/api/courses", get(list_courses).post(create_course))
        .route("/api/course/{id}", get(get_course))
        .route("/api/courses/{id}", put(update_course))
        .with_state(state)
        .layer(CanonicalLogLineLayer)
}

fn port_from(value: Option<String>) -> anyhow::Result<u16> {
    match value {
        None => Ok(DEFAULT_PORT),
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("PORT の値が不正です: {raw}")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(&TracingConfig::from_env("course-demo"));

    let port = port_from(std::env::var("PORT").ok())?;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("App listening on port {port}!");

    axum::serve(listener, app(AppState::seeded())).await?;
    Ok(())
}
