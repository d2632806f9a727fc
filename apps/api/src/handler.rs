//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数と、レスポンス DTO を定義する。
//!
//! ## 設計方針
//!
//! - 各リソースのハンドラはサブモジュールに配置し、ここで re-export する
//! - ハンドラは薄く保ち、認可・検証・集計はユースケースに委譲する
//! - 一覧レスポンスの `select` 射影はシリアライズ後の JSON に対して行う
//!
//! ## モジュール構成
//!
//! ```text
//! handler.rs
//! └── handler/
//!     ├── auth.rs      # 登録・ログイン・パスワードリセット
//!     ├── bootcamp.rs  # ブートキャンプ CRUD・写真・半径検索
//!     ├── course.rs    # コース CRUD
//!     ├── health.rs    # ヘルスチェック・レディネスチェック
//!     ├── review.rs    # レビュー CRUD
//!     └── user.rs      # ユーザー管理（admin）
//! ```

pub mod auth;
pub mod bootcamp;
pub mod course;
pub mod health;
pub mod review;
pub mod user;

pub use auth::{
    AuthState,
    forgot_password,
    get_me,
    login,
    logout,
    register,
    reset_password,
    update_details,
    update_password,
};
pub use bootcamp::{
    BootcampState,
    create_bootcamp,
    delete_bootcamp,
    get_bootcamp,
    get_bootcamps_in_radius,
    list_bootcamps,
    update_bootcamp,
    upload_bootcamp_photo,
};
pub use course::{
    CourseState,
    create_course,
    delete_course,
    get_course,
    list_bootcamp_courses,
    list_courses,
    update_course,
};
pub use health::{ReadinessState, health_check, readiness_check};
pub use review::{
    ReviewState,
    create_review,
    delete_review,
    get_review,
    list_bootcamp_reviews,
    list_reviews,
    update_review,
};
pub use user::{UserState, create_user, delete_user, get_user, list_users, update_user};

use devcamper_domain::{
    bootcamp::BootcampSummary,
    list_query::{ListQuery, ListSchema, Page},
};
use devcamper_shared::{PaginatedResponse, Pagination};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::ApiError;

/// クエリ文字列（キーと値の組の列）
pub(crate) type QueryPairs = Vec<(String, String)>;

/// コース・レビューに添えるブートキャンプの概要
#[derive(Debug, Serialize)]
pub struct BootcampSummaryDto {
    pub id:          Uuid,
    pub name:        String,
    pub description: String,
}

impl From<&BootcampSummary> for BootcampSummaryDto {
    fn from(summary: &BootcampSummary) -> Self {
        Self {
            id:          *summary.id.as_uuid(),
            name:        summary.name.clone(),
            description: summary.description.clone(),
        }
    }
}

/// コース・レビューが属するブートキャンプ
///
/// 取得系は概要を埋め込み、作成・更新系は ID のみを返す。
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BootcampRef {
    Id(Uuid),
    Summary(BootcampSummaryDto),
}

impl From<&BootcampSummary> for BootcampRef {
    fn from(summary: &BootcampSummary) -> Self {
        Self::Summary(BootcampSummaryDto::from(summary))
    }
}

/// クエリ文字列を一覧クエリとして解釈する
pub(crate) fn parse_list_query(
    params: &[(String, String)],
    schema: &ListSchema,
) -> Result<ListQuery, ApiError> {
    Ok(ListQuery::parse(params, schema)?)
}

/// 1 ページ分の結果を DTO に変換し、ページング情報と `select` 射影を付けたレスポンスにする
pub(crate) fn paginated<T, D, F>(
    page: Page<T>,
    query: &ListQuery,
    to_dto: F,
) -> Result<PaginatedResponse<Value>, ApiError>
where
    D: Serialize,
    F: Fn(&T) -> D,
{
    let data = page
        .items
        .iter()
        .map(|item| project(to_dto(item), &query.select))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PaginatedResponse::new(
        data,
        Pagination::build(query.page, query.limit, page.has_next),
    ))
}

/// `select` で指定されたフィールドだけを残す（`id` は常に残す）
///
/// `select` が空なら全フィールドを返す。
pub(crate) fn project<D: Serialize>(dto: D, select: &[String]) -> Result<Value, ApiError> {
    let value = serde_json::to_value(dto).map_err(|e| ApiError::Internal(e.to_string()))?;

    if select.is_empty() {
        return Ok(value);
    }

    match value {
        Value::Object(fields) => {
            let projected: Map<String, Value> = fields
                .into_iter()
                .filter(|(key, _)| key == "id" || select.iter().any(|s| s == key))
                .collect();
            Ok(Value::Object(projected))
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[derive(Clone, Serialize)]
    struct Sample {
        id:          u32,
        name:        &'static str,
        description: &'static str,
        housing:     bool,
    }

    fn sample() -> Sample {
        Sample {
            id:          1,
            name:        "Devworks",
            description: "Full stack",
            housing:     true,
        }
    }

    #[test]
    fn test_selectが空なら全フィールドを返す() {
        let value = project(sample(), &[]).unwrap();

        assert_eq!(
            value,
            json!({"id": 1, "name": "Devworks", "description": "Full stack", "housing": true})
        );
    }

    #[test]
    fn test_selectしたフィールドとidだけを残す() {
        let select = vec!["name".to_string(), "housing".to_string()];

        let value = project(sample(), &select).unwrap();

        assert_eq!(value, json!({"id": 1, "name": "Devworks", "housing": true}));
    }

    #[test]
    fn test_ページング情報を付けたレスポンスを組み立てる() {
        let query = ListQuery {
            select:  vec![],
            sort:    vec![],
            filters: vec![],
            page:    2,
            limit:   1,
        };
        let page = Page {
            items:    vec![sample()],
            has_next: true,
        };

        let response = paginated(page, &query, Sample::clone).unwrap();

        assert_eq!(response.count, 1);
        assert_eq!(response.pagination.next.map(|l| l.page), Some(3));
        assert_eq!(response.pagination.prev.map(|l| l.page), Some(1));
    }
}
