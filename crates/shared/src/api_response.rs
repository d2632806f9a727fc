//! # API レスポンスエンベロープ
//!
//! 公開 API の統一レスポンス形式 `{ "success": true, "data": T }` を提供する。

use serde::{Deserialize, Serialize};

/// 公開 API の統一レスポンス型
///
/// 単一リソースを返すエンドポイントは `{ "success": true, "data": T }` 形式で
/// レスポンスを返す。エラー時は [`ErrorResponse`](crate::ErrorResponse) を使う。
///
/// ## 使用例
///
/// ```
/// use devcamper_shared::ApiResponse;
///
/// let response = ApiResponse::new("hello");
/// assert!(response.success);
/// assert_eq!(response.data, "hello");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data:    T,
}

impl<T> ApiResponse<T> {
    /// 成功レスポンスを作成する
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// 件数付きのリストレスポンス
///
/// ページネーションを伴わない一覧（ブートキャンプ配下のコース一覧、
/// 半径検索など）で使用する。
///
/// ```json
/// { "success": true, "count": 2, "data": [...] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountedResponse<T> {
    pub success: bool,
    pub count:   usize,
    pub data:    Vec<T>,
}

impl<T> CountedResponse<T> {
    /// `count` を `data` の件数から算出して作成する
    pub fn new(data: Vec<T>) -> Self {
        Self {
            success: true,
            count: data.len(),
            data,
        }
    }
}
