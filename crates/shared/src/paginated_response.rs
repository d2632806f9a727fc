//! # ページネーション付きレスポンス
//!
//! ページ番号ベースのページネーションに対応した一覧 API のレスポンス型。

use serde::{Deserialize, Serialize};

/// 前後ページへのリンク情報
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLink {
    pub page:  u32,
    pub limit: u32,
}

/// ページネーション情報
///
/// `next` は後続の行が存在する場合のみ、`prev` は 2 ページ目以降でのみ出力される。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageLink>,
}

impl Pagination {
    /// 現在ページと後続行の有無からページネーション情報を組み立てる
    pub fn build(page: u32, limit: u32, has_next: bool) -> Self {
        Self {
            next: has_next.then(|| PageLink {
                page: page.saturating_add(1),
                limit,
            }),
            prev: (page > 1).then(|| PageLink {
                page: page - 1,
                limit,
            }),
        }
    }
}

/// ページネーション付きレスポンス
///
/// ## JSON 形式
///
/// ```json
/// {
///   "success": true,
///   "count": 25,
///   "pagination": { "next": { "page": 2, "limit": 25 } },
///   "data": [...]
/// }
/// ```
///
/// `count` は返却したページ内の件数。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub success:    bool,
    pub count:      usize,
    pub pagination: Pagination,
    pub data:       Vec<T>,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, pagination: Pagination) -> Self {
        Self {
            success: true,
            count: data.len(),
            pagination,
            data,
        }
    }
}
