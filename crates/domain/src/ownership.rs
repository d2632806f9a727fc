//! # 所有者チェック
//!
//! 認証済みの要求者がリソースを操作できるかを判定する。
//!
//! - 所有者本人、または admin ロールであれば許可
//! - ロール制限付きの操作は許可ロールの一覧で判定

use crate::{
    DomainError,
    user::{UserId, UserRole},
};

/// 認可判定に使う要求者情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    id:   UserId,
    role: UserRole,
}

impl Requester {
    pub fn new(id: UserId, role: UserRole) -> Self {
        Self { id, role }
    }

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn role(&self) -> UserRole {
        self.role
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// 要求者がリソースの所有者または admin であることを確認する
///
/// `action` はエラーメッセージに埋め込む操作名（例: `"update this bootcamp"`）。
pub fn ensure_owner_or_admin(
    requester: &Requester,
    owner: &UserId,
    action: &str,
) -> Result<(), DomainError> {
    if requester.is_admin() || requester.id() == owner {
        return Ok(());
    }

    Err(DomainError::Forbidden(format!(
        "User {} is not authorized to {action}",
        requester.id()
    )))
}

/// 要求者のロールが許可ロールに含まれることを確認する
pub fn ensure_role(requester: &Requester, allowed: &[UserRole]) -> Result<(), DomainError> {
    if allowed.contains(&requester.role()) {
        return Ok(());
    }

    Err(DomainError::Forbidden(format!(
        "User role {} is not authorized to access this route",
        requester.role()
    )))
}
