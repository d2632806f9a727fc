//! # パスワード
//!
//! パスワード関連の値オブジェクトを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 用途 |
//! |---|------------|------|
//! | [`PlainPassword`] | 平文パスワード | 登録・ログイン・変更時の入力値 |
//! | [`PasswordHash`] | パスワードハッシュ | 永続化用のハッシュ値 |
//! | [`PasswordVerifyResult`] | 検証結果 | パスワード検証の成否 |

use crate::DomainError;

/// パスワードの最小文字数
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// 平文パスワード
///
/// Debug 出力ではパスワードの値をマスクする。
#[derive(Clone)]
pub struct PlainPassword(String);

impl std::fmt::Debug for PlainPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PlainPassword").field(&"[REDACTED]").finish()
    }
}

impl PlainPassword {
    /// 検証せずにパスワードを作成する
    ///
    /// ログイン時の照合のように、入力値をそのまま比較する場合に使用する。
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// 新しく設定するパスワードを作成する
    ///
    /// # エラー
    ///
    /// 空、または [`MIN_PASSWORD_LENGTH`] 文字未満の場合は `DomainError::Validation`
    pub fn new_validated(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();

        if value.is_empty() {
            return Err(DomainError::Validation("Please add a password".to_string()));
        }

        if value.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(DomainError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        Ok(Self(value))
    }

    /// 文字列参照を取得する
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// パスワードハッシュ（永続化用）
///
/// Argon2id でハッシュ化されたパスワード文字列をラップする。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// ハッシュ文字列からインスタンスを作成する
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// 文字列参照を取得する
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 所有権を持つ文字列に変換する
    pub fn into_string(self) -> String {
        self.0
    }
}

/// パスワード検証結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordVerifyResult {
    /// パスワードが一致した
    Match,
    /// パスワードが一致しなかった
    Mismatch,
}

impl PasswordVerifyResult {
    /// 一致したかどうかを返す
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }

    /// 一致しなかったかどうかを返す
    pub fn is_mismatch(&self) -> bool {
        matches!(self, Self::Mismatch)
    }
}

impl From<bool> for PasswordVerifyResult {
    fn from(matched: bool) -> Self {
        if matched { Self::Match } else { Self::Mismatch }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_平文パスワードのdebug出力はマスクされる() {
        let password = PlainPassword::new("secret");
        let debug = format!("{:?}", password);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("secret"));
    }

    #[rstest]
    #[case("123456")]
    #[case("a much longer password")]
    fn test_6文字以上のパスワードは設定できる(#[case] input: &str) {
        let password = PlainPassword::new_validated(input).unwrap();
        assert_eq!(password.as_str(), input);
    }

    #[rstest]
    #[case("")]
    #[case("12345")]
    fn test_6文字未満のパスワードはバリデーションエラー(#[case] input: &str) {
        assert!(matches!(
            PlainPassword::new_validated(input),
            Err(DomainError::Validation(_))
        ));
    }

    #[rstest]
    fn test_boolからの変換() {
        assert_eq!(PasswordVerifyResult::from(true), PasswordVerifyResult::Match);
        assert_eq!(
            PasswordVerifyResult::from(false),
            PasswordVerifyResult::Mismatch
        );
        assert!(PasswordVerifyResult::Mismatch.is_mismatch());
    }
}
