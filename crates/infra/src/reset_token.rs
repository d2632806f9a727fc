//! # パスワードリセットトークン
//!
//! 20 バイトの乱数を16進文字列にしたトークンを発行する。
//! DB には SHA-256 ハッシュ（16進）のみを保存し、平文はメールでのみ送る。

use sha2::{Digest, Sha256};

/// トークンの乱数バイト数
const TOKEN_BYTES: usize = 20;

/// 発行したトークン
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedResetToken {
    /// メールで送る平文トークン
    pub token: String,
    /// DB に保存するハッシュ
    pub hash:  String,
}

/// 新しいリセットトークンを発行する
pub fn issue() -> IssuedResetToken {
    let bytes: [u8; TOKEN_BYTES] = rand::random();
    let token = hex::encode(bytes);
    let hash = hash(&token);
    IssuedResetToken { token, hash }
}

/// トークンを SHA-256 でハッシュ化して16進文字列で返す
pub fn hash(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_発行したトークンは40桁の16進文字列() {
        let issued = issue();

        assert_eq!(issued.token.len(), TOKEN_BYTES * 2);
        assert!(issued.token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_ハッシュは平文トークンのsha256() {
        let issued = issue();

        assert_eq!(issued.hash, hash(&issued.token));
        assert_eq!(issued.hash.len(), 64);
    }

    #[test]
    fn test_既知の値のハッシュ() {
        assert_eq!(
            hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_発行のたびに異なるトークンになる() {
        assert_ne!(issue().token, issue().token);
    }
}
