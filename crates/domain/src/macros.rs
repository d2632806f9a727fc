/// UUID v7 ベースの ID 型を定義する宣言型マクロ
///
/// 以下を一括生成する:
/// - Newtype 構造体（`Uuid` をラップ）
/// - `derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)`
/// - `new()` / `from_uuid()` / `as_uuid()` / `parse()`
/// - `Default` impl（`new()` に委譲）
///
/// `parse()` はパスパラメータ由来の文字列を受け取り、UUID として解釈できない
/// 場合は `DomainError::NotFound` を返す（不正な ID は存在しない ID と同じ扱い）。
macro_rules! define_uuid_id {
    (
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident => $entity:expr;
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash,
            serde::Serialize, serde::Deserialize,
            derive_more::Display,
        )]
        #[display("{_0}")]
        $vis struct $Name(uuid::Uuid);

        impl $Name {
            /// 新しい ID を生成する（UUID v7）
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            /// 既存の UUID から ID を作成する
            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// 内部の UUID 参照を取得する
            pub fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }

            /// パスパラメータの文字列から ID を復元する
            pub fn parse(value: &str) -> Result<Self, $crate::DomainError> {
                uuid::Uuid::parse_str(value)
                    .map(Self)
                    .map_err(|_| $crate::DomainError::NotFound {
                        entity_type: $entity,
                        id:          value.to_string(),
                    })
            }
        }

        impl Default for $Name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

/// バリデーション付き String Newtype を定義する宣言型マクロ
///
/// - `new()`: trim + 空チェック + 最大長チェック
/// - `as_str()` / `into_string()`
/// - `Display`
///
/// # 引数
///
/// - `label`: エラーメッセージに使うラベル（例: `"name"`）
/// - `max_length`: 最大文字数（`chars().count()` でカウント）
///
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use devcamper_domain::bootcamp::BootcampName;
///
/// let name = BootcampName::new("  Devworks Bootcamp ")?;
/// assert_eq!(name.as_str(), "Devworks Bootcamp");
/// assert!(BootcampName::new("").is_err());
/// # Ok(())
/// # }
/// ```
macro_rules! define_validated_string {
    (
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident {
            label: $label:expr,
            max_length: $max_length:expr $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq,
            serde::Serialize, serde::Deserialize,
        )]
        $vis struct $Name(String);

        impl $Name {
            pub fn new(value: impl Into<String>) -> Result<Self, $crate::DomainError> {
                let value = value.into().trim().to_string();

                if value.is_empty() {
                    return Err($crate::DomainError::Validation(format!(
                        "Please add a {}",
                        $label
                    )));
                }

                if value.chars().count() > $max_length {
                    return Err($crate::DomainError::Validation(format!(
                        "The {} can not be more than {} characters",
                        $label, $max_length
                    )));
                }

                Ok(Self(value))
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

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}
