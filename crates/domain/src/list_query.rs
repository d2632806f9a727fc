//! # 一覧クエリ
//!
//! 一覧エンドポイント共通のフィルタ・射影・ソート・ページングを表現する。
//!
//! ## クエリ文字列
//!
//! | キー | 例 | 意味 |
//! |------|-----|------|
//! | `select` | `select=name,careers` | 返却フィールドの限定 |
//! | `sort` | `sort=-average_cost,name` | 並び順（`-` は降順）。既定は `-created_at` |
//! | `page` | `page=2` | ページ番号（1 始まり、既定 1） |
//! | `limit` | `limit=10` | 1 ページの件数（既定 25、最大 100） |
//! | `field` | `housing=true` | 等価フィルタ |
//! | `field[op]` | `average_cost[lte]=10000` | 比較フィルタ（`gt` / `gte` / `lt` / `lte` / `in`） |
//!
//! フィルタ・ソートに使えるフィールドはエンティティごとの [`ListSchema`] に
//! 列挙したものに限られ、それ以外はバリデーションエラーとなる。
//! 値は型付きの [`FilterValue`] に変換され、SQL にはバインドパラメータとして渡される。

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::DomainError;

/// 1 ページの既定件数
pub const DEFAULT_LIMIT: u32 = 25;
/// 1 ページの最大件数
pub const MAX_LIMIT: u32 = 100;
/// 既定のソート指定
pub const DEFAULT_SORT: &str = "-created_at";

/// フィールドの型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// 文字列配列（`careers` など）。等価は「含む」、`in` は「いずれかを含む」
    TextArray,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Uuid,
}

/// フィルタ・ソート可能なフィールドの定義
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// クエリ文字列上の名前
    pub name:   &'static str,
    /// SQL 上の列（テーブル別名付き）
    pub column: &'static str,
    pub kind:   FieldKind,
}

impl FieldSpec {
    pub const fn new(name: &'static str, column: &'static str, kind: FieldKind) -> Self {
        Self { name, column, kind }
    }
}

/// エンティティごとのクエリ許可リスト
#[derive(Debug, Clone, Copy)]
pub struct ListSchema {
    pub fields:     &'static [FieldSpec],
    /// `select` で指定可能なレスポンスフィールド
    pub selectable: &'static [&'static str],
}

impl ListSchema {
    fn field(&self, name: &str) -> Result<&'static FieldSpec, DomainError> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| DomainError::Validation(format!("Unknown query field: {name}")))
    }
}

/// 比較演算子
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl FilterOp {
    fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "gt" => Ok(Self::Gt),
            "gte" => Ok(Self::Gte),
            "lt" => Ok(Self::Lt),
            "lte" => Ok(Self::Lte),
            "in" => Ok(Self::In),
            other => Err(DomainError::Validation(format!(
                "Unknown query operator: {other}"
            ))),
        }
    }

    /// 単一値の比較に使う SQL 演算子
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::In => "IN",
        }
    }

    fn is_ordering(&self) -> bool {
        matches!(self, Self::Gt | Self::Gte | Self::Lt | Self::Lte)
    }
}

/// 型付きのフィルタ値
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
}

impl FilterValue {
    fn parse(field: &FieldSpec, raw: &str) -> Result<Self, DomainError> {
        let invalid = || {
            DomainError::Validation(format!("Invalid value for {}: {raw}", field.name))
        };
        let raw = raw.trim();

        match field.kind {
            FieldKind::Text | FieldKind::TextArray => Ok(Self::Text(raw.to_string())),
            FieldKind::Integer => raw.parse().map(Self::Integer).map_err(|_| invalid()),
            FieldKind::Float => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Self::Float)
                .ok_or_else(invalid),
            FieldKind::Boolean => raw.parse().map(Self::Boolean).map_err(|_| invalid()),
            FieldKind::Uuid => Uuid::parse_str(raw).map(Self::Uuid).map_err(|_| invalid()),
            FieldKind::Timestamp => parse_timestamp(raw).map(Self::Timestamp).ok_or_else(invalid),
        }
    }
}

/// RFC 3339 形式、または `YYYY-MM-DD`（UTC 0 時）を受け付ける
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        })
}

/// 1 件のフィルタ条件
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field:  &'static FieldSpec,
    pub op:     FilterOp,
    /// `In` の場合は 1 件以上、それ以外は 1 件
    pub values: Vec<FilterValue>,
}

/// ソート条件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field:      &'static FieldSpec,
    pub descending: bool,
}

/// 検証済みの一覧クエリ
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub select:  Vec<String>,
    pub sort:    Vec<Sort>,
    pub filters: Vec<Filter>,
    pub page:    u32,
    pub limit:   u32,
}

impl ListQuery {
    /// クエリ文字列のキーと値の組から一覧クエリを作成する
    ///
    /// # エラー
    ///
    /// 許可リストにないフィールド・未知の演算子・型に合わない値・不正なページ指定は
    /// `DomainError::Validation`
    pub fn parse(params: &[(String, String)], schema: &ListSchema) -> Result<Self, DomainError> {
        let mut select = Vec::new();
        let mut sort = None;
        let mut filters = Vec::new();
        let mut page = 1;
        let mut limit = DEFAULT_LIMIT;

        for (key, value) in params {
            match key.as_str() {
                "select" => select = parse_select(value, schema)?,
                "sort" => sort = Some(parse_sort(value, schema)?),
                "page" => page = parse_positive("page", value)?,
                "limit" => limit = parse_positive("limit", value)?.min(MAX_LIMIT),
                _ => filters.push(parse_filter(key, value, schema)?),
            }
        }

        let sort = match sort {
            Some(sort) => sort,
            None => default_sort(schema),
        };

        Ok(Self {
            select,
            sort,
            filters,
            page,
            limit,
        })
    }

    /// 読み飛ばす件数
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }
}

fn parse_select(value: &str, schema: &ListSchema) -> Result<Vec<String>, DomainError> {
    split_list(value)
        .map(|name| {
            if schema.selectable.contains(&name) {
                Ok(name.to_string())
            } else {
                Err(DomainError::Validation(format!(
                    "Unknown select field: {name}"
                )))
            }
        })
        .collect()
}

fn parse_sort(value: &str, schema: &ListSchema) -> Result<Vec<Sort>, DomainError> {
    split_list(value)
        .map(|item| {
            let (name, descending) = match item.strip_prefix('-') {
                Some(name) => (name, true),
                None => (item, false),
            };
            Ok(Sort {
                field: schema.field(name)?,
                descending,
            })
        })
        .collect()
}

fn default_sort(schema: &ListSchema) -> Vec<Sort> {
    parse_sort(DEFAULT_SORT, schema).unwrap_or_default()
}

fn parse_positive(name: &str, value: &str) -> Result<u32, DomainError> {
    value
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|v| *v >= 1)
        .ok_or_else(|| DomainError::Validation(format!("{name} must be a positive integer")))
}

fn parse_filter(key: &str, value: &str, schema: &ListSchema) -> Result<Filter, DomainError> {
    let (name, op) = match key.split_once('[') {
        Some((name, rest)) => {
            let op = rest.strip_suffix(']').ok_or_else(|| {
                DomainError::Validation(format!("Malformed query key: {key}"))
            })?;
            (name, FilterOp::parse(op)?)
        }
        None => (key, FilterOp::Eq),
    };

    let field = schema.field(name)?;

    if op.is_ordering() && matches!(field.kind, FieldKind::TextArray | FieldKind::Boolean | FieldKind::Uuid) {
        return Err(DomainError::Validation(format!(
            "Operator {} is not supported for {name}",
            op.as_sql()
        )));
    }

    let values = if op == FilterOp::In {
        split_list(value)
            .map(|raw| FilterValue::parse(field, raw))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        vec![FilterValue::parse(field, value)?]
    };

    if values.is_empty() {
        return Err(DomainError::Validation(format!(
            "Please add at least one value for {name}"
        )));
    }

    Ok(Filter { field, op, values })
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// 1 ページ分の取得結果
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items:    Vec<T>,
    /// このページより後ろに行が存在するか
    pub has_next: bool,
}

impl<T> Page<T> {
    /// `limit + 1` 件まで取得した結果から 1 ページ分を切り出す
    pub fn from_overfetch(mut items: Vec<T>, limit: u32) -> Self {
        let limit = limit as usize;
        let has_next = items.len() > limit;
        items.truncate(limit);
        Self { items, has_next }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items:    self.items.into_iter().map(f).collect(),
            has_next: self.has_next,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    const FIELDS: &[FieldSpec] = &[
        FieldSpec::new("name", "b.name", FieldKind::Text),
        FieldSpec::new("careers", "b.careers", FieldKind::TextArray),
        FieldSpec::new("average_cost", "b.average_cost", FieldKind::Integer),
        FieldSpec::new("average_rating", "b.average_rating", FieldKind::Float),
        FieldSpec::new("housing", "b.housing", FieldKind::Boolean),
        FieldSpec::new("created_at", "b.created_at", FieldKind::Timestamp),
        FieldSpec::new("user", "b.user_id", FieldKind::Uuid),
    ];

    const SCHEMA: ListSchema = ListSchema {
        fields:     FIELDS,
        selectable: &["name", "description", "careers"],
    };

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[rstest]
    fn test_指定なしの場合は既定値() {
        let sut = ListQuery::parse(&[], &SCHEMA).unwrap();

        assert_eq!(sut.page, 1);
        assert_eq!(sut.limit, DEFAULT_LIMIT);
        assert_eq!(sut.offset(), 0);
        assert!(sut.select.is_empty());
        assert!(sut.filters.is_empty());
        assert_eq!(sut.sort.len(), 1);
        assert_eq!(sut.sort[0].field.name, "created_at");
        assert!(sut.sort[0].descending);
    }

    #[rstest]
    fn test_ページングとソートと射影() {
        let sut = ListQuery::parse(
            &params(&[
                ("select", "name, careers"),
                ("sort", "-average_cost,name"),
                ("page", "3"),
                ("limit", "10"),
            ]),
            &SCHEMA,
        )
        .unwrap();

        assert_eq!(sut.select, vec!["name", "careers"]);
        assert_eq!(
            sut.sort
                .iter()
                .map(|s| (s.field.column, s.descending))
                .collect::<Vec<_>>(),
            vec![("b.average_cost", true), ("b.name", false)]
        );
        assert_eq!(sut.offset(), 20);
    }

    #[rstest]
    fn test_limitは最大100に丸められる() {
        let sut = ListQuery::parse(&params(&[("limit", "500")]), &SCHEMA).unwrap();

        assert_eq!(sut.limit, MAX_LIMIT);
    }

    #[rstest]
    #[case("page", "0")]
    #[case("page", "-1")]
    #[case("limit", "abc")]
    fn test_不正なページ指定はバリデーションエラー(#[case] key: &str, #[case] value: &str) {
        assert!(matches!(
            ListQuery::parse(&params(&[(key, value)]), &SCHEMA),
            Err(DomainError::Validation(_))
        ));
    }

    #[rstest]
    fn test_比較フィルタは型付きの値になる() {
        let sut = ListQuery::parse(
            &params(&[
                ("average_cost[lte]", "10000"),
                ("housing", "true"),
                ("created_at[gte]", "2024-01-01"),
            ]),
            &SCHEMA,
        )
        .unwrap();

        assert_eq!(sut.filters.len(), 3);
        assert_eq!(sut.filters[0].op, FilterOp::Lte);
        assert_eq!(sut.filters[0].values, vec![FilterValue::Integer(10000)]);
        assert_eq!(sut.filters[1].op, FilterOp::Eq);
        assert_eq!(sut.filters[1].values, vec![FilterValue::Boolean(true)]);
        assert_eq!(
            sut.filters[2].values,
            vec![FilterValue::Timestamp(
                DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
                    .unwrap()
                    .with_timezone(&Utc)
            )]
        );
    }

    #[rstest]
    fn test_inフィルタはカンマ区切りの複数値() {
        let sut = ListQuery::parse(
            &params(&[("careers[in]", "Business,UI/UX")]),
            &SCHEMA,
        )
        .unwrap();

        assert_eq!(sut.filters[0].op, FilterOp::In);
        assert_eq!(
            sut.filters[0].values,
            vec![
                FilterValue::Text("Business".to_string()),
                FilterValue::Text("UI/UX".to_string())
            ]
        );
    }

    #[rstest]
    #[case("password", "x")]
    #[case("name[regex]", "x")]
    #[case("name[gt", "x")]
    #[case("average_cost", "cheap")]
    #[case("average_rating[gt]", "NaN")]
    #[case("housing[gt]", "true")]
    #[case("careers[in]", " , ")]
    #[case("sort", "password")]
    #[case("select", "password")]
    fn test_許可されない指定はバリデーションエラー(#[case] key: &str, #[case] value: &str) {
        assert!(matches!(
            ListQuery::parse(&params(&[(key, value)]), &SCHEMA),
            Err(DomainError::Validation(_))
        ));
    }

    #[rstest]
    fn test_created_atがないスキーマの既定ソートは空() {
        const NO_CREATED_AT: ListSchema = ListSchema {
            fields:     &[FieldSpec::new("name", "name", FieldKind::Text)],
            selectable: &[],
        };

        let sut = ListQuery::parse(&[], &NO_CREATED_AT).unwrap();

        assert!(sut.sort.is_empty());
    }

    #[rstest]
    #[case(vec![1, 2, 3], 2, vec![1, 2], true)]
    #[case(vec![1, 2], 2, vec![1, 2], false)]
    #[case(vec![], 2, vec![], false)]
    fn test_超過取得からのページ切り出し(
        #[case] rows: Vec<i32>,
        #[case] limit: u32,
        #[case] expected: Vec<i32>,
        #[case] has_next: bool,
    ) {
        let sut = Page::from_overfetch(rows, limit);

        assert_eq!(sut.items, expected);
        assert_eq!(sut.has_next, has_next);
    }
}
