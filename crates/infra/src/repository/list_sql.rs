//! # 一覧クエリの SQL 組み立て
//!
//! [`ListQuery`] を `WHERE` / `ORDER BY` / `LIMIT` / `OFFSET` 句に変換する。
//! 値はすべて `push_bind` でバインドし、列名は [`ListSchema`](devcamper_domain::list_query::ListSchema)
//! に静的に定義されたものだけを使う。
//!
//! `LIMIT` は `limit + 1` で、次ページの有無の判定に使う
//! （[`Page::from_overfetch`](devcamper_domain::list_query::Page::from_overfetch)）。

use devcamper_domain::list_query::{FieldKind, Filter, FilterOp, FilterValue, ListQuery, Sort};
use sqlx::{Postgres, QueryBuilder};

/// ベースクエリ（`WHERE` を含まない `SELECT ... FROM ...`）に一覧句を追加する
pub fn push_list_clauses(builder: &mut QueryBuilder<'_, Postgres>, query: &ListQuery) {
    push_filters(builder, &query.filters);
    push_order_by(builder, &query.sort);
    builder
        .push(" LIMIT ")
        .push_bind(i64::from(query.limit) + 1)
        .push(" OFFSET ")
        .push_bind(query.offset());
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filters: &[Filter]) {
    for (i, filter) in filters.iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        push_condition(builder, filter);
    }
}

fn push_condition(builder: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    let column = filter.field.column;

    match (filter.field.kind, filter.op) {
        // いずれかを含む
        (FieldKind::TextArray, FilterOp::In) => {
            builder
                .push(column)
                .push(" && ")
                .push_bind(texts(&filter.values))
                .push("::text[]");
        }
        // 含む
        (FieldKind::TextArray, _) => {
            builder
                .push_bind(texts(&filter.values).into_iter().next().unwrap_or_default())
                .push(" = ANY(")
                .push(column)
                .push(")");
        }
        (_, FilterOp::In) => {
            builder.push(column).push(" IN (");
            for (i, value) in filter.values.iter().enumerate() {
                if i > 0 {
                    builder.push(", ");
                }
                push_value(builder, value);
            }
            builder.push(")");
        }
        (_, op) => {
            builder.push(column).push(" ").push(op.as_sql()).push(" ");
            match filter.values.first() {
                Some(value) => push_value(builder, value),
                None => {
                    builder.push("NULL");
                }
            }
        }
    }
}

fn push_value(builder: &mut QueryBuilder<'_, Postgres>, value: &FilterValue) {
    match value {
        FilterValue::Text(v) => builder.push_bind(v.clone()),
        FilterValue::Integer(v) => builder.push_bind(*v),
        FilterValue::Float(v) => builder.push_bind(*v),
        FilterValue::Boolean(v) => builder.push_bind(*v),
        FilterValue::Timestamp(v) => builder.push_bind(*v),
        FilterValue::Uuid(v) => builder.push_bind(*v),
    };
}

fn texts(values: &[FilterValue]) -> Vec<String> {
    values
        .iter()
        .filter_map(|v| match v {
            FilterValue::Text(s) => Some(s.clone()),
            _ => None,
        })
        .collect()
}

fn push_order_by(builder: &mut QueryBuilder<'_, Postgres>, sort: &[Sort]) {
    for (i, s) in sort.iter().enumerate() {
        builder.push(if i == 0 { " ORDER BY " } else { ", " });
        builder
            .push(s.field.column)
            .push(if s.descending { " DESC" } else { " ASC" });
    }
}

#[cfg(test)]
mod tests {
    use devcamper_domain::list_query::{FieldSpec, ListSchema};
    use pretty_assertions::assert_eq;

    use super::*;

    const SCHEMA: ListSchema = ListSchema {
        fields:     &[
            FieldSpec::new("name", "b.name", FieldKind::Text),
            FieldSpec::new("careers", "b.careers", FieldKind::TextArray),
            FieldSpec::new("average_cost", "b.average_cost", FieldKind::Integer),
            FieldSpec::new("housing", "b.housing", FieldKind::Boolean),
            FieldSpec::new("created_at", "b.created_at", FieldKind::Timestamp),
        ],
        selectable: &[],
    };

    fn build(pairs: &[(&str, &str)]) -> String {
        let params: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let query = ListQuery::parse(&params, &SCHEMA).unwrap();

        let mut builder = QueryBuilder::<Postgres>::new("SELECT b.id FROM bootcamps b");
        push_list_clauses(&mut builder, &query);
        builder.sql().to_string()
    }

    #[test]
    fn test_指定なしは作成日時の降順() {
        assert_eq!(
            build(&[]),
            "SELECT b.id FROM bootcamps b ORDER BY b.created_at DESC LIMIT $1 OFFSET $2"
        );
    }

    #[test]
    fn test_比較フィルタはバインドパラメータになる() {
        assert_eq!(
            build(&[
                ("average_cost[lte]", "10000"),
                ("housing", "true"),
                ("sort", "name,-average_cost"),
            ]),
            "SELECT b.id FROM bootcamps b \
             WHERE b.average_cost <= $1 AND b.housing = $2 \
             ORDER BY b.name ASC, b.average_cost DESC LIMIT $3 OFFSET $4"
        );
    }

    #[test]
    fn test_inフィルタは値の数だけパラメータを持つ() {
        assert_eq!(
            build(&[("average_cost[in]", "5000,10000,15000")]),
            "SELECT b.id FROM bootcamps b \
             WHERE b.average_cost IN ($1, $2, $3) \
             ORDER BY b.created_at DESC LIMIT $4 OFFSET $5"
        );
    }

    #[test]
    fn test_配列列の等価は含む_inはいずれかを含む() {
        assert_eq!(
            build(&[("careers", "Business"), ("careers[in]", "UI/UX,Other")]),
            "SELECT b.id FROM bootcamps b \
             WHERE $1 = ANY(b.careers) AND b.careers && $2::text[] \
             ORDER BY b.created_at DESC LIMIT $3 OFFSET $4"
        );
    }

    #[test]
    fn test_値は文字列に埋め込まれない() {
        let sql = build(&[("name", "'; DROP TABLE users; --")]);

        assert!(!sql.contains("DROP"));
        assert!(sql.contains("b.name = $1"));
    }
}
