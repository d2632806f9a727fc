//! # BootcampRepository
//!
//! ブートキャンプの永続化を担当するリポジトリ。
//!
//! - 所在地は緯度・経度と住所要素の列に展開して保存する
//! - 半径検索は haversine の角距離を SQL で計算する
//! - 平均評価・平均費用は子リソースの書き込み後に専用メソッドで更新する

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use devcamper_domain::{
    bootcamp::{
        Address,
        Bootcamp,
        BootcampId,
        BootcampName,
        BootcampRecord,
        Careers,
        Description,
        Phone,
        Slug,
        Website,
    },
    geo::{GeoPoint, Location},
    list_query::{FieldKind, FieldSpec, ListQuery, ListSchema, Page},
    user::{Email, UserId},
};
use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

use super::{invalid_row, list_sql::push_list_clauses};
use crate::error::InfraError;

/// ブートキャンプ一覧のクエリ許可リスト
pub const BOOTCAMP_LIST_SCHEMA: ListSchema = ListSchema {
    fields:     &[
        FieldSpec::new("name", "b.name", FieldKind::Text),
        FieldSpec::new("slug", "b.slug", FieldKind::Text),
        FieldSpec::new("careers", "b.careers", FieldKind::TextArray),
        FieldSpec::new("housing", "b.housing", FieldKind::Boolean),
        FieldSpec::new("job_assistance", "b.job_assistance", FieldKind::Boolean),
        FieldSpec::new("job_guarantee", "b.job_guarantee", FieldKind::Boolean),
        FieldSpec::new("accept_gi", "b.accept_gi", FieldKind::Boolean),
        FieldSpec::new("average_rating", "b.average_rating", FieldKind::Float),
        FieldSpec::new("average_cost", "b.average_cost", FieldKind::Integer),
        FieldSpec::new("city", "b.city", FieldKind::Text),
        FieldSpec::new("state", "b.state", FieldKind::Text),
        FieldSpec::new("zipcode", "b.zipcode", FieldKind::Text),
        FieldSpec::new("user", "b.user_id", FieldKind::Uuid),
        FieldSpec::new("created_at", "b.created_at", FieldKind::Timestamp),
    ],
    selectable: &[
        "id",
        "user",
        "name",
        "slug",
        "description",
        "website",
        "phone",
        "email",
        "address",
        "location",
        "careers",
        "housing",
        "job_assistance",
        "job_guarantee",
        "accept_gi",
        "average_rating",
        "average_cost",
        "photo",
        "created_at",
    ],
};

const SELECT_BOOTCAMPS: &str = r#"
    SELECT
        b.id, b.user_id, b.name, b.slug, b.description, b.website, b.phone, b.email,
        b.address, b.latitude, b.longitude, b.formatted_address, b.street, b.city,
        b.state, b.zipcode, b.country, b.careers, b.housing, b.job_assistance,
        b.job_guarantee, b.accept_gi, b.average_rating, b.average_cost, b.photo,
        b.created_at
    FROM bootcamps b"#;

/// ブートキャンプリポジトリトレイト
#[async_trait]
pub trait BootcampRepository: Send + Sync {
    /// 一覧クエリで 1 ページ分を取得する
    async fn list(&self, query: &ListQuery) -> Result<Page<Bootcamp>, InfraError>;

    /// ID でブートキャンプを検索する
    async fn find_by_id(&self, id: &BootcampId) -> Result<Option<Bootcamp>, InfraError>;

    /// 指定地点から `radius`（ラジアン）以内のブートキャンプを取得する
    async fn find_within_radius(
        &self,
        center: &GeoPoint,
        radius: f64,
    ) -> Result<Vec<Bootcamp>, InfraError>;

    /// ユーザーが公開しているブートキャンプの件数
    async fn count_by_user(&self, user_id: &UserId) -> Result<i64, InfraError>;

    /// ブートキャンプを挿入する
    async fn insert(&self, bootcamp: &Bootcamp) -> Result<(), InfraError>;

    /// ブートキャンプを更新する（部分更新・写真登録後の状態を反映）
    async fn update(&self, bootcamp: &Bootcamp) -> Result<(), InfraError>;

    /// 平均評価を更新する
    async fn update_average_rating(
        &self,
        id: &BootcampId,
        average_rating: Option<f64>,
    ) -> Result<(), InfraError>;

    /// 平均費用を更新する
    async fn update_average_cost(
        &self,
        id: &BootcampId,
        average_cost: Option<i32>,
    ) -> Result<(), InfraError>;

    /// ブートキャンプを削除する（コース・レビューは DB のカスケードで削除）
    async fn delete(&self, id: &BootcampId) -> Result<(), InfraError>;
}

#[derive(sqlx::FromRow)]
struct BootcampRow {
    id:                Uuid,
    user_id:           Uuid,
    name:              String,
    slug:              String,
    description:       String,
    website:           Option<String>,
    phone:             Option<String>,
    email:             Option<String>,
    address:           String,
    latitude:          Option<f64>,
    longitude:         Option<f64>,
    formatted_address: Option<String>,
    street:            Option<String>,
    city:              Option<String>,
    state:             Option<String>,
    zipcode:           Option<String>,
    country:           Option<String>,
    careers:           Vec<String>,
    housing:           bool,
    job_assistance:    bool,
    job_guarantee:     bool,
    accept_gi:         bool,
    average_rating:    Option<f64>,
    average_cost:      Option<i32>,
    photo:             String,
    created_at:        DateTime<Utc>,
}

impl TryFrom<BootcampRow> for Bootcamp {
    type Error = InfraError;

    fn try_from(row: BootcampRow) -> Result<Self, Self::Error> {
        let location = match (row.latitude, row.longitude) {
            (Some(lat), Some(lng)) => Some(Location {
                point:             GeoPoint::new(lat, lng).map_err(invalid_row)?,
                formatted_address: row.formatted_address.unwrap_or_default(),
                street:            row.street,
                city:              row.city,
                state:             row.state,
                zipcode:           row.zipcode,
                country:           row.country,
            }),
            _ => None,
        };

        Ok(Bootcamp::from_db(BootcampRecord {
            id: BootcampId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            name: BootcampName::new(row.name).map_err(invalid_row)?,
            slug: Slug::from_db(row.slug),
            description: Description::new(row.description).map_err(invalid_row)?,
            website: row.website.map(Website::new).transpose().map_err(invalid_row)?,
            phone: row.phone.map(Phone::new).transpose().map_err(invalid_row)?,
            email: row.email.map(Email::new).transpose().map_err(invalid_row)?,
            address: Address::new(row.address).map_err(invalid_row)?,
            location,
            careers: Careers::parse(&row.careers).map_err(invalid_row)?,
            housing: row.housing,
            job_assistance: row.job_assistance,
            job_guarantee: row.job_guarantee,
            accept_gi: row.accept_gi,
            average_rating: row.average_rating,
            average_cost: row.average_cost,
            photo: row.photo,
            created_at: row.created_at,
        }))
    }
}

fn into_bootcamps(rows: Vec<BootcampRow>) -> Result<Vec<Bootcamp>, InfraError> {
    rows.into_iter().map(Bootcamp::try_from).collect()
}

/// PostgreSQL 実装の BootcampRepository
#[derive(Debug, Clone)]
pub struct PostgresBootcampRepository {
    pool: PgPool,
}

impl PostgresBootcampRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BootcampRepository for PostgresBootcampRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(page = query.page, limit = query.limit))]
    async fn list(&self, query: &ListQuery) -> Result<Page<Bootcamp>, InfraError> {
        let mut builder = QueryBuilder::new(SELECT_BOOTCAMPS);
        push_list_clauses(&mut builder, query);

        let rows: Vec<BootcampRow> = builder.build_query_as().fetch_all(&self.pool).await?;

        Ok(Page::from_overfetch(into_bootcamps(rows)?, query.limit))
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn find_by_id(&self, id: &BootcampId) -> Result<Option<Bootcamp>, InfraError> {
        let row: Option<BootcampRow> =
            sqlx::query_as(&format!("{SELECT_BOOTCAMPS} WHERE b.id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        row.map(Bootcamp::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(lat = center.latitude(), lng = center.longitude(), radius = radius))]
    async fn find_within_radius(
        &self,
        center: &GeoPoint,
        radius: f64,
    ) -> Result<Vec<Bootcamp>, InfraError> {
        let sql = format!(
            r#"{SELECT_BOOTCAMPS}
            WHERE b.latitude IS NOT NULL AND b.longitude IS NOT NULL
              AND 2 * asin(least(1.0, sqrt(
                    power(sin(radians(b.latitude - $1) / 2), 2)
                    + cos(radians($1)) * cos(radians(b.latitude))
                      * power(sin(radians(b.longitude - $2) / 2), 2)
                  ))) <= $3
            ORDER BY b.created_at DESC"#
        );

        let rows: Vec<BootcampRow> = sqlx::query_as(&sql)
            .bind(center.latitude())
            .bind(center.longitude())
            .bind(radius)
            .fetch_all(&self.pool)
            .await?;

        into_bootcamps(rows)
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%user_id))]
    async fn count_by_user(&self, user_id: &UserId) -> Result<i64, InfraError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bootcamps WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    #[tracing::instrument(skip_all, level = "debug", fields(id = %bootcamp.id()))]
    async fn insert(&self, bootcamp: &Bootcamp) -> Result<(), InfraError> {
        let location = bootcamp.location();
        sqlx::query(
            r#"
            INSERT INTO bootcamps (
                id, user_id, name, slug, description, website, phone, email, address,
                latitude, longitude, formatted_address, street, city, state, zipcode, country,
                careers, housing, job_assistance, job_guarantee, accept_gi,
                average_rating, average_cost, photo, created_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9,
                $10, $11, $12, $13, $14, $15, $16, $17,
                $18, $19, $20, $21, $22,
                $23, $24, $25, $26
            )
            "#,
        )
        .bind(bootcamp.id().as_uuid())
        .bind(bootcamp.user_id().as_uuid())
        .bind(bootcamp.name().as_str())
        .bind(bootcamp.slug().as_str())
        .bind(bootcamp.description().as_str())
        .bind(bootcamp.website().map(Website::as_str))
        .bind(bootcamp.phone().map(Phone::as_str))
        .bind(bootcamp.email().map(Email::as_str))
        .bind(bootcamp.address().as_str())
        .bind(location.map(|l| l.point.latitude()))
        .bind(location.map(|l| l.point.longitude()))
        .bind(location.map(|l| l.formatted_address.as_str()))
        .bind(location.and_then(|l| l.street.as_deref()))
        .bind(location.and_then(|l| l.city.as_deref()))
        .bind(location.and_then(|l| l.state.as_deref()))
        .bind(location.and_then(|l| l.zipcode.as_deref()))
        .bind(location.and_then(|l| l.country.as_deref()))
        .bind(bootcamp.careers().to_strings())
        .bind(bootcamp.housing())
        .bind(bootcamp.job_assistance())
        .bind(bootcamp.job_guarantee())
        .bind(bootcamp.accept_gi())
        .bind(bootcamp.average_rating())
        .bind(bootcamp.average_cost())
        .bind(bootcamp.photo())
        .bind(bootcamp.created_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(id = %bootcamp.id()))]
    async fn update(&self, bootcamp: &Bootcamp) -> Result<(), InfraError> {
        let location = bootcamp.location();
        sqlx::query(
            r#"
            UPDATE bootcamps SET
                name = $2, slug = $3, description = $4, website = $5, phone = $6,
                email = $7, address = $8, latitude = $9, longitude = $10,
                formatted_address = $11, street = $12, city = $13, state = $14,
                zipcode = $15, country = $16, careers = $17, housing = $18,
                job_assistance = $19, job_guarantee = $20, accept_gi = $21, photo = $22
            WHERE id = $1
            "#,
        )
        .bind(bootcamp.id().as_uuid())
        .bind(bootcamp.name().as_str())
        .bind(bootcamp.slug().as_str())
        .bind(bootcamp.description().as_str())
        .bind(bootcamp.website().map(Website::as_str))
        .bind(bootcamp.phone().map(Phone::as_str))
        .bind(bootcamp.email().map(Email::as_str))
        .bind(bootcamp.address().as_str())
        .bind(location.map(|l| l.point.latitude()))
        .bind(location.map(|l| l.point.longitude()))
        .bind(location.map(|l| l.formatted_address.as_str()))
        .bind(location.and_then(|l| l.street.as_deref()))
        .bind(location.and_then(|l| l.city.as_deref()))
        .bind(location.and_then(|l| l.state.as_deref()))
        .bind(location.and_then(|l| l.zipcode.as_deref()))
        .bind(location.and_then(|l| l.country.as_deref()))
        .bind(bootcamp.careers().to_strings())
        .bind(bootcamp.housing())
        .bind(bootcamp.job_assistance())
        .bind(bootcamp.job_guarantee())
        .bind(bootcamp.accept_gi())
        .bind(bootcamp.photo())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn update_average_rating(
        &self,
        id: &BootcampId,
        average_rating: Option<f64>,
    ) -> Result<(), InfraError> {
        sqlx::query("UPDATE bootcamps SET average_rating = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(average_rating)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn update_average_cost(
        &self,
        id: &BootcampId,
        average_cost: Option<i32>,
    ) -> Result<(), InfraError> {
        sqlx::query("UPDATE bootcamps SET average_cost = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(average_cost)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn delete(&self, id: &BootcampId) -> Result<(), InfraError> {
        sqlx::query("DELETE FROM bootcamps WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> BootcampRow {
        BootcampRow {
            id:                Uuid::now_v7(),
            user_id:           Uuid::now_v7(),
            name:              "Devworks Bootcamp".to_string(),
            slug:              "devworks-bootcamp".to_string(),
            description:       "Devworks is a full stack JavaScript Bootcamp".to_string(),
            website:           Some("https://devworks.com".to_string()),
            phone:             None,
            email:             None,
            address:           "233 Bay State Rd Boston MA 02215".to_string(),
            latitude:          Some(42.35),
            longitude:         Some(-71.1),
            formatted_address: Some("233 Bay State Rd, Boston, MA 02215, US".to_string()),
            street:            None,
            city:              Some("Boston".to_string()),
            state:             Some("MA".to_string()),
            zipcode:           Some("02215".to_string()),
            country:           Some("US".to_string()),
            careers:           vec!["Web Development".to_string(), "UI/UX".to_string()],
            housing:           true,
            job_assistance:    true,
            job_guarantee:     false,
            accept_gi:         true,
            average_rating:    Some(8.5),
            average_cost:      Some(10000),
            photo:             "no-photo.jpg".to_string(),
            created_at:        Utc::now(),
        }
    }

    #[test]
    fn test_行からエンティティに変換できる() {
        let bootcamp = Bootcamp::try_from(row()).unwrap();

        assert_eq!(bootcamp.name().as_str(), "Devworks Bootcamp");
        assert_eq!(bootcamp.careers().as_slice().len(), 2);
        assert_eq!(
            bootcamp.location().and_then(|l| l.city.as_deref()),
            Some("Boston")
        );
        assert_eq!(bootcamp.average_cost(), Some(10000));
    }

    #[test]
    fn test_緯度経度がなければ所在地はnone() {
        let bootcamp = Bootcamp::try_from(BootcampRow {
            latitude: None,
            ..row()
        })
        .unwrap();

        assert!(bootcamp.location().is_none());
    }

    #[test]
    fn test_不正なキャリアは予期しないエラー() {
        let result = Bootcamp::try_from(BootcampRow {
            careers: vec!["Cooking".to_string()],
            ..row()
        });

        assert!(result.is_err());
    }

    #[test]
    fn test_スキーマの列はすべてbテーブルを参照する() {
        assert!(
            BOOTCAMP_LIST_SCHEMA
                .fields
                .iter()
                .all(|f| f.column.starts_with("b."))
        );
    }
}
