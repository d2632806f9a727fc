//! # ブートキャンプ
//!
//! ディレクトリの主要エンティティ。コースを持ち、レビューを受ける。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 用途 |
//! |---|------------|------|
//! | [`Bootcamp`] | ブートキャンプ | 公開者が登録する教育プログラム |
//! | [`Slug`] | スラッグ | 名前から導出される URL 用識別子 |
//! | [`Career`] | キャリア | 対象とする職種 |
//! | [`BootcampSummary`] | 概要 | コース・レビューに添える名前と説明 |
//!
//! ## 不変条件
//!
//! - 名前は全体で一意（DB の一意制約で担保）
//! - admin 以外のユーザーが公開できるブートキャンプは 1 件まで
//! - 平均評価・平均費用は子リソースの変更後に再計算される

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};

use crate::{
    DomainError,
    geo::Location,
    user::{Email, UserId},
};

/// 写真未登録時のファイル名
pub const DEFAULT_PHOTO: &str = "no-photo.jpg";

define_uuid_id! {
    /// ブートキャンプ ID
    pub struct BootcampId => "Bootcamp";
}

define_validated_string! {
    /// ブートキャンプ名
    pub struct BootcampName {
        label: "name",
        max_length: 50,
    }
}

define_validated_string! {
    /// ブートキャンプの説明
    pub struct Description {
        label: "description",
        max_length: 500,
    }
}

define_validated_string! {
    /// 電話番号
    pub struct Phone {
        label: "phone number",
        max_length: 20,
    }
}

define_validated_string! {
    /// 住所（ジオコーディングの入力）
    pub struct Address {
        label: "address",
        max_length: 255,
    }
}

/// スラッグ
///
/// 名前を小文字化し、英数字以外の連続を `-` 1 文字に置き換える。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slug(String);

impl Slug {
    /// ブートキャンプ名からスラッグを導出する
    pub fn from_name(name: &BootcampName) -> Self {
        let mut slug = String::with_capacity(name.as_str().len());
        for c in name.as_str().chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
            } else if !slug.is_empty() && !slug.ends_with('-') {
                slug.push('-');
            }
        }
        Self(slug.trim_end_matches('-').to_string())
    }

    /// データベースから復元する
    pub fn from_db(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Web サイト URL
///
/// `http://` または `https://` で始まり、ホスト部にドットを含むこと。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Website(String);

impl Website {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_string();

        let rest = value
            .strip_prefix("https://")
            .or_else(|| value.strip_prefix("http://"));
        let valid = rest.is_some_and(|rest| {
            let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
            host.contains('.')
                && !host.starts_with('.')
                && !host.ends_with('.')
                && !rest.chars().any(char::is_whitespace)
        });

        if !valid {
            return Err(DomainError::Validation(
                "Please use a valid URL with HTTP or HTTPS".to_string(),
            ));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 対象キャリア
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    IntoStaticStr,
    EnumString,
    strum::Display,
)]
pub enum Career {
    #[serde(rename = "Web Development")]
    #[strum(serialize = "Web Development")]
    WebDevelopment,
    #[serde(rename = "Mobile Development")]
    #[strum(serialize = "Mobile Development")]
    MobileDevelopment,
    #[serde(rename = "UI/UX")]
    #[strum(serialize = "UI/UX")]
    UiUx,
    #[serde(rename = "Data Science")]
    #[strum(serialize = "Data Science")]
    DataScience,
    Business,
    Other,
}

impl Career {
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        value
            .parse()
            .map_err(|_| DomainError::Validation(format!("Invalid career: {value}")))
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// 対象キャリアの集合（1 件以上、重複なし、入力順を保持）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Careers(Vec<Career>);

impl Careers {
    pub fn new(careers: impl IntoIterator<Item = Career>) -> Result<Self, DomainError> {
        let mut unique = Vec::new();
        for career in careers {
            if !unique.contains(&career) {
                unique.push(career);
            }
        }

        if unique.is_empty() {
            return Err(DomainError::Validation(
                "Please add at least one career".to_string(),
            ));
        }

        Ok(Self(unique))
    }

    /// 文字列の一覧から作成する
    pub fn parse<S: AsRef<str>>(values: &[S]) -> Result<Self, DomainError> {
        let careers = values
            .iter()
            .map(|value| Career::parse(value.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(careers)
    }

    pub fn as_slice(&self) -> &[Career] {
        &self.0
    }

    /// 文字列表現の一覧を返す
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|c| c.as_str().to_string()).collect()
    }
}

/// コース・レビューに添えるブートキャンプの概要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootcampSummary {
    pub id:          BootcampId,
    pub name:        String,
    pub description: String,
}

/// 新規ブートキャンプの作成パラメータ
pub struct NewBootcamp {
    pub user_id:        UserId,
    pub name:           BootcampName,
    pub description:    Description,
    pub website:        Option<Website>,
    pub phone:          Option<Phone>,
    pub email:          Option<Email>,
    pub address:        Address,
    pub location:       Option<Location>,
    pub careers:        Careers,
    pub housing:        bool,
    pub job_assistance: bool,
    pub job_guarantee:  bool,
    pub accept_gi:      bool,
    pub now:            DateTime<Utc>,
}

/// データベースから復元するための全フィールド
pub struct BootcampRecord {
    pub id:             BootcampId,
    pub user_id:        UserId,
    pub name:           BootcampName,
    pub slug:           Slug,
    pub description:    Description,
    pub website:        Option<Website>,
    pub phone:          Option<Phone>,
    pub email:          Option<Email>,
    pub address:        Address,
    pub location:       Option<Location>,
    pub careers:        Careers,
    pub housing:        bool,
    pub job_assistance: bool,
    pub job_guarantee:  bool,
    pub accept_gi:      bool,
    pub average_rating: Option<f64>,
    pub average_cost:   Option<i32>,
    pub photo:          String,
    pub created_at:     DateTime<Utc>,
}

/// 部分更新の内容
///
/// `None` のフィールドは変更しない。
#[derive(Debug, Clone, Default)]
pub struct BootcampChanges {
    pub name:           Option<BootcampName>,
    pub description:    Option<Description>,
    pub website:        Option<Website>,
    pub phone:          Option<Phone>,
    pub email:          Option<Email>,
    pub address:        Option<Address>,
    pub careers:        Option<Careers>,
    pub housing:        Option<bool>,
    pub job_assistance: Option<bool>,
    pub job_guarantee:  Option<bool>,
    pub accept_gi:      Option<bool>,
}

/// ブートキャンプエンティティ
#[derive(Debug, Clone, PartialEq)]
pub struct Bootcamp {
    id:             BootcampId,
    user_id:        UserId,
    name:           BootcampName,
    slug:           Slug,
    description:    Description,
    website:        Option<Website>,
    phone:          Option<Phone>,
    email:          Option<Email>,
    address:        Address,
    location:       Option<Location>,
    careers:        Careers,
    housing:        bool,
    job_assistance: bool,
    job_guarantee:  bool,
    accept_gi:      bool,
    average_rating: Option<f64>,
    average_cost:   Option<i32>,
    photo:          String,
    created_at:     DateTime<Utc>,
}

impl Bootcamp {
    /// 新しいブートキャンプを作成する
    pub fn new(params: NewBootcamp) -> Self {
        Self {
            id:             BootcampId::new(),
            user_id:        params.user_id,
            slug:           Slug::from_name(&params.name),
            name:           params.name,
            description:    params.description,
            website:        params.website,
            phone:          params.phone,
            email:          params.email,
            address:        params.address,
            location:       params.location,
            careers:        params.careers,
            housing:        params.housing,
            job_assistance: params.job_assistance,
            job_guarantee:  params.job_guarantee,
            accept_gi:      params.accept_gi,
            average_rating: None,
            average_cost:   None,
            photo:          DEFAULT_PHOTO.to_string(),
            created_at:     params.now,
        }
    }

    /// データベースから復元する
    pub fn from_db(record: BootcampRecord) -> Self {
        Self {
            id:             record.id,
            user_id:        record.user_id,
            name:           record.name,
            slug:           record.slug,
            description:    record.description,
            website:        record.website,
            phone:          record.phone,
            email:          record.email,
            address:        record.address,
            location:       record.location,
            careers:        record.careers,
            housing:        record.housing,
            job_assistance: record.job_assistance,
            job_guarantee:  record.job_guarantee,
            accept_gi:      record.accept_gi,
            average_rating: record.average_rating,
            average_cost:   record.average_cost,
            photo:          record.photo,
            created_at:     record.created_at,
        }
    }

    // Getter メソッド

    pub fn id(&self) -> &BootcampId {
        &self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn name(&self) -> &BootcampName {
        &self.name
    }

    pub fn slug(&self) -> &Slug {
        &self.slug
    }

    pub fn description(&self) -> &Description {
        &self.description
    }

    pub fn website(&self) -> Option<&Website> {
        self.website.as_ref()
    }

    pub fn phone(&self) -> Option<&Phone> {
        self.phone.as_ref()
    }

    pub fn email(&self) -> Option<&Email> {
        self.email.as_ref()
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    pub fn careers(&self) -> &Careers {
        &self.careers
    }

    pub fn housing(&self) -> bool {
        self.housing
    }

    pub fn job_assistance(&self) -> bool {
        self.job_assistance
    }

    pub fn job_guarantee(&self) -> bool {
        self.job_guarantee
    }

    pub fn accept_gi(&self) -> bool {
        self.accept_gi
    }

    pub fn average_rating(&self) -> Option<f64> {
        self.average_rating
    }

    pub fn average_cost(&self) -> Option<i32> {
        self.average_cost
    }

    pub fn photo(&self) -> &str {
        &self.photo
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// 概要を返す
    pub fn summary(&self) -> BootcampSummary {
        BootcampSummary {
            id:          self.id.clone(),
            name:        self.name.as_str().to_string(),
            description: self.description.as_str().to_string(),
        }
    }

    /// 写真のファイル名（`photo_{id}{ext}`）を返す
    ///
    /// `extension` は `.jpg` のようにドットを含む拡張子、または空文字列。
    pub fn photo_file_name(&self, extension: &str) -> String {
        format!("photo_{}{extension}", self.id)
    }

    /// 変更内容が住所を変えるかどうか
    pub fn changes_address(&self, changes: &BootcampChanges) -> bool {
        changes
            .address
            .as_ref()
            .is_some_and(|address| address != &self.address)
    }

    // ビジネスロジックメソッド

    /// 部分更新を適用した新しいインスタンスを返す
    ///
    /// 名前が変わった場合はスラッグも再導出する。
    /// `location` が `Some` の場合は所在地を置き換える。
    pub fn apply(self, changes: BootcampChanges, location: Option<Location>) -> Self {
        let name = changes.name.unwrap_or(self.name);
        Self {
            slug: Slug::from_name(&name),
            name,
            description: changes.description.unwrap_or(self.description),
            website: changes.website.or(self.website),
            phone: changes.phone.or(self.phone),
            email: changes.email.or(self.email),
            address: changes.address.unwrap_or(self.address),
            location: location.or(self.location),
            careers: changes.careers.unwrap_or(self.careers),
            housing: changes.housing.unwrap_or(self.housing),
            job_assistance: changes.job_assistance.unwrap_or(self.job_assistance),
            job_guarantee: changes.job_guarantee.unwrap_or(self.job_guarantee),
            accept_gi: changes.accept_gi.unwrap_or(self.accept_gi),
            ..self
        }
    }

    /// 写真ファイル名を設定した新しいインスタンスを返す
    pub fn with_photo(self, photo: impl Into<String>) -> Self {
        Self {
            photo: photo.into(),
            ..self
        }
    }

    pub fn with_average_rating(self, average_rating: Option<f64>) -> Self {
        Self {
            average_rating,
            ..self
        }
    }

    pub fn with_average_cost(self, average_cost: Option<i32>) -> Self {
        Self {
            average_cost,
            ..self
        }
    }
}
