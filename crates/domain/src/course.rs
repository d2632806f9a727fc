//! # コース
//!
//! ブートキャンプに属するコース。作成・更新・削除のたびに
//! 所属ブートキャンプの平均費用（[`average_cost`]）を再計算する。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};

use crate::{DomainError, bootcamp::BootcampId, user::UserId};

define_uuid_id! {
    /// コース ID
    pub struct CourseId => "Course";
}

define_validated_string! {
    /// コースタイトル
    pub struct CourseTitle {
        label: "course title",
        max_length: 100,
    }
}

define_validated_string! {
    /// コースの説明
    pub struct CourseDescription {
        label: "description",
        max_length: 2000,
    }
}

/// 受講期間（週、1 以上）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weeks(i32);

impl Weeks {
    pub fn new(value: i32) -> Result<Self, DomainError> {
        if value < 1 {
            return Err(DomainError::Validation(
                "Please add number of weeks".to_string(),
            ));
        }
        Ok(Self(value))
    }

    pub fn as_i32(&self) -> i32 {
        self.0
    }
}

/// 受講料の上限（10 の倍数なので、切り上げた平均もこの値を超えない）
pub const MAX_TUITION: i32 = 1_000_000_000;

/// 受講料（0 以上 [`MAX_TUITION`] 以下）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tuition(i32);

impl Tuition {
    pub fn new(value: i32) -> Result<Self, DomainError> {
        if value < 0 {
            return Err(DomainError::Validation(
                "Please add a tuition cost".to_string(),
            ));
        }
        if value > MAX_TUITION {
            return Err(DomainError::Validation(format!(
                "Tuition can not be more than {MAX_TUITION}"
            )));
        }
        Ok(Self(value))
    }

    pub fn as_i32(&self) -> i32 {
        self.0
    }
}

/// 必要スキルレベル
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    IntoStaticStr,
    EnumString,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MinimumSkill {
    Beginner,
    Intermediate,
    Advanced,
}

impl MinimumSkill {
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        value.parse().map_err(|_| {
            DomainError::Validation(format!(
                "Minimum skill must be beginner, intermediate or advanced: {value}"
            ))
        })
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// 受講料の平均を 10 単位で切り上げる
///
/// コースが 1 件もなければ `None`。
pub fn average_cost(tuitions: &[Tuition]) -> Option<i32> {
    if tuitions.is_empty() {
        return None;
    }

    let total: i64 = tuitions.iter().map(|t| i64::from(t.as_i32())).sum();
    let step = i64::try_from(tuitions.len()).unwrap_or(i64::MAX).saturating_mul(10);
    let rounded = (total + step - 1) / step * 10;
    Some(i32::try_from(rounded).unwrap_or(MAX_TUITION))
}

/// 新規コースの作成パラメータ
pub struct NewCourse {
    pub bootcamp_id:           BootcampId,
    pub user_id:               UserId,
    pub title:                 CourseTitle,
    pub description:           CourseDescription,
    pub weeks:                 Weeks,
    pub tuition:               Tuition,
    pub minimum_skill:         MinimumSkill,
    pub scholarship_available: bool,
    pub now:                   DateTime<Utc>,
}

/// データベースから復元するための全フィールド
pub struct CourseRecord {
    pub id:                    CourseId,
    pub bootcamp_id:           BootcampId,
    pub user_id:               UserId,
    pub title:                 CourseTitle,
    pub description:           CourseDescription,
    pub weeks:                 Weeks,
    pub tuition:               Tuition,
    pub minimum_skill:         MinimumSkill,
    pub scholarship_available: bool,
    pub created_at:            DateTime<Utc>,
}

/// 部分更新の内容
#[derive(Debug, Clone, Default)]
pub struct CourseChanges {
    pub title:                 Option<CourseTitle>,
    pub description:           Option<CourseDescription>,
    pub weeks:                 Option<Weeks>,
    pub tuition:               Option<Tuition>,
    pub minimum_skill:         Option<MinimumSkill>,
    pub scholarship_available: Option<bool>,
}

/// コースエンティティ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    id:                    CourseId,
    bootcamp_id:           BootcampId,
    user_id:               UserId,
    title:                 CourseTitle,
    description:           CourseDescription,
    weeks:                 Weeks,
    tuition:               Tuition,
    minimum_skill:         MinimumSkill,
    scholarship_available: bool,
    created_at:            DateTime<Utc>,
}

impl Course {
    pub fn new(params: NewCourse) -> Self {
        Self {
            id:                    CourseId::new(),
            bootcamp_id:           params.bootcamp_id,
            user_id:               params.user_id,
            title:                 params.title,
            description:           params.description,
            weeks:                 params.weeks,
            tuition:               params.tuition,
            minimum_skill:         params.minimum_skill,
            scholarship_available: params.scholarship_available,
            created_at:            params.now,
        }
    }

    pub fn from_db(record: CourseRecord) -> Self {
        Self {
            id:                    record.id,
            bootcamp_id:           record.bootcamp_id,
            user_id:               record.user_id,
            title:                 record.title,
            description:           record.description,
            weeks:                 record.weeks,
            tuition:               record.tuition,
            minimum_skill:         record.minimum_skill,
            scholarship_available: record.scholarship_available,
            created_at:            record.created_at,
        }
    }

    pub fn id(&self) -> &CourseId {
        &self.id
    }

    pub fn bootcamp_id(&self) -> &BootcampId {
        &self.bootcamp_id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn title(&self) -> &CourseTitle {
        &self.title
    }

    pub fn description(&self) -> &CourseDescription {
        &self.description
    }

    pub fn weeks(&self) -> Weeks {
        self.weeks
    }

    pub fn tuition(&self) -> Tuition {
        self.tuition
    }

    pub fn minimum_skill(&self) -> MinimumSkill {
        self.minimum_skill
    }

    pub fn scholarship_available(&self) -> bool {
        self.scholarship_available
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// 部分更新を適用した新しいインスタンスを返す
    pub fn apply(self, changes: CourseChanges) -> Self {
        Self {
            title: changes.title.unwrap_or(self.title),
            description: changes.description.unwrap_or(self.description),
            weeks: changes.weeks.unwrap_or(self.weeks),
            tuition: changes.tuition.unwrap_or(self.tuition),
            minimum_skill: changes.minimum_skill.unwrap_or(self.minimum_skill),
            scholarship_available: changes
                .scholarship_available
                .unwrap_or(self.scholarship_available),
            ..self
        }
    }
}
