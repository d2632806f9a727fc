//! # レビュー
//!
//! ユーザーがブートキャンプに付けるレビュー。
//! 1 ユーザーにつき 1 ブートキャンプ 1 件まで（DB の一意制約で担保）。
//! 作成・更新・削除のたびに所属ブートキャンプの平均評価（[`average_rating`]）を再計算する。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DomainError, bootcamp::BootcampId, user::UserId};

define_uuid_id! {
    /// レビュー ID
    pub struct ReviewId => "Review";
}

define_validated_string! {
    /// レビュータイトル
    pub struct ReviewTitle {
        label: "title for the review",
        max_length: 100,
    }
}

define_validated_string! {
    /// レビュー本文
    pub struct ReviewText {
        label: "text",
        max_length: 2000,
    }
}

/// 評価（1〜10）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rating(i32);

impl Rating {
    pub const MIN: i32 = 1;
    pub const MAX: i32 = 10;

    pub fn new(value: i32) -> Result<Self, DomainError> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(DomainError::Validation(format!(
                "Please add a rating between {} and {}",
                Self::MIN,
                Self::MAX
            )));
        }
        Ok(Self(value))
    }

    pub fn as_i32(&self) -> i32 {
        self.0
    }
}

/// 評価の算術平均
///
/// レビューが 1 件もなければ `None`。
pub fn average_rating(ratings: &[Rating]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }

    let total: i64 = ratings.iter().map(|r| i64::from(r.as_i32())).sum();
    Some(total as f64 / ratings.len() as f64)
}

/// 新規レビューの作成パラメータ
pub struct NewReview {
    pub bootcamp_id: BootcampId,
    pub user_id:     UserId,
    pub title:       ReviewTitle,
    pub text:        ReviewText,
    pub rating:      Rating,
    pub now:         DateTime<Utc>,
}

/// 部分更新の内容
#[derive(Debug, Clone, Default)]
pub struct ReviewChanges {
    pub title:  Option<ReviewTitle>,
    pub text:   Option<ReviewText>,
    pub rating: Option<Rating>,
}

/// レビューエンティティ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    id:          ReviewId,
    bootcamp_id: BootcampId,
    user_id:     UserId,
    title:       ReviewTitle,
    text:        ReviewText,
    rating:      Rating,
    created_at:  DateTime<Utc>,
}

impl Review {
    pub fn new(params: NewReview) -> Self {
        Self {
            id:          ReviewId::new(),
            bootcamp_id: params.bootcamp_id,
            user_id:     params.user_id,
            title:       params.title,
            text:        params.text,
            rating:      params.rating,
            created_at:  params.now,
        }
    }

    /// データベースから復元する
    pub fn from_db(
        id: ReviewId,
        bootcamp_id: BootcampId,
        user_id: UserId,
        title: ReviewTitle,
        text: ReviewText,
        rating: Rating,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            bootcamp_id,
            user_id,
            title,
            text,
            rating,
            created_at,
        }
    }

    pub fn id(&self) -> &ReviewId {
        &self.id
    }

    pub fn bootcamp_id(&self) -> &BootcampId {
        &self.bootcamp_id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn title(&self) -> &ReviewTitle {
        &self.title
    }

    pub fn text(&self) -> &ReviewText {
        &self.text
    }

    pub fn rating(&self) -> Rating {
        self.rating
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// 部分更新を適用した新しいインスタンスを返す
    pub fn apply(self, changes: ReviewChanges) -> Self {
        Self {
            title: changes.title.unwrap_or(self.title),
            text: changes.text.unwrap_or(self.text),
            rating: changes.rating.unwrap_or(self.rating),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn ratings(values: &[i32]) -> Vec<Rating> {
        values.iter().map(|v| Rating::new(*v).unwrap()).collect()
    }

    #[rstest]
    #[case(&[], None)]
    #[case(&[8], Some(8.0))]
    #[case(&[8, 10], Some(9.0))]
    #[case(&[1, 2, 4], Some(7.0 / 3.0))]
    fn test_平均評価は算術平均(#[case] input: &[i32], #[case] expected: Option<f64>) {
        assert_eq!(average_rating(&ratings(input)), expected);
    }

    #[rstest]
    #[case(0, false)]
    #[case(1, true)]
    #[case(10, true)]
    #[case(11, false)]
    fn test_評価は1から10(#[case] value: i32, #[case] valid: bool) {
        assert_eq!(Rating::new(value).is_ok(), valid);
    }

    #[rstest]
    fn test_タイトルは100文字まで() {
        assert!(ReviewTitle::new("a".repeat(100)).is_ok());
        assert!(ReviewTitle::new("a".repeat(101)).is_err());
        assert!(matches!(
            ReviewTitle::new("   "),
            Err(DomainError::Validation(message)) if message == "Please add a title for the review"
        ));
    }

    #[rstest]
    fn test_部分更新は評価のみ変更できる() {
        let review = Review::new(NewReview {
            bootcamp_id: BootcampId::new(),
            user_id:     UserId::new(),
            title:       ReviewTitle::new("Learned a ton!").unwrap(),
            text:        ReviewText::new("Great bootcamp").unwrap(),
            rating:      Rating::new(8).unwrap(),
            now:         DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        });

        let sut = review.apply(ReviewChanges {
            rating: Some(Rating::new(3).unwrap()),
            ..Default::default()
        });

        assert_eq!(sut.rating().as_i32(), 3);
        assert_eq!(sut.title().as_str(), "Learned a ton!");
    }
}
