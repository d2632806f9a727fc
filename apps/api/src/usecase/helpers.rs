//! ユースケース層の共通ヘルパー
//!
//! リポジトリ呼び出し結果の変換など、複数のユースケースで繰り返されるパターンを共通化する。
//! ブートキャンプの平均値の再計算もここに置く（コース・レビュー・ユーザー削除から呼ばれる）。

use std::fmt::Display;

use devcamper_domain::{
    DomainError,
    bootcamp::BootcampId,
    course::{Course, Tuition, average_cost},
    review::{Rating, Review, average_rating},
};
use devcamper_infra::{
    InfraError,
    repository::{BootcampRepository, CourseRepository, ReviewRepository},
};

use crate::error::ApiError;

/// リポジトリの `Result<Option<T>, InfraError>` を `Result<T, ApiError>` に変換する
///
/// ```ignore
/// let bootcamp = self.bootcamp_repository.find_by_id(&id).await
///     .or_not_found("Bootcamp", &id)?;
/// ```
pub(crate) trait FindResultExt<T> {
    /// `None` の場合は `ApiError::NotFound`、`InfraError` はそのまま `ApiError::Infra` にする
    fn or_not_found(self, entity_type: &'static str, id: &dyn Display) -> Result<T, ApiError>;
}

impl<T> FindResultExt<T> for Result<Option<T>, InfraError> {
    fn or_not_found(self, entity_type: &'static str, id: &dyn Display) -> Result<T, ApiError> {
        self?.ok_or_else(|| {
            DomainError::NotFound {
                entity_type,
                id: id.to_string(),
            }
            .into()
        })
    }
}

/// 任意項目の文字列を値オブジェクトに変換する
pub(crate) fn parse_optional<T, F>(value: Option<String>, parse: F) -> Result<Option<T>, ApiError>
where
    F: FnOnce(String) -> Result<T, DomainError>,
{
    Ok(value.map(parse).transpose()?)
}

/// 残っているコースの受講料からブートキャンプの平均費用を更新する
#[tracing::instrument(skip_all, level = "debug", fields(%bootcamp_id))]
pub(crate) async fn refresh_average_cost(
    course_repository: &dyn CourseRepository,
    bootcamp_repository: &dyn BootcampRepository,
    bootcamp_id: &BootcampId,
) -> Result<(), ApiError> {
    let tuitions: Vec<Tuition> = course_repository
        .find_by_bootcamp(bootcamp_id)
        .await?
        .iter()
        .map(Course::tuition)
        .collect();
    let cost = average_cost(&tuitions);

    bootcamp_repository
        .update_average_cost(bootcamp_id, cost)
        .await?;

    tracing::debug!(average_cost = ?cost, "平均費用を更新しました");
    Ok(())
}

/// 残っているレビューの評価からブートキャンプの平均評価を更新する
#[tracing::instrument(skip_all, level = "debug", fields(%bootcamp_id))]
pub(crate) async fn refresh_average_rating(
    review_repository: &dyn ReviewRepository,
    bootcamp_repository: &dyn BootcampRepository,
    bootcamp_id: &BootcampId,
) -> Result<(), ApiError> {
    let ratings: Vec<Rating> = review_repository
        .find_by_bootcamp(bootcamp_id)
        .await?
        .iter()
        .map(Review::rating)
        .collect();
    let rating = average_rating(&ratings);

    bootcamp_repository
        .update_average_rating(bootcamp_id, rating)
        .await?;

    tracing::debug!(average_rating = ?rating, "平均評価を更新しました");
    Ok(())
}
