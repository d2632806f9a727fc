//! コースユースケース
//!
//! コースの書き込み後は、所属するブートキャンプの平均費用を再計算する。

use std::sync::Arc;

use devcamper_domain::{
    bootcamp::{BootcampId, BootcampSummary},
    clock::Clock,
    course::{
        Course,
        CourseChanges,
        CourseDescription,
        CourseId,
        CourseTitle,
        MinimumSkill,
        NewCourse,
        Tuition,
        Weeks,
    },
    list_query::{ListQuery, Page},
    ownership::{Requester, ensure_owner_or_admin, ensure_role},
    user::UserRole,
};
use devcamper_infra::repository::{BootcampRepository, CourseRepository};

use super::helpers::{FindResultExt, parse_optional, refresh_average_cost};
use crate::error::ApiError;

const PUBLISHING_ROLES: &[UserRole] = &[UserRole::Publisher, UserRole::Admin];

/// コース作成の入力
#[derive(Debug, Default)]
pub struct CreateCourseInput {
    pub title:                 String,
    pub description:           String,
    pub weeks:                 i32,
    pub tuition:               i32,
    pub minimum_skill:         String,
    pub scholarship_available: bool,
}

/// コース更新の入力（`None` は変更なし）
#[derive(Debug, Default)]
pub struct UpdateCourseInput {
    pub title:                 Option<String>,
    pub description:           Option<String>,
    pub weeks:                 Option<i32>,
    pub tuition:               Option<i32>,
    pub minimum_skill:         Option<String>,
    pub scholarship_available: Option<bool>,
}

/// コースユースケース
pub struct CourseUseCaseImpl {
    course_repository:   Arc<dyn CourseRepository>,
    bootcamp_repository: Arc<dyn BootcampRepository>,
    clock:               Arc<dyn Clock>,
}

impl CourseUseCaseImpl {
    pub fn new(
        course_repository: Arc<dyn CourseRepository>,
        bootcamp_repository: Arc<dyn BootcampRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            course_repository,
            bootcamp_repository,
            clock,
        }
    }

    pub async fn list(
        &self,
        query: &ListQuery,
    ) -> Result<Page<(Course, BootcampSummary)>, ApiError> {
        Ok(self.course_repository.list(query).await?)
    }

    /// ブートキャンプ配下の全コースを取得する（ページングなし）
    pub async fn list_by_bootcamp(
        &self,
        bootcamp_id: &BootcampId,
    ) -> Result<(Vec<Course>, BootcampSummary), ApiError> {
        let bootcamp = self
            .bootcamp_repository
            .find_by_id(bootcamp_id)
            .await
            .or_not_found("Bootcamp", bootcamp_id)?;
        let courses = self.course_repository.find_by_bootcamp(bootcamp_id).await?;

        Ok((courses, bootcamp.summary()))
    }

    pub async fn get(&self, id: &CourseId) -> Result<(Course, BootcampSummary), ApiError> {
        let course = self.find(id).await?;
        let bootcamp = self
            .bootcamp_repository
            .find_by_id(course.bootcamp_id())
            .await
            .or_not_found("Bootcamp", course.bootcamp_id())?;

        Ok((course, bootcamp.summary()))
    }

    /// ブートキャンプにコースを追加する
    ///
    /// ブートキャンプの所有者（または admin）のみ追加できる。
    pub async fn create(
        &self,
        requester: &Requester,
        bootcamp_id: &BootcampId,
        input: CreateCourseInput,
    ) -> Result<Course, ApiError> {
        ensure_role(requester, PUBLISHING_ROLES)?;

        let bootcamp = self
            .bootcamp_repository
            .find_by_id(bootcamp_id)
            .await
            .or_not_found("Bootcamp", bootcamp_id)?;
        ensure_owner_or_admin(
            requester,
            bootcamp.user_id(),
            &format!("add a course to bootcamp {bootcamp_id}"),
        )?;

        let course = Course::new(NewCourse {
            bootcamp_id:           bootcamp_id.clone(),
            user_id:               requester.id().clone(),
            title:                 CourseTitle::new(input.title)?,
            description:           CourseDescription::new(input.description)?,
            weeks:                 Weeks::new(input.weeks)?,
            tuition:               Tuition::new(input.tuition)?,
            minimum_skill:         MinimumSkill::parse(&input.minimum_skill)?,
            scholarship_available: input.scholarship_available,
            now:                   self.clock.now(),
        });

        self.course_repository.insert(&course).await?;
        self.recompute_average_cost(bootcamp_id).await?;

        Ok(course)
    }

    pub async fn update(
        &self,
        requester: &Requester,
        id: &CourseId,
        input: UpdateCourseInput,
    ) -> Result<Course, ApiError> {
        let course = self.find(id).await?;
        ensure_owner_or_admin(requester, course.user_id(), &format!("update course {id}"))?;

        let changes = CourseChanges {
            title:                 parse_optional(input.title, CourseTitle::new)?,
            description:           parse_optional(input.description, CourseDescription::new)?,
            weeks:                 input.weeks.map(Weeks::new).transpose()?,
            tuition:               input.tuition.map(Tuition::new).transpose()?,
            minimum_skill:         input
                .minimum_skill
                .as_deref()
                .map(MinimumSkill::parse)
                .transpose()?,
            scholarship_available: input.scholarship_available,
        };

        let updated = course.apply(changes);
        self.course_repository.update(&updated).await?;
        self.recompute_average_cost(updated.bootcamp_id()).await?;

        Ok(updated)
    }

    pub async fn delete(&self, requester: &Requester, id: &CourseId) -> Result<(), ApiError> {
        let course = self.find(id).await?;
        ensure_owner_or_admin(requester, course.user_id(), &format!("delete course {id}"))?;

        self.course_repository.delete(id).await?;
        self.recompute_average_cost(course.bootcamp_id()).await?;

        Ok(())
    }

    async fn find(&self, id: &CourseId) -> Result<Course, ApiError> {
        self.course_repository
            .find_by_id(id)
            .await
            .or_not_found("Course", id)
    }

    async fn recompute_average_cost(&self, bootcamp_id: &BootcampId) -> Result<(), ApiError> {
        refresh_average_cost(
            self.course_repository.as_ref(),
            self.bootcamp_repository.as_ref(),
            bootcamp_id,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use devcamper_infra::mock::{MockBootcampRepository, MockCourseRepository};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_utils::{create_bootcamp, create_course, fixed_clock, requester};

    struct Sut {
        usecase:   CourseUseCaseImpl,
        bootcamps: MockBootcampRepository,
        courses:   MockCourseRepository,
    }

    fn sut() -> Sut {
        let bootcamps = MockBootcampRepository::new();
        let courses = MockCourseRepository::new(bootcamps.clone());
        let usecase = CourseUseCaseImpl::new(
            Arc::new(courses.clone()),
            Arc::new(bootcamps.clone()),
            Arc::new(fixed_clock()),
        );
        Sut {
            usecase,
            bootcamps,
            courses,
        }
    }

    fn input(tuition: i32) -> CreateCourseInput {
        CreateCourseInput {
            title: "Full Stack Web Development".to_string(),
            description: "Node, React and MongoDB".to_string(),
            weeks: 12,
            tuition,
            minimum_skill: "intermediate".to_string(),
            scholarship_available: true,
        }
    }

    #[tokio::test]
    async fn test_所有者はコースを追加でき平均費用が更新される() {
        let sut = sut();
        let owner = requester(UserRole::Publisher);
        let bootcamp = create_bootcamp(owner.id(), "Devworks Bootcamp");
        sut.bootcamps.add_bootcamp(bootcamp.clone());

        sut.usecase.create(&owner, bootcamp.id(), input(8000)).await.unwrap();
        sut.usecase.create(&owner, bootcamp.id(), input(10001)).await.unwrap();

        let stored = sut.bootcamps.get(bootcamp.id()).unwrap();
        assert_eq!(stored.average_cost(), Some(9010));
    }

    #[tokio::test]
    async fn test_存在しないブートキャンプへの追加は404() {
        let sut = sut();

        let err = sut
            .usecase
            .create(&requester(UserRole::Admin), &BootcampId::new(), input(8000))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::NotFound(msg) if msg.starts_with("Bootcamp not found")));
    }

    #[tokio::test]
    async fn test_他人のブートキャンプへの追加は403() {
        let sut = sut();
        let bootcamp = create_bootcamp(requester(UserRole::Publisher).id(), "Devworks Bootcamp");
        sut.bootcamps.add_bootcamp(bootcamp.clone());

        let err = sut
            .usecase
            .create(&requester(UserRole::Publisher), bootcamp.id(), input(8000))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Forbidden(_)));
        assert!(sut.courses.find_by_bootcamp(bootcamp.id()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_不正なスキルレベルは400() {
        let sut = sut();
        let owner = requester(UserRole::Publisher);
        let bootcamp = create_bootcamp(owner.id(), "Devworks Bootcamp");
        sut.bootcamps.add_bootcamp(bootcamp.clone());

        let err = sut
            .usecase
            .create(
                &owner,
                bootcamp.id(),
                CreateCourseInput {
                    minimum_skill: "expert".to_string(),
                    ..input(8000)
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_取得時にブートキャンプの概要を含む() {
        let sut = sut();
        let owner = requester(UserRole::Publisher);
        let bootcamp = create_bootcamp(owner.id(), "Devworks Bootcamp");
        let course = create_course(bootcamp.id(), owner.id(), 8000);
        sut.bootcamps.add_bootcamp(bootcamp.clone());
        sut.courses.add_course(course.clone());

        let (found, summary) = sut.usecase.get(course.id()).await.unwrap();

        assert_eq!(found, course);
        assert_eq!(summary, bootcamp.summary());
    }

    #[tokio::test]
    async fn test_所有者以外は更新できない() {
        let sut = sut();
        let owner = requester(UserRole::Publisher);
        let bootcamp = create_bootcamp(owner.id(), "Devworks Bootcamp");
        let course = create_course(bootcamp.id(), owner.id(), 8000);
        sut.bootcamps.add_bootcamp(bootcamp);
        sut.courses.add_course(course.clone());

        let err = sut
            .usecase
            .update(
                &requester(UserRole::Publisher),
                course.id(),
                UpdateCourseInput {
                    tuition: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Forbidden(_)));
        assert_eq!(sut.courses.get(course.id()), Some(course));
    }

    #[tokio::test]
    async fn test_更新で平均費用が再計算される() {
        let sut = sut();
        let owner = requester(UserRole::Publisher);
        let bootcamp = create_bootcamp(owner.id(), "Devworks Bootcamp");
        let course = create_course(bootcamp.id(), owner.id(), 8000);
        sut.bootcamps.add_bootcamp(bootcamp.clone());
        sut.courses.add_course(course.clone());

        let updated = sut
            .usecase
            .update(
                &owner,
                course.id(),
                UpdateCourseInput {
                    tuition: Some(12345),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.tuition().as_i32(), 12345);
        assert_eq!(sut.bootcamps.get(bootcamp.id()).unwrap().average_cost(), Some(12350));
    }

    #[tokio::test]
    async fn test_最後のコースを削除すると平均費用はなし() {
        let sut = sut();
        let owner = requester(UserRole::Publisher);
        let bootcamp = create_bootcamp(owner.id(), "Devworks Bootcamp");
        sut.bootcamps.add_bootcamp(bootcamp.clone());
        let course = sut.usecase.create(&owner, bootcamp.id(), input(8000)).await.unwrap();

        sut.usecase.delete(&owner, course.id()).await.unwrap();

        assert!(sut.courses.get(course.id()).is_none());
        assert_eq!(sut.bootcamps.get(bootcamp.id()).unwrap().average_cost(), None);
    }
}
