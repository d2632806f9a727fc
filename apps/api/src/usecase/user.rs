//! ユーザー管理ユースケース（admin 専用）
//!
//! ユーザーを削除すると、DB の連鎖削除でそのユーザーのコース・レビューも消える。
//! 影響を受けたブートキャンプの平均値は削除後に再計算する。

use std::sync::Arc;

use devcamper_domain::{
    clock::Clock,
    list_query::{ListQuery, Page},
    ownership::{Requester, ensure_role},
    password::PlainPassword,
    user::{Email, NewUser, User, UserId, UserName, UserRole},
};
use devcamper_infra::{
    PasswordHasher,
    repository::{BootcampRepository, CourseRepository, ReviewRepository, UserRepository},
};

use super::helpers::{
    FindResultExt,
    parse_optional,
    refresh_average_cost,
    refresh_average_rating,
};
use crate::error::ApiError;

const ADMIN_ONLY: &[UserRole] = &[UserRole::Admin];

/// ユーザー作成の入力
#[derive(Debug, Default)]
pub struct CreateUserInput {
    pub name:     String,
    pub email:    String,
    pub password: String,
    /// 未指定は `user`
    pub role:     Option<String>,
}

/// ユーザー更新の入力（`None` は変更なし）
#[derive(Debug, Default)]
pub struct UpdateUserInput {
    pub name:  Option<String>,
    pub email: Option<String>,
    pub role:  Option<String>,
}

/// ユーザー管理ユースケース
pub struct UserUseCaseImpl {
    user_repository:     Arc<dyn UserRepository>,
    bootcamp_repository: Arc<dyn BootcampRepository>,
    course_repository:   Arc<dyn CourseRepository>,
    review_repository:   Arc<dyn ReviewRepository>,
    password_hasher:     Arc<dyn PasswordHasher>,
    clock:               Arc<dyn Clock>,
}

impl UserUseCaseImpl {
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        bootcamp_repository: Arc<dyn BootcampRepository>,
        course_repository: Arc<dyn CourseRepository>,
        review_repository: Arc<dyn ReviewRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            user_repository,
            bootcamp_repository,
            course_repository,
            review_repository,
            password_hasher,
            clock,
        }
    }

    pub async fn list(
        &self,
        requester: &Requester,
        query: &ListQuery,
    ) -> Result<Page<User>, ApiError> {
        ensure_role(requester, ADMIN_ONLY)?;
        Ok(self.user_repository.list(query).await?)
    }

    pub async fn get(&self, requester: &Requester, id: &UserId) -> Result<User, ApiError> {
        ensure_role(requester, ADMIN_ONLY)?;
        self.find(id).await
    }

    /// ユーザーを作成する（admin は任意のロールを指定できる）
    pub async fn create(
        &self,
        requester: &Requester,
        input: CreateUserInput,
    ) -> Result<User, ApiError> {
        ensure_role(requester, ADMIN_ONLY)?;

        let role = match input.role.as_deref() {
            Some(role) => UserRole::parse(role)?,
            None => UserRole::User,
        };
        let password = PlainPassword::new_validated(input.password)?;

        let user = User::new(NewUser {
            name: UserName::new(input.name)?,
            email: Email::new(input.email)?,
            role,
            password_hash: self.password_hasher.hash(&password)?,
            now: self.clock.now(),
        });

        self.user_repository.insert(&user).await?;

        tracing::info!(user_id = %user.id(), role = %user.role(), "ユーザーを作成しました");
        Ok(user)
    }

    pub async fn update(
        &self,
        requester: &Requester,
        id: &UserId,
        input: UpdateUserInput,
    ) -> Result<User, ApiError> {
        ensure_role(requester, ADMIN_ONLY)?;

        let user = self.find(id).await?;
        let name = parse_optional(input.name, UserName::new)?;
        let email = parse_optional(input.email, Email::new)?;
        let role = input.role.as_deref().map(UserRole::parse).transpose()?;

        let mut updated = user.with_details(name, email);
        if let Some(role) = role {
            updated = updated.with_role(role);
        }

        self.user_repository.update(&updated).await?;
        Ok(updated)
    }

    pub async fn delete(&self, requester: &Requester, id: &UserId) -> Result<(), ApiError> {
        ensure_role(requester, ADMIN_ONLY)?;

        self.find(id).await?;
        let taught = self.course_repository.bootcamp_ids_by_user(id).await?;
        let reviewed = self.review_repository.bootcamp_ids_by_user(id).await?;

        self.user_repository.delete(id).await?;

        for bootcamp_id in &taught {
            refresh_average_cost(
                self.course_repository.as_ref(),
                self.bootcamp_repository.as_ref(),
                bootcamp_id,
            )
            .await?;
        }
        for bootcamp_id in &reviewed {
            refresh_average_rating(
                self.review_repository.as_ref(),
                self.bootcamp_repository.as_ref(),
                bootcamp_id,
            )
            .await?;
        }

        tracing::info!(user_id = %id, "ユーザーを削除しました");
        Ok(())
    }

    async fn find(&self, id: &UserId) -> Result<User, ApiError> {
        self.user_repository
            .find_by_id(id)
            .await
            .or_not_found("User", id)
    }
}

#[cfg(test)]
mod tests {
    use devcamper_infra::mock::{
        MockBootcampRepository,
        MockCourseRepository,
        MockPasswordHasher,
        MockReviewRepository,
        MockUserRepository,
    };
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::test_utils::{
        create_bootcamp,
        create_course,
        create_review,
        create_user,
        fixed_clock,
        requester,
    };

    struct Sut {
        usecase:   UserUseCaseImpl,
        users:     MockUserRepository,
        bootcamps: MockBootcampRepository,
        courses:   MockCourseRepository,
        reviews:   MockReviewRepository,
    }

    fn sut_with_dependents() -> Sut {
        let bootcamps = MockBootcampRepository::new();
        let courses = MockCourseRepository::new(bootcamps.clone());
        let reviews = MockReviewRepository::new(bootcamps.clone());
        let users =
            MockUserRepository::with_cascade(bootcamps.clone(), courses.clone(), reviews.clone());
        let usecase = UserUseCaseImpl::new(
            Arc::new(users.clone()),
            Arc::new(bootcamps.clone()),
            Arc::new(courses.clone()),
            Arc::new(reviews.clone()),
            Arc::new(MockPasswordHasher),
            Arc::new(fixed_clock()),
        );
        Sut {
            usecase,
            users,
            bootcamps,
            courses,
            reviews,
        }
    }

    fn sut() -> (UserUseCaseImpl, MockUserRepository) {
        let Sut { usecase, users, .. } = sut_with_dependents();
        (usecase, users)
    }

    fn input(email: &str, role: Option<&str>) -> CreateUserInput {
        CreateUserInput {
            name:     "Kevin Smith".to_string(),
            email:    email.to_string(),
            password: "123456".to_string(),
            role:     role.map(str::to_string),
        }
    }

    #[rstest]
    #[case(UserRole::User)]
    #[case(UserRole::Publisher)]
    #[tokio::test]
    async fn test_admin以外は403(#[case] role: UserRole) {
        let (usecase, _) = sut();

        let err = usecase
            .get(&requester(role), &UserId::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_adminはadminロールのユーザーを作成できる() {
        let (usecase, users) = sut();

        let user = usecase
            .create(&requester(UserRole::Admin), input("kevin@gmail.com", Some("admin")))
            .await
            .unwrap();

        assert_eq!(user.role(), UserRole::Admin);
        assert_eq!(user.password_hash(), &MockPasswordHasher::hash_of("123456"));
        assert_eq!(users.get(user.id()), Some(user));
    }

    #[tokio::test]
    async fn test_メールアドレスの重複は一意制約違反() {
        let (usecase, users) = sut();
        users.add_user(create_user(UserRole::User, "kevin@gmail.com"));

        let err = usecase
            .create(&requester(UserRole::Admin), input("kevin@gmail.com", None))
            .await
            .unwrap_err();

        assert!(matches!(&err, ApiError::Infra(e) if e.is_duplicate()));
    }

    #[tokio::test]
    async fn test_短いパスワードは400() {
        let (usecase, _) = sut();

        let err = usecase
            .create(
                &requester(UserRole::Admin),
                CreateUserInput {
                    password: "123".to_string(),
                    ..input("kevin@gmail.com", None)
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_名前とロールを更新できる() {
        let (usecase, users) = sut();
        let user = create_user(UserRole::User, "john@gmail.com");
        users.add_user(user.clone());

        let updated = usecase
            .update(
                &requester(UserRole::Admin),
                user.id(),
                UpdateUserInput {
                    name: Some("Jane Doe".to_string()),
                    role: Some("publisher".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name().as_str(), "Jane Doe");
        assert_eq!(updated.role(), UserRole::Publisher);
        assert_eq!(updated.email().as_str(), "john@gmail.com");
    }

    #[tokio::test]
    async fn test_存在しないユーザーの削除は404() {
        let (usecase, _) = sut();

        let err = usecase
            .delete(&requester(UserRole::Admin), &UserId::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_ユーザー削除後に残ったレビューで平均評価を再計算する() {
        let sut = sut_with_dependents();
        let owner = create_user(UserRole::Publisher, "owner@gmail.com");
        let leaving = create_user(UserRole::User, "leaving@gmail.com");
        let staying = create_user(UserRole::User, "staying@gmail.com");
        for user in [&owner, &leaving, &staying] {
            sut.users.add_user(user.clone());
        }
        let bootcamp =
            create_bootcamp(owner.id(), "Devworks Bootcamp").with_average_rating(Some(6.0));
        sut.bootcamps.add_bootcamp(bootcamp.clone());
        sut.reviews.add_review(create_review(bootcamp.id(), leaving.id(), 2));
        sut.reviews.add_review(create_review(bootcamp.id(), staying.id(), 10));

        sut.usecase
            .delete(&requester(UserRole::Admin), leaving.id())
            .await
            .unwrap();

        let stored = sut.bootcamps.get(bootcamp.id()).unwrap();
        assert_eq!(stored.average_rating(), Some(10.0));
        assert!(sut.users.get(leaving.id()).is_none());
    }

    #[tokio::test]
    async fn test_ユーザー削除後に残ったコースで平均費用を再計算する() {
        let sut = sut_with_dependents();
        let owner = create_user(UserRole::Publisher, "owner@gmail.com");
        let instructor = create_user(UserRole::Publisher, "instructor@gmail.com");
        sut.users.add_user(owner.clone());
        sut.users.add_user(instructor.clone());
        let bootcamp =
            create_bootcamp(owner.id(), "Devworks Bootcamp").with_average_cost(Some(9000));
        sut.bootcamps.add_bootcamp(bootcamp.clone());
        let kept = create_course(bootcamp.id(), owner.id(), 8000);
        let removed = create_course(bootcamp.id(), instructor.id(), 10000);
        sut.courses.add_course(kept.clone());
        sut.courses.add_course(removed.clone());

        sut.usecase
            .delete(&requester(UserRole::Admin), instructor.id())
            .await
            .unwrap();

        assert!(sut.courses.get(removed.id()).is_none());
        assert!(sut.courses.get(kept.id()).is_some());
        assert_eq!(sut.bootcamps.get(bootcamp.id()).unwrap().average_cost(), Some(8000));
    }

    #[tokio::test]
    async fn test_所有者を削除するとブートキャンプごと消える() {
        let sut = sut_with_dependents();
        let owner = create_user(UserRole::Publisher, "owner@gmail.com");
        let reviewer = create_user(UserRole::User, "reviewer@gmail.com");
        sut.users.add_user(owner.clone());
        sut.users.add_user(reviewer.clone());
        let bootcamp = create_bootcamp(owner.id(), "Devworks Bootcamp");
        sut.bootcamps.add_bootcamp(bootcamp.clone());
        let review = create_review(bootcamp.id(), reviewer.id(), 7);
        sut.reviews.add_review(review.clone());

        sut.usecase
            .delete(&requester(UserRole::Admin), owner.id())
            .await
            .unwrap();

        assert!(sut.bootcamps.get(bootcamp.id()).is_none());
        assert!(sut.reviews.get(review.id()).is_none());
    }
}
