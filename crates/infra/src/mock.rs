//! # テスト用モック
//!
//! ユースケース・ハンドラのテストで使用するインメモリ実装。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! devcamper-infra = { workspace = true, features = ["test-utils"] }
//! ```
//!
//! 一覧取得はフィルタを評価せず、作成日時の降順でページングのみ行う。
//! 一意制約（メールアドレス、ブートキャンプ名、ユーザーごとのレビュー）は再現する。

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use devcamper_domain::{
    bootcamp::{Bootcamp, BootcampId, BootcampSummary},
    course::{Course, CourseId},
    geo::{GeoPoint, Location},
    list_query::{ListQuery, Page},
    notification::{EmailMessage, NotificationError},
    password::{PasswordHash, PasswordVerifyResult, PlainPassword},
    review::{Review, ReviewId},
    user::{Email, User, UserId},
};
use uuid::Uuid;

use crate::{
    error::InfraError,
    geocoder::Geocoder,
    notification::NotificationSender,
    password::PasswordHasher,
    repository::{BootcampRepository, CourseRepository, ReviewRepository, UserRepository},
    session::{SessionData, SessionManager},
    storage::PhotoStorage,
};

/// 作成日時の降順に並べて 1 ページ分を切り出す
fn paginate<T: Clone>(
    items: &[T],
    created_at: impl Fn(&T) -> chrono::DateTime<chrono::Utc>,
    query: &ListQuery,
) -> Page<T> {
    let mut sorted = items.to_vec();
    sorted.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
    let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
    let rows = sorted
        .into_iter()
        .skip(offset)
        .take(query.limit as usize + 1)
        .collect();
    Page::from_overfetch(rows, query.limit)
}

fn upsert<T>(items: &mut [T], item: &T, same: impl Fn(&T) -> bool)
where
    T: Clone,
{
    if let Some(slot) = items.iter_mut().find(|i| same(i)) {
        *slot = item.clone();
    }
}

// ===== MockUserRepository =====

#[derive(Clone, Default)]
pub struct MockUserRepository {
    users:   Arc<Mutex<Vec<User>>>,
    cascade: Option<Dependents>,
}

/// ユーザー削除で連鎖削除される行を持つリポジトリ
#[derive(Clone)]
struct Dependents {
    bootcamps: MockBootcampRepository,
    courses:   MockCourseRepository,
    reviews:   MockReviewRepository,
}

impl MockUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 削除時に所有するブートキャンプ・コース・レビューも消す（`ON DELETE CASCADE` 相当）
    pub fn with_cascade(
        bootcamps: MockBootcampRepository,
        courses: MockCourseRepository,
        reviews: MockReviewRepository,
    ) -> Self {
        Self {
            users:   Arc::default(),
            cascade: Some(Dependents {
                bootcamps,
                courses,
                reviews,
            }),
        }
    }

    pub fn add_user(&self, user: User) {
        self.users.lock().unwrap().push(user);
    }

    pub fn get(&self, id: &UserId) -> Option<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id() == id)
            .cloned()
    }
}

#[async_trait]
impl UserRepository for MockUserRepository {
    async fn list(&self, query: &ListQuery) -> Result<Page<User>, InfraError> {
        Ok(paginate(&self.users.lock().unwrap(), User::created_at, query))
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, InfraError> {
        Ok(self.get(id))
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, InfraError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email() == email)
            .cloned())
    }

    async fn find_by_reset_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<User>, InfraError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| {
                u.password_reset()
                    .is_some_and(|r| r.token_hash() == token_hash)
            })
            .cloned())
    }

    async fn insert(&self, user: &User) -> Result<(), InfraError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email() == user.email()) {
            return Err(InfraError::duplicate("users_email_key"));
        }
        users.push(user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<(), InfraError> {
        let mut users = self.users.lock().unwrap();
        if users
            .iter()
            .any(|u| u.id() != user.id() && u.email() == user.email())
        {
            return Err(InfraError::duplicate("users_email_key"));
        }
        upsert(&mut users, user, |u| u.id() == user.id());
        Ok(())
    }

    async fn delete(&self, id: &UserId) -> Result<(), InfraError> {
        self.users.lock().unwrap().retain(|u| u.id() != id);

        if let Some(dependents) = &self.cascade {
            let mut bootcamps = dependents.bootcamps.bootcamps.lock().unwrap();
            let owned: Vec<BootcampId> = bootcamps
                .iter()
                .filter(|b| b.user_id() == id)
                .map(|b| b.id().clone())
                .collect();
            bootcamps.retain(|b| b.user_id() != id);

            dependents
                .courses
                .courses
                .lock()
                .unwrap()
                .retain(|c| c.user_id() != id && !owned.contains(c.bootcamp_id()));
            dependents
                .reviews
                .reviews
                .lock()
                .unwrap()
                .retain(|r| r.user_id() != id && !owned.contains(r.bootcamp_id()));
        }
        Ok(())
    }
}

// ===== MockBootcampRepository =====

#[derive(Clone, Default)]
pub struct MockBootcampRepository {
    bootcamps: Arc<Mutex<Vec<Bootcamp>>>,
}

impl MockBootcampRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bootcamp(&self, bootcamp: Bootcamp) {
        self.bootcamps.lock().unwrap().push(bootcamp);
    }

    pub fn get(&self, id: &BootcampId) -> Option<Bootcamp> {
        self.bootcamps
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.id() == id)
            .cloned()
    }

    fn summary(&self, id: &BootcampId) -> BootcampSummary {
        self.get(id).map(|b| b.summary()).unwrap_or(BootcampSummary {
            id:          id.clone(),
            name:        String::new(),
            description: String::new(),
        })
    }

    fn set<F>(&self, id: &BootcampId, f: F)
    where
        F: FnOnce(Bootcamp) -> Bootcamp,
    {
        let mut bootcamps = self.bootcamps.lock().unwrap();
        if let Some(slot) = bootcamps.iter_mut().find(|b| b.id() == id) {
            *slot = f(slot.clone());
        }
    }
}

#[async_trait]
impl BootcampRepository for MockBootcampRepository {
    async fn list(&self, query: &ListQuery) -> Result<Page<Bootcamp>, InfraError> {
        Ok(paginate(
            &self.bootcamps.lock().unwrap(),
            Bootcamp::created_at,
            query,
        ))
    }

    async fn find_by_id(&self, id: &BootcampId) -> Result<Option<Bootcamp>, InfraError> {
        Ok(self.get(id))
    }

    async fn find_within_radius(
        &self,
        center: &GeoPoint,
        radius: f64,
    ) -> Result<Vec<Bootcamp>, InfraError> {
        Ok(self
            .bootcamps
            .lock()
            .unwrap()
            .iter()
            .filter(|b| {
                b.location()
                    .is_some_and(|l| center.is_within(&l.point, radius))
            })
            .cloned()
            .collect())
    }

    async fn count_by_user(&self, user_id: &UserId) -> Result<i64, InfraError> {
        let count = self
            .bootcamps
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.user_id() == user_id)
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn insert(&self, bootcamp: &Bootcamp) -> Result<(), InfraError> {
        let mut bootcamps = self.bootcamps.lock().unwrap();
        if bootcamps.iter().any(|b| b.name() == bootcamp.name()) {
            return Err(InfraError::duplicate("bootcamps_name_key"));
        }
        bootcamps.push(bootcamp.clone());
        Ok(())
    }

    async fn update(&self, bootcamp: &Bootcamp) -> Result<(), InfraError> {
        let mut bootcamps = self.bootcamps.lock().unwrap();
        if bootcamps
            .iter()
            .any(|b| b.id() != bootcamp.id() && b.name() == bootcamp.name())
        {
            return Err(InfraError::duplicate("bootcamps_name_key"));
        }
        // 集計値は専用メソッドでのみ更新する
        let Some(current) = bootcamps.iter().find(|b| b.id() == bootcamp.id()) else {
            return Ok(());
        };
        let updated = bootcamp
            .clone()
            .with_average_rating(current.average_rating())
            .with_average_cost(current.average_cost());
        upsert(&mut bootcamps, &updated, |b| b.id() == bootcamp.id());
        Ok(())
    }

    async fn update_average_rating(
        &self,
        id: &BootcampId,
        average_rating: Option<f64>,
    ) -> Result<(), InfraError> {
        self.set(id, |b| b.with_average_rating(average_rating));
        Ok(())
    }

    async fn update_average_cost(
        &self,
        id: &BootcampId,
        average_cost: Option<i32>,
    ) -> Result<(), InfraError> {
        self.set(id, |b| b.with_average_cost(average_cost));
        Ok(())
    }

    async fn delete(&self, id: &BootcampId) -> Result<(), InfraError> {
        self.bootcamps.lock().unwrap().retain(|b| b.id() != id);
        Ok(())
    }
}

// ===== MockCourseRepository =====

/// ブートキャンプの概要を結合するため、[`MockBootcampRepository`] を共有する
#[derive(Clone, Default)]
pub struct MockCourseRepository {
    courses:   Arc<Mutex<Vec<Course>>>,
    bootcamps: MockBootcampRepository,
}

impl MockCourseRepository {
    pub fn new(bootcamps: MockBootcampRepository) -> Self {
        Self {
            courses: Arc::default(),
            bootcamps,
        }
    }

    pub fn add_course(&self, course: Course) {
        self.courses.lock().unwrap().push(course);
    }

    pub fn get(&self, id: &CourseId) -> Option<Course> {
        self.courses
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id() == id)
            .cloned()
    }
}

#[async_trait]
impl CourseRepository for MockCourseRepository {
    async fn list(
        &self,
        query: &ListQuery,
    ) -> Result<Page<(Course, BootcampSummary)>, InfraError> {
        let page = paginate(&self.courses.lock().unwrap(), Course::created_at, query);
        Ok(page.map(|c| {
            let summary = self.bootcamps.summary(c.bootcamp_id());
            (c, summary)
        }))
    }

    async fn find_by_bootcamp(&self, bootcamp_id: &BootcampId) -> Result<Vec<Course>, InfraError> {
        Ok(self
            .courses
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.bootcamp_id() == bootcamp_id)
            .cloned()
            .collect())
    }

    async fn bootcamp_ids_by_user(&self, user_id: &UserId) -> Result<Vec<BootcampId>, InfraError> {
        let mut ids: Vec<BootcampId> = Vec::new();
        for c in self.courses.lock().unwrap().iter().filter(|c| c.user_id() == user_id) {
            if !ids.contains(c.bootcamp_id()) {
                ids.push(c.bootcamp_id().clone());
            }
        }
        Ok(ids)
    }

    async fn find_by_id(&self, id: &CourseId) -> Result<Option<Course>, InfraError> {
        Ok(self.get(id))
    }

    async fn insert(&self, course: &Course) -> Result<(), InfraError> {
        self.courses.lock().unwrap().push(course.clone());
        Ok(())
    }

    async fn update(&self, course: &Course) -> Result<(), InfraError> {
        upsert(&mut self.courses.lock().unwrap(), course, |c| {
            c.id() == course.id()
        });
        Ok(())
    }

    async fn delete(&self, id: &CourseId) -> Result<(), InfraError> {
        self.courses.lock().unwrap().retain(|c| c.id() != id);
        Ok(())
    }
}

// ===== MockReviewRepository =====

/// ブートキャンプの概要を結合するため、[`MockBootcampRepository`] を共有する
#[derive(Clone, Default)]
pub struct MockReviewRepository {
    reviews:   Arc<Mutex<Vec<Review>>>,
    bootcamps: MockBootcampRepository,
}

impl MockReviewRepository {
    pub fn new(bootcamps: MockBootcampRepository) -> Self {
        Self {
            reviews: Arc::default(),
            bootcamps,
        }
    }

    pub fn add_review(&self, review: Review) {
        self.reviews.lock().unwrap().push(review);
    }

    pub fn get(&self, id: &ReviewId) -> Option<Review> {
        self.reviews
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id() == id)
            .cloned()
    }
}

#[async_trait]
impl ReviewRepository for MockReviewRepository {
    async fn list(
        &self,
        query: &ListQuery,
    ) -> Result<Page<(Review, BootcampSummary)>, InfraError> {
        let page = paginate(&self.reviews.lock().unwrap(), Review::created_at, query);
        Ok(page.map(|r| {
            let summary = self.bootcamps.summary(r.bootcamp_id());
            (r, summary)
        }))
    }

    async fn find_by_bootcamp(&self, bootcamp_id: &BootcampId) -> Result<Vec<Review>, InfraError> {
        Ok(self
            .reviews
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.bootcamp_id() == bootcamp_id)
            .cloned()
            .collect())
    }

    async fn bootcamp_ids_by_user(&self, user_id: &UserId) -> Result<Vec<BootcampId>, InfraError> {
        let mut ids: Vec<BootcampId> = Vec::new();
        for r in self.reviews.lock().unwrap().iter().filter(|r| r.user_id() == user_id) {
            if !ids.contains(r.bootcamp_id()) {
                ids.push(r.bootcamp_id().clone());
            }
        }
        Ok(ids)
    }

    async fn find_by_id(&self, id: &ReviewId) -> Result<Option<Review>, InfraError> {
        Ok(self.get(id))
    }

    async fn insert(&self, review: &Review) -> Result<(), InfraError> {
        let mut reviews = self.reviews.lock().unwrap();
        if reviews
            .iter()
            .any(|r| r.bootcamp_id() == review.bootcamp_id() && r.user_id() == review.user_id())
        {
            return Err(InfraError::duplicate("reviews_bootcamp_id_user_id_key"));
        }
        reviews.push(review.clone());
        Ok(())
    }

    async fn update(&self, review: &Review) -> Result<(), InfraError> {
        upsert(&mut self.reviews.lock().unwrap(), review, |r| {
            r.id() == review.id()
        });
        Ok(())
    }

    async fn delete(&self, id: &ReviewId) -> Result<(), InfraError> {
        self.reviews.lock().unwrap().retain(|r| r.id() != id);
        Ok(())
    }
}

// ===== MockSessionManager =====

#[derive(Clone, Default)]
pub struct MockSessionManager {
    sessions: Arc<Mutex<Vec<(String, SessionData)>>>,
}

impl MockSessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 既知のトークンでセッションを登録する
    pub fn add_session(&self, token: impl Into<String>, data: SessionData) {
        self.sessions.lock().unwrap().push((token.into(), data));
    }

    pub fn contains(&self, token: &str) -> bool {
        self.sessions.lock().unwrap().iter().any(|(t, _)| t == token)
    }
}

#[async_trait]
impl SessionManager for MockSessionManager {
    async fn create(&self, data: &SessionData) -> Result<String, InfraError> {
        let token = Uuid::new_v4().to_string();
        self.add_session(token.clone(), data.clone());
        Ok(token)
    }

    async fn get(&self, token: &str) -> Result<Option<SessionData>, InfraError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, d)| d.clone()))
    }

    async fn delete(&self, token: &str) -> Result<(), InfraError> {
        self.sessions.lock().unwrap().retain(|(t, _)| t != token);
        Ok(())
    }

    async fn ping(&self) -> Result<(), InfraError> {
        Ok(())
    }
}

// ===== MockPasswordHasher =====

/// 平文に接頭辞を付けるだけのハッシュ（Argon2 の計算コストを避ける）
#[derive(Clone, Default)]
pub struct MockPasswordHasher;

impl MockPasswordHasher {
    pub fn hash_of(password: &str) -> PasswordHash {
        PasswordHash::new(format!("mock${password}"))
    }
}

impl PasswordHasher for MockPasswordHasher {
    fn hash(&self, password: &PlainPassword) -> Result<PasswordHash, InfraError> {
        Ok(Self::hash_of(password.as_str()))
    }

    fn verify(
        &self,
        password: &PlainPassword,
        hash: &PasswordHash,
    ) -> Result<PasswordVerifyResult, InfraError> {
        Ok(PasswordVerifyResult::from(
            Self::hash_of(password.as_str()) == *hash,
        ))
    }
}

// ===== MockGeocoder =====

/// 登録済みの住所にのみ所在地を返すジオコーダ
#[derive(Clone, Default)]
pub struct MockGeocoder {
    locations: Arc<Mutex<Vec<(String, Location)>>>,
}

impl MockGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_location(&self, address: impl Into<String>, location: Location) {
        self.locations
            .lock()
            .unwrap()
            .push((address.into(), location));
    }
}

#[async_trait]
impl Geocoder for MockGeocoder {
    async fn geocode(
        &self,
        address: &str,
    ) -> Result<Option<Location>, InfraError> {
        Ok(self
            .locations
            .lock()
            .unwrap()
            .iter()
            .find(|(a, _)| a == address)
            .map(|(_, l)| l.clone()))
    }
}

// ===== MockPhotoStorage =====

#[derive(Clone, Default)]
pub struct MockPhotoStorage {
    files: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl MockPhotoStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 保存されたファイル名の一覧
    pub fn file_names(&self) -> Vec<String> {
        self.files
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[async_trait]
impl PhotoStorage for MockPhotoStorage {
    async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<(), InfraError> {
        let mut files = self.files.lock().unwrap();
        files.retain(|(name, _)| name != file_name);
        files.push((file_name.to_string(), bytes.to_vec()));
        Ok(())
    }
}

// ===== MockNotificationSender =====

/// 送信したメールを記録する。`failing()` で常に失敗させられる
#[derive(Clone, Default)]
pub struct MockNotificationSender {
    sent:    Arc<Mutex<Vec<EmailMessage>>>,
    failing: bool,
}

impl MockNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSender for MockNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        if self.failing {
            return Err(NotificationError::SendFailed("mock failure".to_string()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}
