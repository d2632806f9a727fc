//! # ブートキャンプハンドラ
//!
//! ## エンドポイント
//!
//! - `GET /api/v1/bootcamps` - 一覧（絞り込み・射影・並び替え・ページング）
//! - `GET /api/v1/bootcamps/{id}` - 詳細
//! - `POST /api/v1/bootcamps` - 作成（publisher / admin）
//! - `PUT /api/v1/bootcamps/{id}` - 部分更新（所有者 / admin）
//! - `DELETE /api/v1/bootcamps/{id}` - 削除（所有者 / admin）
//! - `PUT /api/v1/bootcamps/{id}/photo` - 写真アップロード（multipart の `file`）
//! - `GET /api/v1/bootcamps/radius/{zipcode}/{distance}` - 半径検索（マイル）

use std::sync::Arc;

use axum::{
    Extension,
    Json,
    extract::{Multipart, Path, Query, State, multipart::MultipartError},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use devcamper_domain::{
    bootcamp::{Bootcamp, BootcampId},
    geo::Location,
};
use devcamper_infra::repository::BOOTCAMP_LIST_SCHEMA;
use devcamper_shared::{ApiResponse, CountedResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::{QueryPairs, paginated, parse_list_query};
use crate::{
    error::ApiError,
    middleware::CurrentUser,
    usecase::{BootcampUseCaseImpl, CreateBootcampInput, PhotoUpload, UpdateBootcampInput},
};

/// multipart でファイルを受け取るフィールド名
const PHOTO_FIELD: &str = "file";

/// ブートキャンプ API の共有状態
pub struct BootcampState {
    pub usecase: BootcampUseCaseImpl,
}

// --- リクエスト/レスポンス型 ---

/// 所在地 DTO（GeoJSON の Point 形式、座標は `[経度, 緯度]`）
#[derive(Debug, Serialize)]
pub struct LocationDto {
    #[serde(rename = "type")]
    pub kind:              &'static str,
    pub coordinates:       [f64; 2],
    pub formatted_address: String,
    pub street:            Option<String>,
    pub city:              Option<String>,
    pub state:             Option<String>,
    pub zipcode:           Option<String>,
    pub country:           Option<String>,
}

impl From<&Location> for LocationDto {
    fn from(location: &Location) -> Self {
        Self {
            kind:              "Point",
            coordinates:       [location.point.longitude(), location.point.latitude()],
            formatted_address: location.formatted_address.clone(),
            street:            location.street.clone(),
            city:              location.city.clone(),
            state:             location.state.clone(),
            zipcode:           location.zipcode.clone(),
            country:           location.country.clone(),
        }
    }
}

/// ブートキャンプ DTO
#[derive(Debug, Serialize)]
pub struct BootcampDto {
    pub id:             Uuid,
    pub user:           Uuid,
    pub name:           String,
    pub slug:           String,
    pub description:    String,
    pub website:        Option<String>,
    pub phone:          Option<String>,
    pub email:          Option<String>,
    pub address:        String,
    pub location:       Option<LocationDto>,
    pub careers:        Vec<String>,
    pub housing:        bool,
    pub job_assistance: bool,
    pub job_guarantee:  bool,
    pub accept_gi:      bool,
    pub average_rating: Option<f64>,
    pub average_cost:   Option<i32>,
    pub photo:          String,
    pub created_at:     String,
}

impl From<&Bootcamp> for BootcampDto {
    fn from(bootcamp: &Bootcamp) -> Self {
        Self {
            id:             *bootcamp.id().as_uuid(),
            user:           *bootcamp.user_id().as_uuid(),
            name:           bootcamp.name().as_str().to_string(),
            slug:           bootcamp.slug().as_str().to_string(),
            description:    bootcamp.description().as_str().to_string(),
            website:        bootcamp.website().map(|w| w.as_str().to_string()),
            phone:          bootcamp.phone().map(|p| p.as_str().to_string()),
            email:          bootcamp.email().map(|e| e.as_str().to_string()),
            address:        bootcamp.address().as_str().to_string(),
            location:       bootcamp.location().map(LocationDto::from),
            careers:        bootcamp.careers().to_strings(),
            housing:        bootcamp.housing(),
            job_assistance: bootcamp.job_assistance(),
            job_guarantee:  bootcamp.job_guarantee(),
            accept_gi:      bootcamp.accept_gi(),
            average_rating: bootcamp.average_rating(),
            average_cost:   bootcamp.average_cost(),
            photo:          bootcamp.photo().to_string(),
            created_at:     bootcamp.created_at().to_rfc3339(),
        }
    }
}

/// ブートキャンプ作成リクエスト
///
/// 未指定の項目は空値として受け取り、必須チェックはドメイン層で行う。
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateBootcampRequest {
    pub name:           String,
    pub description:    String,
    pub website:        Option<String>,
    pub phone:          Option<String>,
    pub email:          Option<String>,
    pub address:        String,
    pub careers:        Vec<String>,
    pub housing:        bool,
    pub job_assistance: bool,
    pub job_guarantee:  bool,
    pub accept_gi:      bool,
}

/// ブートキャンプ更新リクエスト
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateBootcampRequest {
    pub name:           Option<String>,
    pub description:    Option<String>,
    pub website:        Option<String>,
    pub phone:          Option<String>,
    pub email:          Option<String>,
    pub address:        Option<String>,
    pub careers:        Option<Vec<String>>,
    pub housing:        Option<bool>,
    pub job_assistance: Option<bool>,
    pub job_guarantee:  Option<bool>,
    pub accept_gi:      Option<bool>,
}

// --- ハンドラ ---

/// GET /api/v1/bootcamps
#[tracing::instrument(skip_all)]
pub async fn list_bootcamps(
    State(state): State<Arc<BootcampState>>,
    Query(params): Query<QueryPairs>,
) -> Result<impl IntoResponse, ApiError> {
    let query = parse_list_query(&params, &BOOTCAMP_LIST_SCHEMA)?;
    let page = state.usecase.list(&query).await?;

    let response = paginated(page, &query, |b| BootcampDto::from(b))?;
    Ok((StatusCode::OK, Json(response)))
}

/// GET /api/v1/bootcamps/{id}
#[tracing::instrument(skip_all, fields(%id))]
pub async fn get_bootcamp(
    State(state): State<Arc<BootcampState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = BootcampId::parse(&id)?;
    let bootcamp = state.usecase.get(&id).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(BootcampDto::from(&bootcamp))),
    ))
}

/// POST /api/v1/bootcamps
///
/// ## レスポンス
///
/// - `201 Created`: 作成されたブートキャンプ
/// - `400 Bad Request`: 入力不正、名前の重複、公開済みのブートキャンプがある
/// - `403 Forbidden`: publisher / admin 以外
#[tracing::instrument(skip_all)]
pub async fn create_bootcamp(
    State(state): State<Arc<BootcampState>>,
    Extension(current): Extension<CurrentUser>,
    WithRejection(Json(req), _): WithRejection<Json<CreateBootcampRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let input = CreateBootcampInput {
        name:           req.name,
        description:    req.description,
        website:        req.website,
        phone:          req.phone,
        email:          req.email,
        address:        req.address,
        careers:        req.careers,
        housing:        req.housing,
        job_assistance: req.job_assistance,
        job_guarantee:  req.job_guarantee,
        accept_gi:      req.accept_gi,
    };

    let bootcamp = state.usecase.create(&current.requester(), input).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(BootcampDto::from(&bootcamp))),
    ))
}

/// PUT /api/v1/bootcamps/{id}
#[tracing::instrument(skip_all, fields(%id))]
pub async fn update_bootcamp(
    State(state): State<Arc<BootcampState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateBootcampRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let id = BootcampId::parse(&id)?;
    let input = UpdateBootcampInput {
        name:           req.name,
        description:    req.description,
        website:        req.website,
        phone:          req.phone,
        email:          req.email,
        address:        req.address,
        careers:        req.careers,
        housing:        req.housing,
        job_assistance: req.job_assistance,
        job_guarantee:  req.job_guarantee,
        accept_gi:      req.accept_gi,
    };

    let bootcamp = state
        .usecase
        .update(&current.requester(), &id, input)
        .await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(BootcampDto::from(&bootcamp))),
    ))
}

/// DELETE /api/v1/bootcamps/{id}
///
/// コース・レビューもカスケードで削除される。
#[tracing::instrument(skip_all, fields(%id))]
pub async fn delete_bootcamp(
    State(state): State<Arc<BootcampState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = BootcampId::parse(&id)?;
    state.usecase.delete(&current.requester(), &id).await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(json!({})))))
}

/// PUT /api/v1/bootcamps/{id}/photo
///
/// multipart の `file` フィールドを写真として保存し、保存したファイル名を返す。
#[tracing::instrument(skip_all, fields(%id))]
pub async fn upload_bootcamp_photo(
    State(state): State<Arc<BootcampState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let id = BootcampId::parse(&id)?;
    let upload = read_photo_field(multipart)
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let file_name = state
        .usecase
        .upload_photo(&current.requester(), &id, upload)
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(file_name))))
}

/// multipart から `file` フィールドを探して読み込む
async fn read_photo_field(mut multipart: Multipart) -> Result<Option<PhotoUpload>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(PHOTO_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;

        return Ok(Some(PhotoUpload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        }));
    }

    Ok(None)
}

/// GET /api/v1/bootcamps/radius/{zipcode}/{distance}
///
/// 郵便番号の地点から `distance` マイル以内のブートキャンプを返す。
#[tracing::instrument(skip_all, fields(%zipcode, %distance))]
pub async fn get_bootcamps_in_radius(
    State(state): State<Arc<BootcampState>>,
    Path((zipcode, distance)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let miles: f64 = distance
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid distance: {distance}")))?;

    let bootcamps = state.usecase.list_within_radius(&zipcode, miles).await?;
    let data: Vec<BootcampDto> = bootcamps.iter().map(BootcampDto::from).collect();

    Ok((StatusCode::OK, Json(CountedResponse::new(data))))
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Method, Request},
        routing::{get, put},
    };
    use devcamper_domain::{bootcamp::BootcampChanges, user::UserRole};
    use devcamper_infra::mock::{MockBootcampRepository, MockGeocoder, MockPhotoStorage};
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::test_utils::{
        boston_location,
        create_bootcamp as bootcamp_fixture,
        create_user,
        fixed_clock,
        location,
    };

    struct Sut {
        app:       Router,
        bootcamps: MockBootcampRepository,
        storage:   MockPhotoStorage,
    }

    fn sut(current: CurrentUser) -> Sut {
        let bootcamps = MockBootcampRepository::new();
        let geocoder = MockGeocoder::new();
        geocoder.add_location("233 Bay State Rd Boston MA 02215", boston_location());
        geocoder.add_location("02215", location(42.35, -71.1));
        let storage = MockPhotoStorage::new();

        let state = Arc::new(BootcampState {
            usecase: BootcampUseCaseImpl::new(
                Arc::new(bootcamps.clone()),
                Arc::new(geocoder),
                Arc::new(storage.clone()),
                Arc::new(fixed_clock()),
                1_000,
            ),
        });

        let app = Router::new()
            .route("/api/v1/bootcamps", get(list_bootcamps).post(create_bootcamp))
            .route(
                "/api/v1/bootcamps/{id}",
                get(get_bootcamp).put(update_bootcamp).delete(delete_bootcamp),
            )
            .route("/api/v1/bootcamps/{id}/photo", put(upload_bootcamp_photo))
            .route(
                "/api/v1/bootcamps/radius/{zipcode}/{distance}",
                get(get_bootcamps_in_radius),
            )
            .layer(Extension(current))
            .with_state(state);

        Sut {
            app,
            bootcamps,
            storage,
        }
    }

    fn current_user(role: UserRole) -> CurrentUser {
        CurrentUser {
            user:  create_user(role, "owner@gmail.com"),
            token: "token".to_string(),
        }
    }

    async fn response_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn multipart_request(uri: &str, content_type: &str, data: &[u8]) -> Request<Body> {
        let boundary = "XBOUNDARY";
        let mut body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"photo.jpg\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method(Method::PUT)
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_作成すると201と所在地付きのブートキャンプを返す() {
        let sut = sut(current_user(UserRole::Publisher));

        let response = sut
            .app
            .oneshot(json_request(
                Method::POST,
                "/api/v1/bootcamps",
                json!({
                    "name": "Devworks Bootcamp",
                    "description": "Devworks is a full stack JavaScript Bootcamp",
                    "address": "233 Bay State Rd Boston MA 02215",
                    "careers": ["Web Development", "UI/UX"],
                    "housing": true
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = response_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["slug"], "devworks-bootcamp");
        assert_eq!(body["data"]["location"]["type"], "Point");
        assert_eq!(body["data"]["location"]["city"], "Boston");
        assert_eq!(body["data"]["photo"], "no-photo.jpg");
    }

    #[tokio::test]
    async fn test_必須項目がなければ400() {
        let sut = sut(current_user(UserRole::Publisher));

        let response = sut
            .app
            .oneshot(json_request(Method::POST, "/api/v1/bootcamps", json!({})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response_body(response).await["success"], false);
    }

    #[tokio::test]
    async fn test_不正なjsonは400() {
        let sut = sut(current_user(UserRole::Publisher));

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/bootcamps")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = sut.app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_一覧はselectで射影しページング情報を返す() {
        let current = current_user(UserRole::Publisher);
        let sut = sut(current.clone());
        sut.bootcamps
            .add_bootcamp(bootcamp_fixture(current.user.id(), "Devworks Bootcamp"));
        sut.bootcamps
            .add_bootcamp(bootcamp_fixture(current.user.id(), "ModernTech Bootcamp"));

        let response = sut
            .app
            .oneshot(get_request("/api/v1/bootcamps?select=name&limit=1"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_body(response).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["pagination"]["next"], json!({"page": 2, "limit": 1}));
        let item = body["data"][0].as_object().unwrap();
        let mut keys: Vec<_> = item.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["id", "name"]);
    }

    #[tokio::test]
    async fn test_一覧の未知のフィールドは400() {
        let sut = sut(current_user(UserRole::User));

        let response = sut
            .app
            .oneshot(get_request("/api/v1/bootcamps?password=x"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_不正な形式のidは404() {
        let sut = sut(current_user(UserRole::User));

        let response = sut
            .app
            .oneshot(get_request("/api/v1/bootcamps/not-a-uuid"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response_body(response).await["error"],
            "Bootcamp not found with id of not-a-uuid"
        );
    }

    #[tokio::test]
    async fn test_所有者以外の更新は403で変更されない() {
        let sut = sut(current_user(UserRole::Publisher));
        let other = create_user(UserRole::Publisher, "other@gmail.com");
        let bootcamp = bootcamp_fixture(other.id(), "Devworks Bootcamp");
        sut.bootcamps.add_bootcamp(bootcamp.clone());

        let response = sut
            .app
            .oneshot(json_request(
                Method::PUT,
                &format!("/api/v1/bootcamps/{}", bootcamp.id()),
                json!({"housing": true}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(sut.bootcamps.get(bootcamp.id()), Some(bootcamp));
    }

    #[tokio::test]
    async fn test_削除すると空オブジェクトを返す() {
        let current = current_user(UserRole::Publisher);
        let sut = sut(current.clone());
        let bootcamp = bootcamp_fixture(current.user.id(), "Devworks Bootcamp");
        sut.bootcamps.add_bootcamp(bootcamp.clone());

        let response = sut
            .app
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri(format!("/api/v1/bootcamps/{}", bootcamp.id()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_body(response).await["data"], json!({}));
        assert!(sut.bootcamps.get(bootcamp.id()).is_none());
    }

    #[tokio::test]
    async fn test_写真をアップロードするとファイル名を返す() {
        let current = current_user(UserRole::Publisher);
        let sut = sut(current.clone());
        let bootcamp = bootcamp_fixture(current.user.id(), "Devworks Bootcamp");
        sut.bootcamps.add_bootcamp(bootcamp.clone());

        let response = sut
            .app
            .oneshot(multipart_request(
                &format!("/api/v1/bootcamps/{}/photo", bootcamp.id()),
                "image/jpeg",
                b"jpeg-bytes",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let expected = format!("photo_{}.jpg", bootcamp.id());
        assert_eq!(response_body(response).await["data"], expected.as_str());
        assert_eq!(sut.storage.file_names(), vec![expected]);
    }

    #[tokio::test]
    async fn test_画像以外のファイルは400で保存されない() {
        let current = current_user(UserRole::Publisher);
        let sut = sut(current.clone());
        let bootcamp = bootcamp_fixture(current.user.id(), "Devworks Bootcamp");
        sut.bootcamps.add_bootcamp(bootcamp.clone());

        let response = sut
            .app
            .oneshot(multipart_request(
                &format!("/api/v1/bootcamps/{}/photo", bootcamp.id()),
                "application/pdf",
                b"%PDF",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response_body(response).await["error"],
            "Please upload an image file"
        );
        assert!(sut.storage.file_names().is_empty());
    }

    #[tokio::test]
    async fn test_半径検索は件数付きで返す() {
        let sut = sut(current_user(UserRole::User));
        let owner = create_user(UserRole::Publisher, "a@gmail.com");
        let nearby = bootcamp_fixture(owner.id(), "Devworks Bootcamp")
            .apply(BootcampChanges::default(), Some(boston_location()));
        let far = bootcamp_fixture(owner.id(), "ModernTech Bootcamp")
            .apply(BootcampChanges::default(), Some(location(34.05, -118.24)));
        sut.bootcamps.add_bootcamp(nearby.clone());
        sut.bootcamps.add_bootcamp(far);

        let response = sut
            .app
            .oneshot(get_request("/api/v1/bootcamps/radius/02215/10"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_body(response).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["id"], nearby.id().to_string());
    }

    #[tokio::test]
    async fn test_半径検索の距離が数値でなければ400() {
        let sut = sut(current_user(UserRole::User));

        let response = sut
            .app
            .oneshot(get_request("/api/v1/bootcamps/radius/02215/far"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
