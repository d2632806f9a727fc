//! ブートキャンプユースケース
//!
//! - 作成・更新時に住所をジオコーディングして所在地を設定する
//! - admin 以外のユーザーが公開できるブートキャンプは 1 件まで
//! - 写真は MIME タイプとサイズを検証してから保存する

use std::{path::Path, sync::Arc};

use devcamper_domain::{
    bootcamp::{
        Address,
        Bootcamp,
        BootcampChanges,
        BootcampId,
        BootcampName,
        Careers,
        Description,
        NewBootcamp,
        Phone,
        Website,
    },
    clock::Clock,
    geo::{Location, radius_from_miles},
    list_query::{ListQuery, Page},
    ownership::{Requester, ensure_owner_or_admin, ensure_role},
    user::{Email, UserRole},
};
use devcamper_infra::{Geocoder, PhotoStorage, repository::BootcampRepository};

use super::helpers::{FindResultExt, parse_optional};
use crate::error::ApiError;

/// ブートキャンプを作成・更新できるロール
const PUBLISHING_ROLES: &[UserRole] = &[UserRole::Publisher, UserRole::Admin];

/// ブートキャンプ作成の入力
#[derive(Debug, Default)]
pub struct CreateBootcampInput {
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

/// ブートキャンプ更新の入力（`None` は変更なし）
#[derive(Debug, Default)]
pub struct UpdateBootcampInput {
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

/// アップロードされた写真
#[derive(Debug)]
pub struct PhotoUpload {
    /// 元のファイル名（拡張子の取得に使用）
    pub file_name:    Option<String>,
    pub content_type: Option<String>,
    pub bytes:        Vec<u8>,
}

/// ブートキャンプユースケース
pub struct BootcampUseCaseImpl {
    bootcamp_repository: Arc<dyn BootcampRepository>,
    geocoder:            Arc<dyn Geocoder>,
    photo_storage:       Arc<dyn PhotoStorage>,
    clock:               Arc<dyn Clock>,
    max_file_upload:     usize,
}

impl BootcampUseCaseImpl {
    pub fn new(
        bootcamp_repository: Arc<dyn BootcampRepository>,
        geocoder: Arc<dyn Geocoder>,
        photo_storage: Arc<dyn PhotoStorage>,
        clock: Arc<dyn Clock>,
        max_file_upload: usize,
    ) -> Self {
        Self {
            bootcamp_repository,
            geocoder,
            photo_storage,
            clock,
            max_file_upload,
        }
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Page<Bootcamp>, ApiError> {
        Ok(self.bootcamp_repository.list(query).await?)
    }

    pub async fn get(&self, id: &BootcampId) -> Result<Bootcamp, ApiError> {
        self.bootcamp_repository
            .find_by_id(id)
            .await
            .or_not_found("Bootcamp", id)
    }

    /// ブートキャンプを作成する
    ///
    /// 1. ロール確認（publisher / admin）
    /// 2. admin 以外は公開済みのブートキャンプがないことを確認
    /// 3. 入力の検証と住所のジオコーディング
    /// 4. 挿入（名前の重複は一意制約違反として 400）
    pub async fn create(
        &self,
        requester: &Requester,
        input: CreateBootcampInput,
    ) -> Result<Bootcamp, ApiError> {
        ensure_role(requester, PUBLISHING_ROLES)?;

        if !requester.is_admin()
            && self
                .bootcamp_repository
                .count_by_user(requester.id())
                .await?
                > 0
        {
            return Err(ApiError::BadRequest(format!(
                "The user with ID {} has already published a bootcamp",
                requester.id()
            )));
        }

        let address = Address::new(input.address)?;
        let location = self.geocode(address.as_str()).await?;

        let bootcamp = Bootcamp::new(NewBootcamp {
            user_id: requester.id().clone(),
            name: BootcampName::new(input.name)?,
            description: Description::new(input.description)?,
            website: parse_optional(input.website, Website::new)?,
            phone: parse_optional(input.phone, Phone::new)?,
            email: parse_optional(input.email, Email::new)?,
            address,
            location,
            careers: Careers::parse(input.careers.as_slice())?,
            housing: input.housing,
            job_assistance: input.job_assistance,
            job_guarantee: input.job_guarantee,
            accept_gi: input.accept_gi,
            now: self.clock.now(),
        });

        self.bootcamp_repository.insert(&bootcamp).await?;

        tracing::info!(bootcamp.id = %bootcamp.id(), user.id = %requester.id(), "ブートキャンプを作成しました");
        Ok(bootcamp)
    }

    /// ブートキャンプを部分更新する
    ///
    /// 住所が変わった場合のみ再ジオコーディングする。
    pub async fn update(
        &self,
        requester: &Requester,
        id: &BootcampId,
        input: UpdateBootcampInput,
    ) -> Result<Bootcamp, ApiError> {
        let bootcamp = self.get(id).await?;
        ensure_owner_or_admin(requester, bootcamp.user_id(), "update this bootcamp")?;

        let changes = BootcampChanges {
            name:           parse_optional(input.name, BootcampName::new)?,
            description:    parse_optional(input.description, Description::new)?,
            website:        parse_optional(input.website, Website::new)?,
            phone:          parse_optional(input.phone, Phone::new)?,
            email:          parse_optional(input.email, Email::new)?,
            address:        parse_optional(input.address, Address::new)?,
            careers:        input.careers.map(|c| Careers::parse(c.as_slice())).transpose()?,
            housing:        input.housing,
            job_assistance: input.job_assistance,
            job_guarantee:  input.job_guarantee,
            accept_gi:      input.accept_gi,
        };

        let location = match &changes.address {
            Some(address) if bootcamp.changes_address(&changes) => {
                self.geocode(address.as_str()).await?
            }
            _ => None,
        };

        let updated = bootcamp.apply(changes, location);
        self.bootcamp_repository.update(&updated).await?;

        Ok(updated)
    }

    /// ブートキャンプを削除する（コース・レビューは DB 側でカスケード削除）
    pub async fn delete(&self, requester: &Requester, id: &BootcampId) -> Result<(), ApiError> {
        let bootcamp = self.get(id).await?;
        ensure_owner_or_admin(requester, bootcamp.user_id(), "delete this bootcamp")?;

        self.bootcamp_repository.delete(id).await?;

        tracing::info!(bootcamp.id = %id, "ブートキャンプを削除しました");
        Ok(())
    }

    /// 写真をアップロードし、保存したファイル名を返す
    ///
    /// 検証に失敗した場合はストレージに何も書き込まない。
    pub async fn upload_photo(
        &self,
        requester: &Requester,
        id: &BootcampId,
        upload: Option<PhotoUpload>,
    ) -> Result<String, ApiError> {
        let bootcamp = self.get(id).await?;
        ensure_owner_or_admin(requester, bootcamp.user_id(), "update this bootcamp")?;

        let upload = upload.ok_or_else(|| ApiError::BadRequest("Please upload a file".into()))?;

        let is_image = upload
            .content_type
            .as_deref()
            .is_some_and(|mime| mime.starts_with("image"));
        if !is_image {
            return Err(ApiError::BadRequest("Please upload an image file".into()));
        }

        if upload.bytes.len() > self.max_file_upload {
            return Err(ApiError::BadRequest(format!(
                "Please upload an image less than {} bytes",
                self.max_file_upload
            )));
        }

        let extension = upload
            .file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        let file_name = bootcamp.photo_file_name(&extension);

        self.photo_storage.save(&file_name, &upload.bytes).await?;
        self.bootcamp_repository
            .update(&bootcamp.with_photo(file_name.clone()))
            .await?;

        Ok(file_name)
    }

    /// 郵便番号を中心とした半径（マイル）以内のブートキャンプを取得する
    pub async fn list_within_radius(
        &self,
        zipcode: &str,
        distance_miles: f64,
    ) -> Result<Vec<Bootcamp>, ApiError> {
        let radius = radius_from_miles(distance_miles)?;
        let center = self.geocoder.geocode(zipcode).await?.ok_or_else(|| {
            ApiError::BadRequest(format!("Could not find a location for {zipcode}"))
        })?;

        Ok(self
            .bootcamp_repository
            .find_within_radius(&center.point, radius)
            .await?)
    }

    async fn geocode(&self, address: &str) -> Result<Option<Location>, ApiError> {
        let location = self.geocoder.geocode(address).await?;
        if location.is_none() {
            tracing::warn!(address, "住所から所在地を特定できませんでした");
        }
        Ok(location)
    }
}
