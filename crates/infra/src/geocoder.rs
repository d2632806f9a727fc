//! # ジオコーディング
//!
//! 住所や郵便番号を緯度経度と住所要素に変換する。
//! 実装は MapQuest Geocoding API（`/geocoding/v1/address`）を使う。
//!
//! ## レスポンスの対応
//!
//! | MapQuest | [`Location`] |
//! |----------|--------------|
//! | `latLng.lat` / `latLng.lng` | `point` |
//! | `street` | `street` |
//! | `adminArea5` | `city` |
//! | `adminArea3` | `state` |
//! | `postalCode` | `zipcode` |
//! | `adminArea1` | `country` |

use async_trait::async_trait;
use devcamper_domain::geo::{GeoPoint, Location};
use serde::Deserialize;

use crate::InfraError;

/// ジオコーディングトレイト
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// 住所を所在地に変換する
    ///
    /// 候補が 1 件もなければ `None`
    async fn geocode(&self, address: &str) -> Result<Option<Location>, InfraError>;
}

/// MapQuest を使用したジオコーダ
pub struct MapQuestGeocoder {
    client:   reqwest::Client,
    base_url: String,
    api_key:  String,
}

impl MapQuestGeocoder {
    /// - `base_url`: エンドポイント（例: `https://www.mapquestapi.com/geocoding/v1/address`）
    /// - `api_key`: MapQuest の API キー
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client:   reqwest::Client::new(),
            base_url: base_url.into(),
            api_key:  api_key.into(),
        }
    }
}

#[async_trait]
impl Geocoder for MapQuestGeocoder {
    #[tracing::instrument(skip_all, level = "debug", fields(address = %address))]
    async fn geocode(&self, address: &str) -> Result<Option<Location>, InfraError> {
        let response: GeocodeResponse = self
            .client
            .get(&self.base_url)
            .query(&[("key", self.api_key.as_str()), ("location", address)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response.into_location()
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    locations: Vec<GeocodeLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeocodeLocation {
    lat_lng:      LatLng,
    #[serde(default)]
    street:       String,
    #[serde(default)]
    admin_area5:  String,
    #[serde(default)]
    admin_area3:  String,
    #[serde(default)]
    postal_code:  String,
    #[serde(default)]
    admin_area1:  String,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl GeocodeResponse {
    fn into_location(self) -> Result<Option<Location>, InfraError> {
        let Some(found) = self
            .results
            .into_iter()
            .next()
            .and_then(|r| r.locations.into_iter().next())
        else {
            return Ok(None);
        };

        let point = GeoPoint::new(found.lat_lng.lat, found.lat_lng.lng)
            .map_err(|e| InfraError::unexpected(format!("ジオコーディング結果が不正: {e}")))?;

        let parts = [
            found.street.as_str(),
            found.admin_area5.as_str(),
            found.admin_area3.as_str(),
            found.postal_code.as_str(),
            found.admin_area1.as_str(),
        ];
        let formatted_address = parts
            .iter()
            .filter(|p| !p.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(", ");

        Ok(Some(Location {
            point,
            formatted_address,
            street: non_empty(found.street),
            city: non_empty(found.admin_area5),
            state: non_empty(found.admin_area3),
            zipcode: non_empty(found.postal_code),
            country: non_empty(found.admin_area1),
        }))
    }
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const BOSTON_RESPONSE: &str = r#"{
        "info": { "statuscode": 0 },
        "results": [{
            "providedLocation": { "location": "233 Bay State Rd Boston MA 02215" },
            "locations": [{
                "street": "233 Bay State Rd",
                "adminArea5": "Boston",
                "adminArea3": "MA",
                "adminArea1": "US",
                "postalCode": "02215",
                "latLng": { "lat": 42.350846, "lng": -71.105275 }
            }]
        }]
    }"#;

    #[test]
    fn test_mapquestのレスポンスから所在地を組み立てる() {
        let response: GeocodeResponse = serde_json::from_str(BOSTON_RESPONSE).unwrap();

        let location = response.into_location().unwrap().unwrap();

        assert_eq!(location.point.latitude(), 42.350846);
        assert_eq!(location.point.longitude(), -71.105275);
        assert_eq!(
            location.formatted_address,
            "233 Bay State Rd, Boston, MA, 02215, US"
        );
        assert_eq!(location.city.as_deref(), Some("Boston"));
        assert_eq!(location.state.as_deref(), Some("MA"));
        assert_eq!(location.zipcode.as_deref(), Some("02215"));
        assert_eq!(location.country.as_deref(), Some("US"));
    }

    #[test]
    fn test_空の住所要素はnoneになる() {
        let json = r#"{ "results": [{ "locations": [{
            "postalCode": "02118",
            "adminArea1": "US",
            "latLng": { "lat": 42.34, "lng": -71.07 }
        }]}]}"#;
        let response: GeocodeResponse = serde_json::from_str(json).unwrap();

        let location = response.into_location().unwrap().unwrap();

        assert_eq!(location.street, None);
        assert_eq!(location.city, None);
        assert_eq!(location.formatted_address, "02118, US");
    }

    #[test]
    fn test_候補がなければnone() {
        let response: GeocodeResponse =
            serde_json::from_str(r#"{ "results": [{ "locations": [] }] }"#).unwrap();

        assert!(response.into_location().unwrap().is_none());
    }

    #[test]
    fn test_範囲外の座標はエラー() {
        let json = r#"{ "results": [{ "locations": [{ "latLng": { "lat": 123.0, "lng": 0.0 } }] }] }"#;
        let response: GeocodeResponse = serde_json::from_str(json).unwrap();

        assert!(response.into_location().is_err());
    }
}
