//! # 地理計算
//!
//! 半径検索で使う球面上の距離計算と、ジオコーディング結果の保持型。
//!
//! 距離はすべて地球を半径 [`EARTH_RADIUS_MILES`] の球とみなした角距離（ラジアン）で扱う。
//! 検索半径 `distance` マイルは `distance / EARTH_RADIUS_MILES` ラジアンに換算する。

use serde::{Deserialize, Serialize};

use crate::DomainError;

/// 地球の半径（マイル）
pub const EARTH_RADIUS_MILES: f64 = 3963.0;

/// 緯度経度（度）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    latitude:  f64,
    longitude: f64,
}

impl GeoPoint {
    /// 緯度経度から地点を作成する
    ///
    /// # エラー
    ///
    /// 緯度が ±90、経度が ±180 の範囲外なら `DomainError::Validation`
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, DomainError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(DomainError::Validation(format!(
                "Invalid coordinates: ({latitude}, {longitude})"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// 2 地点間の角距離（ラジアン、haversine）
    pub fn angular_distance_to(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lng = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * a.sqrt().min(1.0).asin()
    }

    /// `other` が `radius` ラジアン以内にあるかどうか
    pub fn is_within(&self, other: &GeoPoint, radius: f64) -> bool {
        self.angular_distance_to(other) <= radius
    }
}

/// 検索距離（マイル）を角距離（ラジアン）に換算する
///
/// # エラー
///
/// 負数・非有限値は `DomainError::Validation`
pub fn radius_from_miles(miles: f64) -> Result<f64, DomainError> {
    if !miles.is_finite() || miles < 0.0 {
        return Err(DomainError::Validation(format!(
            "Invalid distance: {miles}"
        )));
    }
    Ok(miles / EARTH_RADIUS_MILES)
}

/// ジオコーディング済みの所在地
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub point:             GeoPoint,
    pub formatted_address: String,
    pub street:            Option<String>,
    pub city:              Option<String>,
    pub state:             Option<String>,
    pub zipcode:           Option<String>,
    pub country:           Option<String>,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn boston() -> GeoPoint {
        GeoPoint::new(42.3601, -71.0589).unwrap()
    }

    fn providence() -> GeoPoint {
        GeoPoint::new(41.8240, -71.4128).unwrap()
    }

    fn los_angeles() -> GeoPoint {
        GeoPoint::new(34.0522, -118.2437).unwrap()
    }

    #[rstest]
    fn test_同一地点の角距離はゼロ() {
        assert_eq!(boston().angular_distance_to(&boston()), 0.0);
    }

    #[rstest]
    fn test_ボストンとプロビデンスはおよそ41マイル() {
        let miles = boston().angular_distance_to(&providence()) * EARTH_RADIUS_MILES;

        assert!((miles - 41.0).abs() < 2.0, "miles = {miles}");
    }

    #[rstest]
    fn test_半径内の地点のみ含まれる() {
        let radius = radius_from_miles(100.0).unwrap();

        assert!(boston().is_within(&boston(), radius));
        assert!(boston().is_within(&providence(), radius));
        assert!(!boston().is_within(&los_angeles(), radius));
    }

    #[rstest]
    fn test_マイルからラジアンへの換算() {
        assert_eq!(radius_from_miles(3963.0).unwrap(), 1.0);
        assert_eq!(radius_from_miles(0.0).unwrap(), 0.0);
    }

    #[rstest]
    #[case(-1.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn test_不正な距離はバリデーションエラー(#[case] miles: f64) {
        assert!(radius_from_miles(miles).is_err());
    }

    #[rstest]
    #[case(91.0, 0.0)]
    #[case(0.0, -181.0)]
    fn test_範囲外の座標はバリデーションエラー(#[case] lat: f64, #[case] lng: f64) {
        assert!(GeoPoint::new(lat, lng).is_err());
    }
}
