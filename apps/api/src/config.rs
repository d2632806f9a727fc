//! # API サーバー設定
//!
//! 環境変数から API サーバーの設定を読み込む。
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | デフォルト |
//! |--------|------|-----------|
//! | `API_HOST` | No | `0.0.0.0` |
//! | `PORT` | No | `5000` |
//! | `DATABASE_URL` | **Yes** | |
//! | `REDIS_URL` | **Yes** | |
//! | `GEOCODER_API_KEY` | **Yes** | |
//! | `GEOCODER_BASE_URL` | No | MapQuest の住所検索 API |
//! | `FILE_UPLOAD_PATH` | No | `./public/uploads` |
//! | `MAX_FILE_UPLOAD` | No | `1000000`（バイト） |
//! | `SESSION_TTL_SECONDS` | No | 30 日 |
//! | `RATE_LIMIT_MAX` | No | `100` |
//! | `RATE_LIMIT_WINDOW_SECONDS` | No | `600` |
//! | `MAIL_BACKEND` | No | `noop`（`smtp` で SMTP 送信） |
//! | `SMTP_HOST` / `SMTP_PORT` | No | `localhost` / `1025` |
//! | `MAIL_FROM_ADDRESS` | No | `noreply@devcamper.io` |
//! | `PUBLIC_URL` | No | `http://localhost:{PORT}`（リセットメール内リンク用） |
//! | `ENV` | No | `production` で Cookie に `Secure` を付与 |

use std::{env, path::PathBuf, time::Duration};

use devcamper_infra::session::DEFAULT_SESSION_TTL_SECONDS;
use thiserror::Error;

const DEFAULT_GEOCODER_BASE_URL: &str = "https://www.mapquestapi.com/geocoding/v1/address";

/// 設定読み込みエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} が設定されていません")]
    Missing(&'static str),

    #[error("{name} の値が不正です: {value}")]
    Invalid { name: &'static str, value: String },
}

/// メール送信バックエンド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailBackend {
    /// 送信せずログ出力のみ
    Noop,
    Smtp,
}

/// メール送信の設定
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub backend:      MailBackend,
    pub smtp_host:    String,
    pub smtp_port:    u16,
    pub from_address: String,
}

/// レート制限の設定（固定ウィンドウ）
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window:       Duration,
}

/// API サーバーの設定
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host:                String,
    pub port:                u16,
    pub database_url:        String,
    pub redis_url:           String,
    pub geocoder_base_url:   String,
    pub geocoder_api_key:    String,
    /// 写真の保存先ディレクトリ（`/uploads` として静的配信する）
    pub file_upload_path:    PathBuf,
    /// アップロード可能な最大バイト数
    pub max_file_upload:     usize,
    pub session_ttl_seconds: u64,
    pub rate_limit:          RateLimitConfig,
    pub mail:                MailConfig,
    /// 外部から見たサーバーの URL
    pub public_url:          String,
    /// 本番環境かどうか（Cookie の `Secure` 属性に使用）
    pub production:          bool,
}

impl ApiConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の値取得関数から設定を読み込む
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));
        let or_default =
            |name: &'static str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let port = parse_or(&lookup, "PORT", 5000)?;
        let mail_backend = match lookup("MAIL_BACKEND").as_deref() {
            None | Some("noop") => MailBackend::Noop,
            Some("smtp") => MailBackend::Smtp,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name:  "MAIL_BACKEND",
                    value: other.to_string(),
                });
            }
        };

        Ok(Self {
            host: or_default("API_HOST", "0.0.0.0"),
            port,
            database_url: required("DATABASE_URL")?,
            redis_url: required("REDIS_URL")?,
            geocoder_base_url: or_default("GEOCODER_BASE_URL", DEFAULT_GEOCODER_BASE_URL),
            geocoder_api_key: required("GEOCODER_API_KEY")?,
            file_upload_path: PathBuf::from(or_default("FILE_UPLOAD_PATH", "./public/uploads")),
            max_file_upload: parse_or(&lookup, "MAX_FILE_UPLOAD", 1_000_000)?,
            session_ttl_seconds: parse_or(
                &lookup,
                "SESSION_TTL_SECONDS",
                DEFAULT_SESSION_TTL_SECONDS,
            )?,
            rate_limit: RateLimitConfig {
                max_requests: parse_or(&lookup, "RATE_LIMIT_MAX", 100)?,
                window:       Duration::from_secs(parse_or(
                    &lookup,
                    "RATE_LIMIT_WINDOW_SECONDS",
                    600,
                )?),
            },
            mail: MailConfig {
                backend:      mail_backend,
                smtp_host:    or_default("SMTP_HOST", "localhost"),
                smtp_port:    parse_or(&lookup, "SMTP_PORT", 1025)?,
                from_address: or_default("MAIL_FROM_ADDRESS", "noreply@devcamper.io"),
            },
            public_url: lookup("PUBLIC_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| format!("http://localhost:{port}")),
            production: lookup("ENV").as_deref() == Some("production"),
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
