//! # レート制限ミドルウェア
//!
//! クライアント IP ごとに固定ウィンドウでリクエスト数を数え、
//! 上限を超えたら 429 を返す。カウンタはプロセス内メモリに保持する。

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{config::RateLimitConfig, error::ApiError};

struct Window {
    started_at: Instant,
    count:      u32,
}

/// 固定ウィンドウ方式のレートリミッター
pub struct FixedWindowLimiter {
    max_requests: u32,
    window:       Duration,
    windows:      Mutex<HashMap<String, Window>>,
}

impl FixedWindowLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window:       config.window,
            windows:      Mutex::new(HashMap::new()),
        }
    }

    /// リクエストを 1 件数え、上限内なら `true` を返す
    pub fn check(&self, key: &str, now: Instant) -> bool {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);

        // 期限切れのウィンドウを掃除
        windows.retain(|_, w| now.duration_since(w.started_at) < self.window);

        let window = windows.entry(key.to_string()).or_insert(Window {
            started_at: now,
            count:      0,
        });
        window.count = window.count.saturating_add(1);

        window.count <= self.max_requests
    }
}

/// レート制限ミドルウェア
///
/// 接続元アドレスが取れない場合（テストなど）は `unknown` として数える。
pub async fn rate_limit(
    State(limiter): State<Arc<FixedWindowLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_string(), |info| info.0.ip().to_string());

    if !limiter.check(&key, Instant::now()) {
        tracing::warn!(client_ip = %key, "レート制限を超過しました");
        return ApiError::TooManyRequests.into_response();
    }

    next.run(request).await
}
