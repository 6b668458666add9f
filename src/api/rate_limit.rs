//! Rate limiting of job submissions
//!
//! Each client IP gets a token bucket holding `submissions_per_minute` tokens
//! that refills continuously. Exempt IPs are never limited.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Instant,
};
use tokio::sync::Mutex;

use crate::config::RateLimitConfig;
use crate::error::ApiError;

/// Simple token bucket rate limiter
struct TokenBucket {
    /// Available tokens
    tokens: f64,
    /// Last refill time
    last_refill: Instant,
    /// Tokens per second
    rate: f64,
    /// Maximum burst size
    capacity: u32,
}

impl TokenBucket {
    fn new(rate: f64, capacity: u32) -> Self {
        Self {
            tokens: capacity as f64,
            last_refill: Instant::now(),
            rate,
            capacity,
        }
    }

    fn try_consume(&mut self) -> Option<u64> {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity as f64);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            None
        } else {
            let wait_secs = ((1.0 - self.tokens) / self.rate).ceil() as u64;
            Some(wait_secs.max(1))
        }
    }
}

/// Rate limiter with per-IP tracking
pub struct RateLimiter {
    /// Per-IP token buckets
    buckets: Mutex<HashMap<IpAddr, TokenBucket>>,
    /// Configuration
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Create a new rate limiter from configuration
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Consume one submission for `ip`; returns the seconds to wait when limited
    pub async fn check(&self, ip: IpAddr) -> Option<u64> {
        if self.config.exempt_ips.contains(&ip) {
            return None;
        }

        let per_minute = self.config.submissions_per_minute.max(1);
        let mut buckets = self.buckets.lock().await;
        let bucket = buckets
            .entry(ip)
            .or_insert_with(|| TokenBucket::new(per_minute as f64 / 60.0, per_minute));
        bucket.try_consume()
    }
}

/// Rate limiting middleware function
///
/// Requests without connection info (e.g. in-process tests) are not limited.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    let ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let Some(ip) = ip else {
        return next.run(req).await;
    };

    match limiter.check(ip).await {
        None => next.run(req).await,
        Some(retry_after) => {
            tracing::info!(client = %ip, retry_after, "job submission rate limited");
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                axum::Json(ApiError::rate_limited(retry_after)),
            )
                .into_response();
            if let Ok(value) = retry_after.to_string().parse() {
                response.headers_mut().insert("retry-after", value);
            }
            response
        }
    }
}
