use crate::error::AppError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    Quota, RateLimiter,
    clock::{Clock, DefaultClock},
    state::keyed::DashMapStateStore,
};
use std::{
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
    time::Duration,
};

pub const RATE_LIMIT_LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");

/// Rate limiter keyed by client IP address
pub type IpRateLimiter = Arc<RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock>>;

/// Per-IP request budget shared by every route behind the API prefix.
///
/// `max_requests` may be spent in a burst; the budget refills evenly over
/// `window_seconds`.
#[derive(Clone)]
pub struct ApiRateLimiter {
    limiter: IpRateLimiter,
    max_requests: u32,
}

impl ApiRateLimiter {
    pub fn new(max_requests: u32, window_seconds: u64) -> Self {
        let burst = NonZeroU32::new(max_requests).unwrap_or(NonZeroU32::MIN);
        let period_ms = ((window_seconds * 1000) / burst.get() as u64).max(1);
        let quota = Quota::with_period(Duration::from_millis(period_ms))
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        Self {
            limiter: Arc::new(RateLimiter::dashmap(quota)),
            max_requests: burst.get(),
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Spend one request for `ip`. On rejection returns the number of seconds
    /// until the next request would be admitted.
    pub fn check(&self, ip: IpAddr) -> Result<(), u64> {
        self.limiter.check_key(&ip).map_err(|negative| {
            negative
                .wait_time_from(DefaultClock::default().now())
                .as_secs()
                .max(1)
        })
    }

    fn limit_header(&self) -> HeaderValue {
        HeaderValue::from(self.max_requests)
    }
}

/// Resolve the caller's IP: first `X-Forwarded-For` hop, then the socket peer.
pub fn client_ip(request: &Request) -> Option<IpAddr> {
    let forwarded_ip = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok());

    forwarded_ip.or_else(|| {
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
    })
}

/// Middleware for IP-based rate limiting
pub async fn ip_rate_limit_middleware(
    State(limiter): State<ApiRateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let Some(ip) = client_ip(&request) else {
        tracing::warn!("Could not determine IP for rate limiting");
        return next.run(request).await;
    };

    let mut response = match limiter.check(ip) {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            tracing::warn!(client_ip = %ip, retry_after, "Rate limit exceeded");
            AppError::TooManyRequests(
                "Too many requests from this IP, please try again later.".to_string(),
                Some(retry_after),
            )
            .into_response()
        }
    };

    response
        .headers_mut()
        .insert(RATE_LIMIT_LIMIT_HEADER, limiter.limit_header());
    response
}
