//! Per-user rate limiting for the authenticated routes.

use std::num::NonZeroU32;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::{Clock, DefaultClock},
    DefaultKeyedRateLimiter, Quota, RateLimiter,
};
use uuid::Uuid;

use super::user_auth::UserAuth;
use crate::app::AppState;
use crate::error::ApiError;

pub struct RateLimiterState {
    limiter: DefaultKeyedRateLimiter<Uuid>,
    clock: DefaultClock,
    rate_limit_per_minute: u32,
}

impl RateLimiterState {
    pub fn new(rate_limit_per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(rate_limit_per_minute).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::keyed(Quota::per_minute(per_minute)),
            clock: DefaultClock::default(),
            rate_limit_per_minute,
        }
    }

    /// `Err` carries the retry-after delay in whole seconds (at least 1).
    pub fn check(&self, user_id: Uuid) -> Result<(), u64> {
        self.limiter.check_key(&user_id).map_err(|not_until| {
            not_until
                .wait_time_from(self.clock.now())
                .as_secs()
                .max(1)
        })
    }
}

impl std::fmt::Debug for RateLimiterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiterState")
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("tracked_users", &self.limiter.len())
            .finish()
    }
}

/// Must be layered inside [`super::require_user_auth`]; requests without a
/// [`UserAuth`] extension pass through.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(user_id) = req.extensions().get::<UserAuth>().map(|a| a.user_id) else {
        return next.run(req).await;
    };

    if let Some(ref rate_limiter) = state.rate_limiter {
        if let Err(retry_after) = rate_limiter.check(user_id) {
            tracing::warn!(user_id = %user_id, retry_after, "Rate limit exceeded");
            return ApiError::RateLimited {
                limit: rate_limiter.rate_limit_per_minute,
                retry_after,
            }
            .into_response();
        }
    }

    next.run(req).await
}
