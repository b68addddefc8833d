//! Rate limiting middleware using tower-governor
//!
//! Login endpoints are limited per client IP, the rest of the API per
//! session token. Requests without a key pass through untouched.

use anyhow::{Context, Result};
use axum::{
    extract::{ConnectInfo, Request},
    http::StatusCode,
    middleware::{self, Next},
    response::IntoResponse,
    Router,
};
use std::net::{IpAddr, SocketAddr};
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::KeyExtractor, GovernorError,
};
use tracing::warn;

use crate::server::error::ApiError;
use crate::server::metrics::record_rate_limit_hit;
use crate::server::session::presented_session_token;

/// Login attempts per minute per IP
pub const LOGIN_PER_MINUTE: u32 = 10;

/// Requests per minute per session token
pub const REQUESTS_PER_MINUTE: u32 = 1000;

/// Above this many tracked keys, stale ones are dropped.
const MAX_TRACKED_KEYS: usize = 10_000;

/// Extracts the client IP from ConnectInfo
#[derive(Clone)]
pub struct ClientIpKeyExtractor;

impl KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Extracts the session token the request presents, valid or not
#[derive(Clone)]
pub struct SessionTokenKeyExtractor;

impl KeyExtractor for SessionTokenKeyExtractor {
    type Key = String;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        presented_session_token(req.headers()).ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Wraps `router` so that each key gets `per_minute` requests per minute,
/// all of them usable in a burst. Zero leaves the router unlimited.
pub fn throttled<K>(
    router: Router,
    key_extractor: K,
    per_minute: u32,
    scope: &'static str,
) -> Result<Router>
where
    K: KeyExtractor + Clone + Send + Sync + 'static,
    K::Key: Send + Sync + 'static,
{
    if per_minute == 0 {
        return Ok(router);
    }

    let config = GovernorConfigBuilder::default()
        .key_extractor(key_extractor.clone())
        .per_millisecond((60_000 / u64::from(per_minute)).max(1))
        .burst_size(per_minute)
        .finish()
        .with_context(|| format!("Invalid {} rate limit of {} per minute", scope, per_minute))?;
    let limiter = config.limiter().clone();

    Ok(router.layer(middleware::from_fn(move |request: Request, next: Next| {
        let rejected = match key_extractor.extract(&request) {
            Ok(key) => {
                if limiter.len() > MAX_TRACKED_KEYS {
                    limiter.retain_recent();
                }
                limiter.check_key(&key).is_err()
            }
            Err(_) => false,
        };
        if rejected {
            warn!(
                "Rate limit exceeded: {} {} scope={}",
                request.method(),
                request.uri().path(),
                scope
            );
            record_rate_limit_hit(scope);
        }
        async move {
            if rejected {
                return ApiError::new(StatusCode::TOO_MANY_REQUESTS, "Request was throttled.")
                    .into_response();
            }
            next.run(request).await
        }
    })))
}
