use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use subtle::{Choice, ConstantTimeEq};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::ApiError;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Which configured key set authenticated the request. Stored as a request
/// extension by [`require_bearer_auth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    Client,
    Admin,
}

type KeyDigest = [u8; 32];

/// API key auth settings used by middleware.
///
/// Keys are held only as salted SHA-256 digests and compared in constant time.
#[derive(Clone)]
pub struct AuthState {
    client_keys: Arc<Vec<KeyDigest>>,
    admin_keys: Arc<Vec<KeyDigest>>,
    salt: Arc<str>,
    pub enabled: bool,
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("client_keys", &self.client_keys.len())
            .field("admin_keys", &self.admin_keys.len())
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl AuthState {
    /// Builds auth config from `PRODZM_API_KEYS` and `PRODZM_ADMIN_API_KEYS`
    /// (comma-separated bearer tokens).
    ///
    /// In development, no keys at all disables auth for local iteration.
    /// In non-development envs, no keys fails startup.
    pub fn from_env(is_development: bool, salt: &str) -> anyhow::Result<Self> {
        let client_raw = std::env::var("PRODZM_API_KEYS").unwrap_or_default();
        let admin_raw = std::env::var("PRODZM_ADMIN_API_KEYS").unwrap_or_default();
        Self::from_key_lists(is_development, salt, &client_raw, &admin_raw)
    }

    pub fn from_key_lists(
        is_development: bool,
        salt: &str,
        client_raw: &str,
        admin_raw: &str,
    ) -> anyhow::Result<Self> {
        let client_keys = digest_key_list(salt, client_raw);
        let admin_keys = digest_key_list(salt, admin_raw);

        if client_keys.is_empty() && admin_keys.is_empty() {
            if is_development {
                tracing::warn!(
                    "PRODZM_API_KEYS and PRODZM_ADMIN_API_KEYS not set; bearer auth disabled in development environment"
                );
                return Ok(Self {
                    client_keys: Arc::new(Vec::new()),
                    admin_keys: Arc::new(Vec::new()),
                    salt: Arc::from(salt),
                    enabled: false,
                });
            }

            anyhow::bail!(
                "PRODZM_API_KEYS is required outside development; provide comma-separated bearer tokens"
            );
        }

        if admin_keys.is_empty() {
            tracing::warn!(
                "PRODZM_ADMIN_API_KEYS not set; admin endpoints will reject every request"
            );
        }

        Ok(Self {
            client_keys: Arc::new(client_keys),
            admin_keys: Arc::new(admin_keys),
            salt: Arc::from(salt),
            enabled: true,
        })
    }

    fn identify(&self, token: &str) -> Option<Caller> {
        let digest = digest_key(&self.salt, token);
        if contains_digest(&self.admin_keys, &digest) {
            Some(Caller::Admin)
        } else if contains_digest(&self.client_keys, &digest) {
            Some(Caller::Client)
        } else {
            None
        }
    }
}

fn digest_key(salt: &str, key: &str) -> KeyDigest {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(key.as_bytes());
    hasher.finalize().into()
}

fn digest_key_list(salt: &str, raw: &str) -> Vec<KeyDigest> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|key| digest_key(salt, key))
        .collect()
}

/// Compares against every stored digest so timing does not reveal which one matched.
fn contains_digest(keys: &[KeyDigest], candidate: &KeyDigest) -> bool {
    keys.iter()
        .fold(Choice::from(0), |found, key| found | key[..].ct_eq(&candidate[..]))
        .into()
}

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter for simple API protection.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    state: Arc<Mutex<RateLimitWindow>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Arc::new(Mutex::new(RateLimitWindow {
                started_at: Instant::now(),
                count: 0,
            })),
        }
    }

    #[must_use]
    pub fn from_config(config: &prodzm_core::AppConfig) -> Self {
        Self::new(
            config.rate_limit_max_requests,
            Duration::from_secs(config.rate_limit_window_secs),
        )
    }
}

fn request_id_of(req: &Request) -> String {
    req.extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default()
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware enforcing Bearer token auth when enabled. Admin keys are
/// accepted wherever client keys are.
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        req.extensions_mut().insert(Caller::Admin);
        return next.run(req).await;
    }

    let caller = extract_bearer_token(req.headers().get(AUTHORIZATION))
        .and_then(|token| auth.identify(token));

    if let Some(caller) = caller {
        req.extensions_mut().insert(caller);
        next.run(req).await
    } else {
        tracing::debug!(path = %req.uri().path(), "rejected request without a valid bearer token");
        ApiError::new(
            request_id_of(&req),
            "unauthorized",
            "missing or invalid bearer token",
        )
        .into_response()
    }
}

/// Middleware restricting a route to admin keys. Must run inside
/// [`require_bearer_auth`].
pub async fn require_admin(req: Request, next: Next) -> Response {
    if req.extensions().get::<Caller>() == Some(&Caller::Admin) {
        return next.run(req).await;
    }

    tracing::debug!(path = %req.uri().path(), "rejected non-admin caller");
    ApiError::new(
        request_id_of(&req),
        "forbidden",
        "this endpoint requires an admin key",
    )
    .into_response()
}

/// Middleware enforcing a fixed request-per-window limit.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let mut window = rate_limit.state.lock().await;
    let elapsed = window.started_at.elapsed();

    if elapsed >= rate_limit.window {
        window.started_at = Instant::now();
        window.count = 0;
    }

    if window.count >= rate_limit.max_requests {
        drop(window);
        tracing::warn!(max_requests = rate_limit.max_requests, "rate limit exceeded");
        return ApiError::new(request_id_of(&req), "rate_limited", "rate limit exceeded")
            .into_response();
    }

    window.count += 1;
    drop(window);

    next.run(req).await
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|s| !s.trim().is_empty())
}
