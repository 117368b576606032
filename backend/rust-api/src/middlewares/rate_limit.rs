use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use redis::aio::ConnectionManager;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::services::AppState;

const LOGIN_RATE_LIMIT: u32 = 10;
const LOGIN_RATE_WINDOW_SECONDS: u64 = 300;
const REGISTER_RATE_LIMIT: u32 = 5;
const REGISTER_RATE_WINDOW_SECONDS: u64 = 3600;

/// Fixed window: the first hit sets the counter with a TTL, later hits
/// increment it until the limit.
const FIXED_WINDOW_SCRIPT: &str = r#"
    local key = KEYS[1]
    local limit = tonumber(ARGV[1])
    local window = tonumber(ARGV[2])

    local current = redis.call('GET', key)

    if current == false then
        redis.call('SET', key, 1, 'EX', window)
        return 1
    end

    current = tonumber(current)

    if current >= limit then
        return 0
    end

    redis.call('INCR', key)
    return 1
"#;

/// One rate-limited endpoint family.
#[derive(Debug, Clone, Copy)]
struct Policy {
    name: &'static str,
    limit: u32,
    window_seconds: u64,
    limit_env: &'static str,
}

const LOGIN_POLICY: Policy = Policy {
    name: "login",
    limit: LOGIN_RATE_LIMIT,
    window_seconds: LOGIN_RATE_WINDOW_SECONDS,
    limit_env: "RATE_LIMIT_LOGIN_ATTEMPTS",
};

const REGISTER_POLICY: Policy = Policy {
    name: "register",
    limit: REGISTER_RATE_LIMIT,
    window_seconds: REGISTER_RATE_WINDOW_SECONDS,
    limit_env: "RATE_LIMIT_REGISTER_ATTEMPTS",
};

impl Policy {
    fn effective_limit(&self) -> u32 {
        std::env::var(self.limit_env)
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(self.limit)
    }
}

fn extract_client_ip_from(headers: &HeaderMap, extensions: &axum::http::Extensions) -> String {
    // X-Forwarded-For, X-Real-IP, then the socket address.
    if let Some(first) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
    {
        return first.trim().to_string();
    }

    if let Some(v) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return v.trim().to_string();
    }

    if let Some(ci) = extensions.get::<ConnectInfo<SocketAddr>>() {
        return ci.0.ip().to_string();
    }

    "unknown".to_string()
}

fn rate_limit_disabled() -> bool {
    std::env::var("RATE_LIMIT_DISABLED").unwrap_or_default() == "1"
}

async fn check_rate_limit_with_window(
    redis: &ConnectionManager,
    key: &str,
    limit: u32,
    window_seconds: u64,
) -> redis::RedisResult<bool> {
    let mut conn = redis.clone();
    let allowed: u32 = redis::Script::new(FIXED_WINDOW_SCRIPT)
        .key(key)
        .arg(limit)
        .arg(window_seconds)
        .invoke_async(&mut conn)
        .await?;
    Ok(allowed == 1)
}

fn too_many_requests() -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({
            "error": "Too many requests, please try again later",
            "status": StatusCode::TOO_MANY_REQUESTS.as_u16()
        })),
    )
        .into_response()
}

async fn enforce(state: &AppState, policy: Policy, request: Request, next: Next) -> Response {
    let Some(redis) = state.redis.as_ref() else {
        return next.run(request).await;
    };
    if rate_limit_disabled() {
        tracing::debug!("Rate limiting disabled via RATE_LIMIT_DISABLED=1");
        return next.run(request).await;
    }

    let client_ip = extract_client_ip_from(request.headers(), request.extensions());
    let key = format!("ratelimit:{}:{}", policy.name, client_ip);

    match check_rate_limit_with_window(
        redis,
        &key,
        policy.effective_limit(),
        policy.window_seconds,
    )
    .await
    {
        Ok(true) => next.run(request).await,
        Ok(false) => {
            tracing::warn!("{} rate limit exceeded for IP: {}", policy.name, client_ip);
            too_many_requests()
        }
        Err(e) => {
            // Availability over strictness when Redis is down.
            tracing::warn!("{} rate limit check failed, allowing request: {}", policy.name, e);
            next.run(request).await
        }
    }
}

/// 10 attempts per 5 minutes per IP.
pub async fn login_rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    enforce(&state, LOGIN_POLICY, request, next).await
}

/// 5 registrations per hour per IP.
pub async fn register_rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    enforce(&state, REGISTER_POLICY, request, next).await
}
