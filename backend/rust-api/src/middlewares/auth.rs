use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind as JwtErrorKind, DecodingKey, EncodingKey, Header,
    Validation,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::AppError;
use crate::models::{User, UserRole};
use crate::services::AppState;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct JwtClaims {
    pub sub: String,   // user id
    pub email: String,
    pub role: UserRole,
    pub exp: usize,
    pub iat: usize,
}

impl JwtClaims {
    pub fn for_user(user: &User, ttl_seconds: i64) -> Self {
        let now = Utc::now();
        let exp = now + Duration::seconds(ttl_seconds);
        Self {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            exp: exp.timestamp().max(0) as usize,
            iat: now.timestamp().max(0) as usize,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum AuthError {
    InvalidToken,
    ExpiredToken,
    MissingToken,
    InvalidSignature,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidToken => write!(f, "Invalid token"),
            AuthError::ExpiredToken => write!(f, "Token expired"),
            AuthError::MissingToken => write!(f, "Missing authorization token"),
            AuthError::InvalidSignature => write!(f, "Invalid token signature"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::unauthorized(err.to_string())
    }
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn generate_token(&self, claims: &JwtClaims) -> Result<String, AuthError> {
        encode(&Header::default(), claims, &self.encoding_key).map_err(|_| AuthError::InvalidToken)
    }

    pub fn validate_token(&self, token: &str) -> Result<JwtClaims, AuthError> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                JwtErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::InvalidToken,
            })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Validates the bearer token and stores its [`JwtClaims`] in the request
/// extensions.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&headers).ok_or(AuthError::MissingToken)?;

    let claims = state.jwt.validate_token(token).map_err(|e| {
        tracing::warn!("JWT validation failed: {}", e);
        e
    })?;

    tracing::debug!("Authenticated user: {} (role: {})", claims.sub, claims.role);

    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

pub async fn admin_guard_middleware(request: Request, next: Next) -> Result<Response, AppError> {
    match request.extensions().get::<JwtClaims>() {
        Some(claims) if claims.role == UserRole::Admin => Ok(next.run(request).await),
        _ => {
            tracing::warn!("Access denied: admin role required");
            Err(AppError::forbidden("Admin access required"))
        }
    }
}

/// Rejects the caller unless their role is one of `allowed`.
pub fn ensure_role(claims: &JwtClaims, allowed: &[UserRole]) -> Result<(), AppError> {
    if allowed.contains(&claims.role) {
        Ok(())
    } else {
        tracing::warn!(
            user_id = %claims.sub,
            role = %claims.role,
            "Access denied: role not permitted"
        );
        Err(AppError::forbidden(format!(
            "This action is not available to the {} role",
            claims.role
        )))
    }
}
