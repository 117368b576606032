use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::{
    error::AppError,
    extractors::AppJson,
    middlewares::auth::JwtClaims,
    models::user::{CreateAdminRequest, LoginRequest, RegisterRequest},
    services::{auth_service::AuthService, AppState},
};

/// POST /api/register - Register a learner or mentor
pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = AuthService::from_state(&state).register(req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/login - Exchange credentials for a token
pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = AuthService::from_state(&state).login(req).await?;
    Ok(Json(response))
}

/// POST /api/admin/create-admin - Create another admin account
pub async fn create_admin(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<CreateAdminRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = AuthService::from_state(&state)
        .create_admin(&claims, req)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Admin created successfully",
            "user": user
        })),
    ))
}
