use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::{
    error::AppError,
    middlewares::auth::JwtClaims,
    services::{progress_service::ProgressService, AppState},
};

/// GET /api/users/{id} - Profile with progress
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let profile = ProgressService::new(state.repo.as_ref())
        .profile_for(&claims, &user_id)
        .await?;
    Ok(Json(profile))
}

/// POST /api/users/{id}/reset-progress - Self or admin
pub async fn reset_progress(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    ProgressService::new(state.repo.as_ref())
        .reset_progress(&claims, &user_id)
        .await?;
    Ok(Json(json!({ "message": "Progress reset successfully" })))
}
