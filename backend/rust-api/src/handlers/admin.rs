use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::AppError,
    extractors::AppJson,
    middlewares::auth::JwtClaims,
    models::mentorship::{MentorshipEnvelope, RecommendRequest},
    models::UserRole,
    services::{
        mentorship_service::MentorshipService, progress_service::ProgressService, AppState,
    },
};

#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub role: Option<UserRole>,
}

/// GET /api/admin/users - Every user with progress, newest first
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListUsersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let rows = ProgressService::new(state.repo.as_ref())
        .progress_rows(query.role)
        .await?;
    Ok(Json(rows))
}

/// POST /api/admin/recommend - Pair a learner with a mentor
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<RecommendRequest>,
) -> Result<impl IntoResponse, AppError> {
    let request = MentorshipService::new(state.repo.as_ref())
        .recommend(&claims, req)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(MentorshipEnvelope {
            message: "Recommendation created".to_string(),
            request,
        }),
    ))
}

/// GET /api/admin/recommendations
pub async fn list_recommendations(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let recommendations = MentorshipService::new(state.repo.as_ref())
        .recommendations()
        .await?;
    Ok(Json(recommendations))
}
