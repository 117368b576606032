use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;

use crate::{
    error::AppError,
    extractors::AppJson,
    middlewares::auth::JwtClaims,
    models::mentorship::{CreateMentorshipRequest, MentorshipEnvelope, UpdateMentorshipRequest},
    services::{mentorship_service::MentorshipService, AppState},
};

/// GET /api/mentors - Public mentor directory
pub async fn list_mentors(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let mentors = MentorshipService::new(state.repo.as_ref()).mentors().await?;
    Ok(Json(mentors))
}

/// GET /api/mentors/top-learners
pub async fn top_learners(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, AppError> {
    let rows = MentorshipService::new(state.repo.as_ref())
        .top_learners(&claims)
        .await?;
    Ok(Json(rows))
}

/// POST /api/mentorship/request
pub async fn create_request(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<CreateMentorshipRequest>,
) -> Result<impl IntoResponse, AppError> {
    let request = MentorshipService::new(state.repo.as_ref())
        .request(&claims, req)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(MentorshipEnvelope {
            message: "Mentorship request sent".to_string(),
            request,
        }),
    ))
}

/// GET /api/mentorship/requests
pub async fn list_requests(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, AppError> {
    let requests = MentorshipService::new(state.repo.as_ref())
        .list(&claims)
        .await?;
    Ok(Json(requests))
}

/// PUT /api/mentorship/requests/{id}
pub async fn update_request(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(request_id): Path<String>,
    AppJson(req): AppJson<UpdateMentorshipRequest>,
) -> Result<impl IntoResponse, AppError> {
    let request = MentorshipService::new(state.repo.as_ref())
        .update_status(&claims, &request_id, &req.status)
        .await?;
    Ok(Json(MentorshipEnvelope {
        message: "Mentorship request updated".to_string(),
        request,
    }))
}
