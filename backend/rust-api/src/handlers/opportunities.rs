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
    middlewares::auth::{ensure_role, JwtClaims},
    models::opportunity::{
        CreateOpportunityRequest, OpportunityEnvelope, RespondOpportunityRequest,
    },
    models::{ResponseDecision, UserRole},
    services::{opportunity_service::OpportunityService, AppState},
};

/// POST /api/opportunities - Mentor posts an opportunity
pub async fn create_opportunity(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<CreateOpportunityRequest>,
) -> Result<impl IntoResponse, AppError> {
    let opportunity = OpportunityService::new(state.repo.as_ref())
        .create(&claims, req)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(OpportunityEnvelope {
            message: "Opportunity created".to_string(),
            opportunity,
        }),
    ))
}

/// GET /api/opportunities - Filtered by the caller's role
pub async fn list_opportunities(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, AppError> {
    let opportunities = OpportunityService::new(state.repo.as_ref())
        .list(&claims)
        .await?;
    Ok(Json(opportunities))
}

/// POST /api/opportunities/{id}/respond - `{"status": "accepted" | "declined"}`
pub async fn respond_to_opportunity(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(opportunity_id): Path<String>,
    AppJson(req): AppJson<RespondOpportunityRequest>,
) -> Result<impl IntoResponse, AppError> {
    ensure_role(&claims, &[UserRole::Learner])?;
    let decision = ResponseDecision::from_status(&req.status)
        .ok_or_else(|| AppError::invalid_input("Status must be 'accepted' or 'declined'"))?;

    let opportunity = OpportunityService::new(state.repo.as_ref())
        .respond(&opportunity_id, &claims, decision)
        .await?;
    Ok(Json(OpportunityEnvelope {
        message: format!("Opportunity {}", opportunity.status.as_str()),
        opportunity,
    }))
}

/// GET /api/matches
pub async fn list_matches(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, AppError> {
    let matches = OpportunityService::new(state.repo.as_ref())
        .list_matches(&claims)
        .await?;
    Ok(Json(matches))
}
