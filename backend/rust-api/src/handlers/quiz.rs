use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::{
    error::AppError,
    extractors::AppJson,
    models::quiz::SubmitQuizRequest,
    services::{module_service::ModuleService, AppState},
};

/// GET /api/modules/{id}/quiz - Questions without the answer key
pub async fn get_quiz(
    State(state): State<Arc<AppState>>,
    Path(module_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = ModuleService::new(state.repo.as_ref())
        .public_quiz(&module_id)
        .await?;
    Ok(Json(quiz))
}

/// POST /api/modules/{id}/quiz/submit
pub async fn submit_quiz(
    State(state): State<Arc<AppState>>,
    Path(module_id): Path<String>,
    AppJson(req): AppJson<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let answers = req.into_answers();
    let result = ModuleService::new(state.repo.as_ref())
        .submit_quiz(&module_id, &answers)
        .await?;
    Ok(Json(result))
}
