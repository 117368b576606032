use axum::{
    extract::{Path, State},
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
    models::module::{CreateModuleRequest, UpdateModuleRequest},
    services::{module_service::ModuleService, progress_service::ProgressService, AppState},
};

/// GET /api/modules - Catalog in creation order
pub async fn list_modules(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let modules = ModuleService::new(state.repo.as_ref()).list().await?;
    Ok(Json(modules))
}

/// GET /api/modules/{id}
pub async fn get_module(
    State(state): State<Arc<AppState>>,
    Path(module_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let module = ModuleService::new(state.repo.as_ref())
        .get(&module_id)
        .await?;
    Ok(Json(module))
}

/// POST /api/modules - Admin only
pub async fn create_module(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CreateModuleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let module = ModuleService::new(state.repo.as_ref()).create(req).await?;
    Ok((StatusCode::CREATED, Json(module)))
}

/// PUT /api/modules/{id} - Admin only
pub async fn update_module(
    State(state): State<Arc<AppState>>,
    Path(module_id): Path<String>,
    AppJson(req): AppJson<UpdateModuleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let module = ModuleService::new(state.repo.as_ref())
        .update(&module_id, req)
        .await?;
    Ok(Json(module))
}

/// DELETE /api/modules/{id} - Admin only
pub async fn delete_module(
    State(state): State<Arc<AppState>>,
    Path(module_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    ModuleService::new(state.repo.as_ref())
        .delete(&module_id)
        .await?;
    Ok(Json(json!({ "message": "Module deleted successfully" })))
}

/// POST /api/modules/{id}/complete - Mark the module complete for the caller
pub async fn complete_module(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(module_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = ProgressService::new(state.repo.as_ref())
        .mark_complete(&claims.sub, &module_id)
        .await?;
    Ok(Json(outcome))
}
