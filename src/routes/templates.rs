/**
 * Template Routes
 * Browsing templates, category defaults, and admin enhancement/migration
 */
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::compose::{EnhanceOptions, TemplateDefaults};
use crate::error::AppResult;
use crate::migration::MigrationReport;
use crate::models::{Template, TemplateSummary};
use crate::services::templates::{self, CreateTemplateRequest, EnhanceResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TemplateQuery {
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    pub templates: Vec<TemplateSummary>,
    pub total: usize,
}

/// GET /api/templates?category=
pub async fn list_templates(
    State(state): State<AppState>,
    Query(query): Query<TemplateQuery>,
) -> AppResult<(StatusCode, Json<TemplateListResponse>)> {
    let templates = templates::list_templates(&state, query.category.as_deref()).await?;
    let total = templates.len();
    Ok((StatusCode::OK, Json(TemplateListResponse { templates, total })))
}

/// GET /api/templates/defaults/{category}
pub async fn get_defaults(Path(category): Path<String>) -> (StatusCode, Json<TemplateDefaults>) {
    (StatusCode::OK, Json(templates::get_template_defaults(&category)))
}

/// GET /api/templates/{id}
pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<Template>)> {
    let template = templates::get_template(&state, id).await?;
    Ok((StatusCode::OK, Json(template)))
}

/// POST /api/templates
pub async fn create_template(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(payload): Json<CreateTemplateRequest>,
) -> AppResult<(StatusCode, Json<Template>)> {
    let template = templates::create_template(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

/// POST /api/templates/{id}/enhance
/// Options (`force`, `animations`) come from the query string.
pub async fn enhance_template(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Query(options): Query<EnhanceOptions>,
) -> AppResult<(StatusCode, Json<EnhanceResult>)> {
    let result = templates::enhance_template(&state, id, &options).await?;
    Ok((StatusCode::OK, Json(result)))
}

/// POST /api/admin/migrate
pub async fn migrate_templates(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Query(options): Query<EnhanceOptions>,
) -> AppResult<(StatusCode, Json<MigrationReport>)> {
    tracing::info!(admin_id = %admin.user_id, "Template migration requested");
    let report = templates::migrate_templates(&state, &options).await?;
    Ok((StatusCode::OK, Json(report)))
}
