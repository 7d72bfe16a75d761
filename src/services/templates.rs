//! Template operations: defaults, creation, enhancement, batch migration.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::compose::{self, derive_defaults, EnhanceOptions, TemplateDefaults, TemplateDelta};
use crate::error::{AppError, AppResult};
use crate::migration::{self, MigrationReport};
use crate::models::{Template, TemplateCategory, TemplateSummary};
use crate::state::AppState;
use crate::store::StoreError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub preview_image: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceResult {
    pub template: Template,
    pub delta: TemplateDelta,
}

pub fn get_template_defaults(category: &str) -> TemplateDefaults {
    derive_defaults(category)
}

fn parse_category(category: &str) -> AppResult<TemplateCategory> {
    TemplateCategory::parse(category).ok_or_else(|| {
        AppError::validation(format!(
            "Unknown category '{}'. Valid categories: {}",
            category,
            TemplateCategory::ALL
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    })
}

pub async fn list_templates(
    state: &AppState,
    category: Option<&str>,
) -> AppResult<Vec<TemplateSummary>> {
    let category = category
        .filter(|c| !c.trim().is_empty())
        .map(parse_category)
        .transpose()?;
    let templates = state.templates.list_templates(category, true).await?;
    Ok(templates.iter().map(TemplateSummary::from).collect())
}

pub async fn get_template(state: &AppState, id: Uuid) -> AppResult<Template> {
    Ok(state.templates.get_template(id).await?)
}

/// New templates start fully populated for their category.
pub async fn create_template(state: &AppState, req: CreateTemplateRequest) -> AppResult<Template> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Template name is required"));
    }
    let category = parse_category(&req.category)?;

    let mut template = compose::new_template(name, req.description.trim(), category);
    template.preview_image = req.preview_image.filter(|p| !p.trim().is_empty());

    let stored = state.templates.insert_template(&template).await?;
    tracing::info!(template_id = %stored.id, category = %category, "Template created");
    Ok(stored)
}

/// Enhance one stored template and persist the result when anything changed.
pub async fn enhance_template(
    state: &AppState,
    id: Uuid,
    options: &EnhanceOptions,
) -> AppResult<EnhanceResult> {
    let mut template = state.templates.get_template(id).await?;
    let expected = template.revision;
    let delta = compose::enhance(&mut template, options);

    if delta.is_empty() {
        return Ok(EnhanceResult { template, delta });
    }

    let template = state
        .templates
        .replace_template(&template, expected)
        .await
        .map_err(|e| match e {
            StoreError::RevisionMismatch { .. } => {
                AppError::conflict("Template was modified concurrently, retry the request")
            }
            other => other.into(),
        })?;

    tracing::info!(
        template_id = %id,
        added = delta.added_count(),
        to_version = delta.to_version,
        "Template enhanced"
    );
    Ok(EnhanceResult { template, delta })
}

pub async fn migrate_templates(
    state: &AppState,
    options: &EnhanceOptions,
) -> AppResult<MigrationReport> {
    Ok(migration::run_migration(state.templates.as_ref(), options).await?)
}
