/**
 * Template Migration
 * Batch job bringing every stored template up to the current schema
 */
use serde::Serialize;
use uuid::Uuid;

use crate::compose::{enhance, new_template, EnhanceOptions};
use crate::models::{capitalize, TemplateCategory};
use crate::store::{StoreError, StoreResult, TemplateStore};

/// Revision conflicts are retried this many times before a template is
/// reported as failed.
pub const MAX_CONFLICT_RETRIES: usize = 3;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationFailure {
    pub id: Uuid,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub processed: usize,
    pub updated: Vec<Uuid>,
    pub unchanged: Vec<Uuid>,
    pub failed: Vec<MigrationFailure>,
}

enum Outcome {
    Updated,
    Unchanged,
}

async fn migrate_one(
    store: &dyn TemplateStore,
    id: Uuid,
    options: &EnhanceOptions,
) -> StoreResult<Outcome> {
    let mut retries = 0;
    loop {
        let mut template = store.get_template(id).await?;
        let expected = template.revision;
        let delta = enhance(&mut template, options);
        if delta.is_empty() {
            return Ok(Outcome::Unchanged);
        }

        match store.replace_template(&template, expected).await {
            Ok(_) => {
                tracing::info!(
                    template_id = %id,
                    added = delta.added_count(),
                    steps = ?delta.steps_applied,
                    "Template migrated"
                );
                return Ok(Outcome::Updated);
            }
            Err(StoreError::RevisionMismatch { actual, .. }) if retries < MAX_CONFLICT_RETRIES => {
                retries += 1;
                tracing::debug!(
                    template_id = %id,
                    expected,
                    actual,
                    retries,
                    "Template changed during migration, retrying"
                );
            }
            Err(e) => return Err(e),
        }
    }
}

/// Enhance every stored template in turn. A failing template is logged and
/// recorded; the run continues with the next one.
pub async fn run_migration(
    store: &dyn TemplateStore,
    options: &EnhanceOptions,
) -> StoreResult<MigrationReport> {
    let ids = store.list_template_ids().await?;
    tracing::info!("Migrating {} templates", ids.len());

    let mut report = MigrationReport::default();
    for id in ids {
        report.processed += 1;
        match migrate_one(store, id, options).await {
            Ok(Outcome::Updated) => report.updated.push(id),
            Ok(Outcome::Unchanged) => report.unchanged.push(id),
            Err(e) => {
                tracing::warn!(template_id = %id, "Template migration failed: {}", e);
                report.failed.push(MigrationFailure {
                    id,
                    error: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        processed = report.processed,
        updated = report.updated.len(),
        unchanged = report.unchanged.len(),
        failed = report.failed.len(),
        "Template migration finished"
    );
    Ok(report)
}

/// Insert one starter template per category when the collection is empty.
/// Returns the number of templates inserted.
pub async fn seed_default_templates(store: &dyn TemplateStore) -> StoreResult<usize> {
    if store.count_templates().await? > 0 {
        return Ok(0);
    }

    let mut inserted = 0;
    for category in TemplateCategory::ALL {
        let label = capitalize(category.as_str());
        let template = new_template(
            format!("{} Portfolio", label),
            format!("Starter template for {} portfolios", category.as_str()),
            category,
        );
        store.insert_template(&template).await?;
        inserted += 1;
    }

    tracing::info!("Seeded {} starter templates", inserted);
    Ok(inserted)
}
