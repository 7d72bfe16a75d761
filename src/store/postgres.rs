//! Postgres-backed store. Documents are JSONB; identity, ownership and
//! subdomain columns are mirrored out of the document for indexing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

use super::{PortfolioStore, StoreError, StoreResult, TemplateStore, UserStore, ViewStore};
use crate::db::models::{NewPortfolioView, NewUser, PortfolioRow, TemplateRow, User};
use crate::models::{Portfolio, SectionName, Template, TemplateCategory};

const USER_COLUMNS: &str = "id, email, name, password_hash, role, is_verified, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Unique violations on the portfolio table can only come from the
/// subdomain index.
fn subdomain_error(err: sqlx::Error, subdomain: &str) -> StoreError {
    match StoreError::from(err) {
        StoreError::Conflict(_) => {
            StoreError::Conflict(format!("Subdomain '{}' is already taken", subdomain))
        }
        other => other,
    }
}

#[async_trait]
impl TemplateStore for PgStore {
    async fn list_templates(
        &self,
        category: Option<TemplateCategory>,
        active_only: bool,
    ) -> StoreResult<Vec<Template>> {
        let rows = sqlx::query_as::<_, TemplateRow>(
            r#"
            SELECT id, document, revision FROM templates
            WHERE ($1::text IS NULL OR category = $1)
              AND (NOT $2 OR COALESCE((document->>'isActive')::boolean, true))
            ORDER BY created_at, name
            "#,
        )
        .bind(category.map(|c| c.as_str()))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id;
                row.into_template()
                    .map_err(|e| tracing::warn!(template_id = %id, "Skipping unreadable template: {}", e))
                    .ok()
            })
            .collect())
    }

    async fn list_template_ids(&self) -> StoreResult<Vec<Uuid>> {
        Ok(
            sqlx::query_scalar::<_, Uuid>("SELECT id FROM templates ORDER BY created_at, name")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn get_template(&self, id: Uuid) -> StoreResult<Template> {
        let row = sqlx::query_as::<_, TemplateRow>(
            "SELECT id, document, revision FROM templates WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound("Template".to_string()))?;
        Ok(row.into_template()?)
    }

    async fn insert_template(&self, template: &Template) -> StoreResult<Template> {
        let mut stored = template.clone();
        stored.revision = 0;

        sqlx::query(
            r#"
            INSERT INTO templates (id, name, category, document, revision, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 0, $5, $6)
            "#,
        )
        .bind(stored.id)
        .bind(&stored.name)
        .bind(stored.category.as_str())
        .bind(Json(&stored))
        .bind(stored.created_at)
        .bind(stored.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(stored)
    }

    async fn replace_template(
        &self,
        template: &Template,
        expected_revision: i64,
    ) -> StoreResult<Template> {
        let mut stored = template.clone();
        stored.revision = expected_revision + 1;

        let result = sqlx::query(
            r#"
            UPDATE templates
            SET name = $2, category = $3, document = $4, revision = revision + 1, updated_at = $5
            WHERE id = $1 AND revision = $6
            "#,
        )
        .bind(stored.id)
        .bind(&stored.name)
        .bind(stored.category.as_str())
        .bind(Json(&stored))
        .bind(stored.updated_at)
        .bind(expected_revision)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let actual: Option<i64> =
                sqlx::query_scalar("SELECT revision FROM templates WHERE id = $1")
                    .bind(stored.id)
                    .fetch_optional(&self.pool)
                    .await?;
            return Err(match actual {
                Some(actual) => StoreError::RevisionMismatch {
                    expected: expected_revision,
                    actual,
                },
                None => StoreError::NotFound("Template".to_string()),
            });
        }

        Ok(stored)
    }

    async fn count_templates(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM templates")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl PortfolioStore for PgStore {
    async fn list_portfolios_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Portfolio>> {
        let rows = sqlx::query_as::<_, PortfolioRow>(
            "SELECT document FROM portfolios WHERE user_id = $1 ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.document.0).collect())
    }

    async fn get_portfolio(&self, id: Uuid) -> StoreResult<Portfolio> {
        sqlx::query_as::<_, PortfolioRow>("SELECT document FROM portfolios WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(|r| r.document.0)
            .ok_or_else(|| StoreError::NotFound("Portfolio".to_string()))
    }

    async fn find_portfolio_by_subdomain(
        &self,
        subdomain: &str,
    ) -> StoreResult<Option<Portfolio>> {
        let row = sqlx::query_as::<_, PortfolioRow>(
            "SELECT document FROM portfolios WHERE LOWER(subdomain) = LOWER($1)",
        )
        .bind(subdomain)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.document.0))
    }

    async fn subdomain_taken(&self, subdomain: &str, excluding: Option<Uuid>) -> StoreResult<bool> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM portfolios
                WHERE LOWER(subdomain) = LOWER($1) AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(subdomain)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn insert_portfolio(&self, portfolio: &Portfolio) -> StoreResult<Portfolio> {
        sqlx::query(
            r#"
            INSERT INTO portfolios
                (id, user_id, template_id, subdomain, is_published, document, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(portfolio.id)
        .bind(portfolio.user_id)
        .bind(portfolio.template_id)
        .bind(&portfolio.subdomain)
        .bind(portfolio.is_published)
        .bind(Json(portfolio))
        .bind(portfolio.created_at)
        .bind(portfolio.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| subdomain_error(e, &portfolio.subdomain))?;

        Ok(portfolio.clone())
    }

    async fn update_portfolio(&self, portfolio: &Portfolio) -> StoreResult<Portfolio> {
        let row = sqlx::query_as::<_, PortfolioRow>(
            r#"
            UPDATE portfolios
            SET template_id = $2, subdomain = $3, is_published = $4,
                document = $5 || jsonb_build_object(
                    'sectionContent', COALESCE(document->'sectionContent', '{}'::jsonb)),
                updated_at = $6
            WHERE id = $1
            RETURNING document
            "#,
        )
        .bind(portfolio.id)
        .bind(portfolio.template_id)
        .bind(&portfolio.subdomain)
        .bind(portfolio.is_published)
        .bind(Json(portfolio))
        .bind(portfolio.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| subdomain_error(e, &portfolio.subdomain))?;

        row.map(|r| r.document.0)
            .ok_or_else(|| StoreError::NotFound("Portfolio".to_string()))
    }

    async fn write_section(
        &self,
        id: Uuid,
        section: &SectionName,
        payload: &Value,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE portfolios
            SET document = jsonb_set(
                    jsonb_set(document, ARRAY['sectionContent', $2::text], $3, true),
                    '{updatedAt}', $4, true),
                updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(section.as_str())
        .bind(Json(payload))
        .bind(Json(updated_at))
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Portfolio".to_string()));
        }
        Ok(())
    }

    async fn delete_portfolio(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM portfolios WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Portfolio".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound("User".to_string()))
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, name, password_hash, role, verification_token_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(&user.role)
        .bind(&user.verification_token_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match StoreError::from(e) {
            StoreError::Conflict(_) => {
                StoreError::Conflict("An account with this email already exists".to_string())
            }
            other => other,
        })
    }

    async fn verify_email(&self, token_hash: &str) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET is_verified = true, verification_token_hash = NULL
            WHERE verification_token_hash = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound("Verification token".to_string()))
    }

    async fn set_role(&self, id: Uuid, role: &str) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = $2 WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound("User".to_string()))
    }

    async fn set_reset_token(
        &self,
        email: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users SET reset_token_hash = $2, reset_expires_at = $3
            WHERE LOWER(email) = LOWER($1)
            "#,
        )
        .bind(email)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn reset_password(&self, token_hash: &str, password_hash: &str) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET password_hash = $2, reset_token_hash = NULL, reset_expires_at = NULL
            WHERE reset_token_hash = $1 AND reset_expires_at > now()
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(token_hash)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound("Reset token".to_string()))
    }
}

#[async_trait]
impl ViewStore for PgStore {
    async fn record_view(&self, view: NewPortfolioView, window: Duration) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO portfolio_views (portfolio_id, ip_address, user_agent, referrer)
            SELECT $1, $2, $3, $4
            WHERE NOT EXISTS (
                SELECT 1 FROM portfolio_views
                WHERE portfolio_id = $1 AND ip_address = $2
                  AND viewed_at > now() - make_interval(secs => $5)
            )
            "#,
        )
        .bind(view.portfolio_id)
        .bind(&view.ip_address)
        .bind(&view.user_agent)
        .bind(&view.referrer)
        .bind(window.as_secs_f64())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_views(&self, portfolio_id: Uuid) -> StoreResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM portfolio_views WHERE portfolio_id = $1")
                .bind(portfolio_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
