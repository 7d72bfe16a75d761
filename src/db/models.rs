//! Database Models - rows of the relational tables (used by sqlx/serde).
//! Template and portfolio documents live in JSONB columns; see `crate::models`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::{Portfolio, Template};

pub const ROLE_USER: &str = "user";
pub const ROLE_ADMIN: &str = "admin";

/// User model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: String,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

/// New user for insertion
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub role: String,
    pub verification_token_hash: Option<String>,
}

/// Portfolio view record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioView {
    pub id: Uuid,
    pub portfolio_id: Uuid,
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub viewed_at: DateTime<Utc>,
}

/// New view for insertion
#[derive(Debug, Clone)]
pub struct NewPortfolioView {
    pub portfolio_id: Uuid,
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

/// `templates` row: the document plus its authoritative revision.
/// Decoded after the fetch so one bad document only fails itself.
#[derive(Debug, FromRow)]
pub struct TemplateRow {
    pub id: Uuid,
    pub document: Json<serde_json::Value>,
    pub revision: i64,
}

impl TemplateRow {
    pub fn into_template(self) -> Result<Template, serde_json::Error> {
        let mut template: Template = serde_json::from_value(self.document.0)?;
        template.revision = self.revision;
        Ok(template)
    }
}

/// `portfolios` row
#[derive(Debug, FromRow)]
pub struct PortfolioRow {
    pub document: Json<Portfolio>,
}

/// Portfolio stats response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioStats {
    pub portfolio_id: Uuid,
    pub total_views: i64,
}
