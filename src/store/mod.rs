//! Document Store
//!
//! Persistence seams for templates, portfolios, users and views. The
//! Postgres implementation keeps template and portfolio documents in JSONB
//! columns; the in-memory one backs tests and database-less runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::db::models::{NewPortfolioView, NewUser, User};
use crate::models::{Portfolio, SectionName, Template, TemplateCategory};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Revision mismatch: expected {expected}, found {actual}")]
    RevisionMismatch { expected: i64, actual: i64 },
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("Record".to_string()),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}

#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Templates ordered by creation time; `active_only` hides retired ones.
    async fn list_templates(
        &self,
        category: Option<TemplateCategory>,
        active_only: bool,
    ) -> StoreResult<Vec<Template>>;
    /// Every template id in listing order, without decoding documents.
    async fn list_template_ids(&self) -> StoreResult<Vec<Uuid>>;
    async fn get_template(&self, id: Uuid) -> StoreResult<Template>;
    async fn insert_template(&self, template: &Template) -> StoreResult<Template>;
    /// Whole-document replace, accepted only while the stored revision still
    /// equals `expected_revision`. The returned template carries the new revision.
    async fn replace_template(
        &self,
        template: &Template,
        expected_revision: i64,
    ) -> StoreResult<Template>;
    async fn count_templates(&self) -> StoreResult<i64>;
}

#[async_trait]
pub trait PortfolioStore: Send + Sync {
    async fn list_portfolios_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Portfolio>>;
    async fn get_portfolio(&self, id: Uuid) -> StoreResult<Portfolio>;
    /// Case-insensitive lookup.
    async fn find_portfolio_by_subdomain(&self, subdomain: &str)
        -> StoreResult<Option<Portfolio>>;
    async fn subdomain_taken(&self, subdomain: &str, excluding: Option<Uuid>)
        -> StoreResult<bool>;
    /// Fails with `Conflict` when the subdomain is already claimed.
    async fn insert_portfolio(&self, portfolio: &Portfolio) -> StoreResult<Portfolio>;
    /// Writes metadata and settings. `section_content` is left as stored,
    /// so a concurrent `write_section` is never rolled back; the returned
    /// portfolio carries the stored sections.
    async fn update_portfolio(&self, portfolio: &Portfolio) -> StoreResult<Portfolio>;
    /// Targeted write of one section; other sections are left as stored.
    async fn write_section(
        &self,
        id: Uuid,
        section: &SectionName,
        payload: &Value,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()>;
    async fn delete_portfolio(&self, id: Uuid) -> StoreResult<()>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn get_user(&self, id: Uuid) -> StoreResult<User>;
    /// Fails with `Conflict` when the email is registered already.
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;
    async fn verify_email(&self, token_hash: &str) -> StoreResult<User>;
    async fn set_role(&self, id: Uuid, role: &str) -> StoreResult<User>;
    /// Returns false when no account has that email.
    async fn set_reset_token(
        &self,
        email: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<bool>;
    /// Consumes an unexpired reset token.
    async fn reset_password(&self, token_hash: &str, password_hash: &str) -> StoreResult<User>;
}

#[async_trait]
pub trait ViewStore: Send + Sync {
    /// Records the view unless the same address viewed the portfolio within
    /// `window`. Returns whether a row was written.
    async fn record_view(&self, view: NewPortfolioView, window: Duration) -> StoreResult<bool>;
    async fn count_views(&self, portfolio_id: Uuid) -> StoreResult<i64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: StoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_pool_errors_are_backend_errors() {
        let err: StoreError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[test]
    fn test_revision_mismatch_message() {
        let err = StoreError::RevisionMismatch {
            expected: 3,
            actual: 4,
        };
        assert_eq!(err.to_string(), "Revision mismatch: expected 3, found 4");
    }
}
