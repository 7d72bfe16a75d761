//! In-memory store used by tests and when no database is configured.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{PortfolioStore, StoreError, StoreResult, TemplateStore, UserStore, ViewStore};
use crate::db::models::{NewPortfolioView, NewUser, PortfolioView, User};
use crate::models::{Portfolio, SectionName, Template, TemplateCategory};

#[derive(Debug, Clone)]
struct UserRecord {
    user: User,
    verification_token_hash: Option<String>,
    reset_token_hash: Option<String>,
    reset_expires_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct MemoryStore {
    templates: RwLock<HashMap<Uuid, Template>>,
    portfolios: RwLock<HashMap<Uuid, Portfolio>>,
    users: RwLock<HashMap<Uuid, UserRecord>>,
    views: RwLock<Vec<PortfolioView>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn portfolio_not_found() -> StoreError {
    StoreError::NotFound("Portfolio".to_string())
}

fn subdomain_conflict(subdomain: &str) -> StoreError {
    StoreError::Conflict(format!("Subdomain '{}' is already taken", subdomain))
}

fn claims_subdomain(portfolio: &Portfolio, subdomain: &str, excluding: Option<Uuid>) -> bool {
    Some(portfolio.id) != excluding && portfolio.subdomain.eq_ignore_ascii_case(subdomain)
}

#[async_trait]
impl TemplateStore for MemoryStore {
    async fn list_templates(
        &self,
        category: Option<TemplateCategory>,
        active_only: bool,
    ) -> StoreResult<Vec<Template>> {
        let templates = self.templates.read().await;
        let mut list: Vec<Template> = templates
            .values()
            .filter(|t| category.map_or(true, |c| t.category == c))
            .filter(|t| !active_only || t.is_active)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));
        Ok(list)
    }

    async fn list_template_ids(&self) -> StoreResult<Vec<Uuid>> {
        Ok(self
            .list_templates(None, false)
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect())
    }

    async fn get_template(&self, id: Uuid) -> StoreResult<Template> {
        self.templates
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("Template".to_string()))
    }

    async fn insert_template(&self, template: &Template) -> StoreResult<Template> {
        let mut templates = self.templates.write().await;
        if templates.contains_key(&template.id) {
            return Err(StoreError::Conflict(format!(
                "Template {} already exists",
                template.id
            )));
        }
        let mut stored = template.clone();
        stored.revision = 0;
        templates.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn replace_template(
        &self,
        template: &Template,
        expected_revision: i64,
    ) -> StoreResult<Template> {
        let mut templates = self.templates.write().await;
        let current = templates
            .get_mut(&template.id)
            .ok_or_else(|| StoreError::NotFound("Template".to_string()))?;
        if current.revision != expected_revision {
            return Err(StoreError::RevisionMismatch {
                expected: expected_revision,
                actual: current.revision,
            });
        }
        let mut stored = template.clone();
        stored.revision = expected_revision + 1;
        *current = stored.clone();
        Ok(stored)
    }

    async fn count_templates(&self) -> StoreResult<i64> {
        Ok(self.templates.read().await.len() as i64)
    }
}

#[async_trait]
impl PortfolioStore for MemoryStore {
    async fn list_portfolios_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Portfolio>> {
        let portfolios = self.portfolios.read().await;
        let mut list: Vec<Portfolio> = portfolios
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(list)
    }

    async fn get_portfolio(&self, id: Uuid) -> StoreResult<Portfolio> {
        self.portfolios
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(portfolio_not_found)
    }

    async fn find_portfolio_by_subdomain(
        &self,
        subdomain: &str,
    ) -> StoreResult<Option<Portfolio>> {
        let portfolios = self.portfolios.read().await;
        Ok(portfolios
            .values()
            .find(|p| claims_subdomain(p, subdomain, None))
            .cloned())
    }

    async fn subdomain_taken(&self, subdomain: &str, excluding: Option<Uuid>) -> StoreResult<bool> {
        let portfolios = self.portfolios.read().await;
        Ok(portfolios
            .values()
            .any(|p| claims_subdomain(p, subdomain, excluding)))
    }

    async fn insert_portfolio(&self, portfolio: &Portfolio) -> StoreResult<Portfolio> {
        // Check and insert under one write lock so concurrent claims serialize.
        let mut portfolios = self.portfolios.write().await;
        if portfolios
            .values()
            .any(|p| claims_subdomain(p, &portfolio.subdomain, None))
        {
            return Err(subdomain_conflict(&portfolio.subdomain));
        }
        portfolios.insert(portfolio.id, portfolio.clone());
        Ok(portfolio.clone())
    }

    async fn update_portfolio(&self, portfolio: &Portfolio) -> StoreResult<Portfolio> {
        let mut portfolios = self.portfolios.write().await;
        if !portfolios.contains_key(&portfolio.id) {
            return Err(portfolio_not_found());
        }
        if portfolios
            .values()
            .any(|p| claims_subdomain(p, &portfolio.subdomain, Some(portfolio.id)))
        {
            return Err(subdomain_conflict(&portfolio.subdomain));
        }
        let stored = portfolios
            .get_mut(&portfolio.id)
            .ok_or_else(portfolio_not_found)?;
        let sections = std::mem::take(&mut stored.section_content);
        *stored = Portfolio {
            section_content: sections,
            ..portfolio.clone()
        };
        Ok(stored.clone())
    }

    async fn write_section(
        &self,
        id: Uuid,
        section: &SectionName,
        payload: &Value,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut portfolios = self.portfolios.write().await;
        let portfolio = portfolios.get_mut(&id).ok_or_else(portfolio_not_found)?;
        portfolio
            .section_content
            .insert(section.clone(), payload.clone());
        portfolio.updated_at = updated_at;
        Ok(())
    }

    async fn delete_portfolio(&self, id: Uuid) -> StoreResult<()> {
        if self.portfolios.write().await.remove(&id).is_none() {
            return Err(portfolio_not_found());
        }
        self.views.write().await.retain(|v| v.portfolio_id != id);
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|r| r.user.email.eq_ignore_ascii_case(email))
            .map(|r| r.user.clone()))
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<User> {
        self.users
            .read()
            .await
            .get(&id)
            .map(|r| r.user.clone())
            .ok_or_else(|| StoreError::NotFound("User".to_string()))
    }

    async fn insert_user(&self, new_user: NewUser) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|r| r.user.email.eq_ignore_ascii_case(&new_user.email))
        {
            return Err(StoreError::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            name: new_user.name,
            password_hash: new_user.password_hash,
            role: new_user.role,
            is_verified: false,
            created_at: Utc::now(),
        };
        users.insert(
            user.id,
            UserRecord {
                user: user.clone(),
                verification_token_hash: new_user.verification_token_hash,
                reset_token_hash: None,
                reset_expires_at: None,
            },
        );
        Ok(user)
    }

    async fn verify_email(&self, token_hash: &str) -> StoreResult<User> {
        let mut users = self.users.write().await;
        let record = users
            .values_mut()
            .find(|r| r.verification_token_hash.as_deref() == Some(token_hash))
            .ok_or_else(|| StoreError::NotFound("Verification token".to_string()))?;
        record.user.is_verified = true;
        record.verification_token_hash = None;
        Ok(record.user.clone())
    }

    async fn set_role(&self, id: Uuid, role: &str) -> StoreResult<User> {
        let mut users = self.users.write().await;
        let record = users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("User".to_string()))?;
        record.user.role = role.to_string();
        Ok(record.user.clone())
    }

    async fn set_reset_token(
        &self,
        email: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut users = self.users.write().await;
        match users
            .values_mut()
            .find(|r| r.user.email.eq_ignore_ascii_case(email))
        {
            Some(record) => {
                record.reset_token_hash = Some(token_hash.to_string());
                record.reset_expires_at = Some(expires_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn reset_password(&self, token_hash: &str, password_hash: &str) -> StoreResult<User> {
        let now = Utc::now();
        let mut users = self.users.write().await;
        let record = users
            .values_mut()
            .find(|r| {
                r.reset_token_hash.as_deref() == Some(token_hash)
                    && r.reset_expires_at.map_or(false, |at| at > now)
            })
            .ok_or_else(|| StoreError::NotFound("Reset token".to_string()))?;
        record.user.password_hash = password_hash.to_string();
        record.reset_token_hash = None;
        record.reset_expires_at = None;
        Ok(record.user.clone())
    }
}

#[async_trait]
impl ViewStore for MemoryStore {
    async fn record_view(&self, view: NewPortfolioView, window: Duration) -> StoreResult<bool> {
        let now = Utc::now();
        let window = chrono::Duration::from_std(window)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let mut views = self.views.write().await;
        let recent = views.iter().any(|v| {
            v.portfolio_id == view.portfolio_id
                && v.ip_address == view.ip_address
                && v.viewed_at > now - window
        });
        if recent {
            return Ok(false);
        }
        views.push(PortfolioView {
            id: Uuid::new_v4(),
            portfolio_id: view.portfolio_id,
            ip_address: view.ip_address,
            user_agent: view.user_agent,
            referrer: view.referrer,
            viewed_at: now,
        });
        Ok(true)
    }

    async fn count_views(&self, portfolio_id: Uuid) -> StoreResult<i64> {
        let views = self.views.read().await;
        Ok(views.iter().filter(|v| v.portfolio_id == portfolio_id).count() as i64)
    }
}
