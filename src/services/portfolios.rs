//! Portfolio operations: creation, settings, section edits, publishing
//! and views. Every mutation goes through an ownership check first.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::compose::{initial_content, resolve_settings, ThemeSelection};
use crate::content::{self, ItemSelector, OwnershipProof};
use crate::db::models::{NewPortfolioView, PortfolioStats};
use crate::error::{AppError, AppResult};
use crate::models::{validate_subdomain, Portfolio, SectionContent, SectionName, Template};
use crate::state::AppState;

/// Repeat views from one address inside this window count once.
pub const VIEW_DEDUP_WINDOW: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePortfolioRequest {
    pub template_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    pub subdomain: String,
    #[serde(default)]
    pub color_scheme_id: Option<String>,
    #[serde(default)]
    pub font_pairing_id: Option<String>,
    #[serde(default)]
    pub layout_id: Option<String>,
    /// Overrides the section order of the chosen layout.
    #[serde(default)]
    pub sections: Option<Vec<SectionName>>,
    #[serde(default, alias = "sectionContent")]
    pub content: SectionContent,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePortfolioRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub subdomain: Option<String>,
    #[serde(default)]
    pub custom_domain: Option<String>,
    #[serde(default)]
    pub is_published: Option<bool>,
    #[serde(default)]
    pub color_scheme_id: Option<String>,
    #[serde(default)]
    pub font_pairing_id: Option<String>,
    #[serde(default)]
    pub layout_id: Option<String>,
    #[serde(default)]
    pub sections: Option<Vec<SectionName>>,
    #[serde(default)]
    pub show_header: Option<bool>,
    #[serde(default)]
    pub show_footer: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubdomainAvailability {
    pub subdomain: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Visitor {
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

fn require_title(title: &str) -> AppResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::validation("Title is required"));
    }
    Ok(title.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn ensure_subdomain_free(
    state: &AppState,
    subdomain: &str,
    excluding: Option<Uuid>,
) -> AppResult<()> {
    validate_subdomain(subdomain).map_err(AppError::Validation)?;
    if state.portfolios.subdomain_taken(subdomain, excluding).await? {
        return Err(AppError::conflict(format!(
            "Subdomain '{}' is already taken",
            subdomain
        )));
    }
    Ok(())
}

/// Load a portfolio and prove the caller owns it. Existence is checked first.
async fn load_owned(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<(Portfolio, OwnershipProof)> {
    let portfolio = state.portfolios.get_portfolio(id).await?;
    let proof = OwnershipProof::for_owner(&portfolio, user.user_id)?;
    Ok((portfolio, proof))
}

pub async fn check_subdomain(state: &AppState, subdomain: &str) -> AppResult<SubdomainAvailability> {
    let reason = match validate_subdomain(subdomain) {
        Err(msg) => Some(msg),
        Ok(()) if state.portfolios.subdomain_taken(subdomain, None).await? => {
            Some("Subdomain is already taken".to_string())
        }
        Ok(()) => None,
    };
    Ok(SubdomainAvailability {
        subdomain: subdomain.to_string(),
        available: reason.is_none(),
        reason,
    })
}

pub async fn create_portfolio(
    state: &AppState,
    user: &AuthUser,
    req: CreatePortfolioRequest,
) -> AppResult<Portfolio> {
    let title = require_title(&req.title)?;
    ensure_subdomain_free(state, &req.subdomain, None).await?;

    let template = state.templates.get_template(req.template_id).await?;
    if !template.is_active {
        return Err(AppError::validation("Template is no longer available"));
    }

    let selection = ThemeSelection {
        color_scheme_id: req.color_scheme_id,
        font_pairing_id: req.font_pairing_id,
        layout_id: req.layout_id,
    };
    let mut settings = resolve_settings(&template, &selection);
    if let Some(sections) = req.sections {
        settings.layout.sections = sections;
    }
    let section_content = initial_content(&template, &settings.layout.sections, &req.content);

    let now = Utc::now();
    let portfolio = Portfolio {
        id: Uuid::new_v4(),
        user_id: user.user_id,
        template_id: template.id,
        title,
        subtitle: non_blank(req.subtitle),
        subdomain: req.subdomain,
        custom_domain: None,
        is_published: false,
        settings,
        section_content,
        created_at: now,
        updated_at: now,
    };

    // The unique index still catches a concurrent claim of the same subdomain.
    let stored = state.portfolios.insert_portfolio(&portfolio).await?;
    tracing::info!(
        portfolio_id = %stored.id,
        user_id = %user.user_id,
        subdomain = %stored.subdomain,
        "Portfolio created"
    );
    Ok(stored)
}

pub async fn list_portfolios(state: &AppState, user: &AuthUser) -> AppResult<Vec<Portfolio>> {
    Ok(state.portfolios.list_portfolios_by_user(user.user_id).await?)
}

pub async fn get_portfolio(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<Portfolio> {
    let (portfolio, _) = load_owned(state, user, id).await?;
    Ok(portfolio)
}

fn apply_theme(template: &Template, portfolio: &mut Portfolio, req: &UpdatePortfolioRequest) -> AppResult<()> {
    let settings = &mut portfolio.settings;
    if let Some(id) = &req.color_scheme_id {
        let scheme = template
            .color_scheme(id)
            .ok_or_else(|| AppError::validation(format!("Unknown color scheme '{}'", id)))?;
        settings.color_scheme_id = Some(scheme.id.clone());
        settings.colors = scheme.colors.clone();
    }
    if let Some(id) = &req.font_pairing_id {
        let pairing = template
            .font_pairing(id)
            .ok_or_else(|| AppError::validation(format!("Unknown font pairing '{}'", id)))?;
        settings.font_pairing_id = Some(pairing.id.clone());
        settings.fonts = pairing.fonts.clone();
    }
    if let Some(id) = &req.layout_id {
        let layout = template
            .layout(id)
            .ok_or_else(|| AppError::validation(format!("Unknown layout '{}'", id)))?;
        settings.layout_id = Some(layout.id.clone());
        settings.layout.sections = layout.structure.sections.clone();
    }
    Ok(())
}

pub async fn update_portfolio(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    req: UpdatePortfolioRequest,
) -> AppResult<Portfolio> {
    let (mut portfolio, _) = load_owned(state, user, id).await?;

    if let Some(title) = &req.title {
        portfolio.title = require_title(title)?;
    }
    if req.subtitle.is_some() {
        portfolio.subtitle = non_blank(req.subtitle.clone());
    }
    if let Some(subdomain) = &req.subdomain {
        if subdomain != &portfolio.subdomain {
            ensure_subdomain_free(state, subdomain, Some(id)).await?;
            portfolio.subdomain = subdomain.clone();
        }
    }
    if req.custom_domain.is_some() {
        portfolio.custom_domain = non_blank(req.custom_domain.clone());
    }
    if let Some(published) = req.is_published {
        portfolio.is_published = published;
    }

    if req.color_scheme_id.is_some() || req.font_pairing_id.is_some() || req.layout_id.is_some() {
        let template = state.templates.get_template(portfolio.template_id).await?;
        apply_theme(&template, &mut portfolio, &req)?;
    }
    if let Some(sections) = req.sections {
        portfolio.settings.layout.sections = sections;
    }
    if let Some(show) = req.show_header {
        portfolio.settings.layout.show_header = show;
    }
    if let Some(show) = req.show_footer {
        portfolio.settings.layout.show_footer = show;
    }

    portfolio.updated_at = Utc::now();
    Ok(state.portfolios.update_portfolio(&portfolio).await?)
}

/// Merge `patch` into one section and return the updated section payload.
pub async fn update_portfolio_section(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    section: SectionName,
    patch: &Value,
) -> AppResult<Value> {
    let (mut portfolio, proof) = load_owned(state, user, id).await?;
    let updated = content::update_section(&mut portfolio, &proof, &section, patch)?;
    state
        .portfolios
        .write_section(id, &section, &updated, portfolio.updated_at)
        .await?;
    tracing::debug!(portfolio_id = %id, section = %section, "Section updated");
    Ok(updated)
}

pub async fn delete_portfolio_item(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    section: SectionName,
    selector: &ItemSelector,
) -> AppResult<Value> {
    let (mut portfolio, proof) = load_owned(state, user, id).await?;
    let updated = content::delete_item(&mut portfolio, &proof, &section, selector)?;
    state
        .portfolios
        .write_section(id, &section, &updated, portfolio.updated_at)
        .await?;
    tracing::debug!(portfolio_id = %id, section = %section, "Section item deleted");
    Ok(updated)
}

/// Owners and admins may delete.
pub async fn delete_portfolio(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<()> {
    let portfolio = state.portfolios.get_portfolio(id).await?;
    if portfolio.user_id != user.user_id && !user.is_admin() {
        return Err(AppError::forbidden(
            "You do not have permission to delete this portfolio",
        ));
    }
    state.portfolios.delete_portfolio(id).await?;
    tracing::info!(portfolio_id = %id, deleted_by = %user.user_id, "Portfolio deleted");
    Ok(())
}

pub async fn portfolio_stats(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<PortfolioStats> {
    load_owned(state, user, id).await?;
    let total_views = state.views.count_views(id).await?;
    Ok(PortfolioStats {
        portfolio_id: id,
        total_views,
    })
}

/// Published portfolio by subdomain. Records a view; a failed view write
/// never fails the request.
pub async fn get_public_portfolio(
    state: &AppState,
    subdomain: &str,
    visitor: Visitor,
) -> AppResult<Portfolio> {
    let portfolio = state
        .portfolios
        .find_portfolio_by_subdomain(subdomain)
        .await?
        .filter(|p| p.is_published)
        .ok_or_else(|| AppError::not_found("Portfolio"))?;

    let view = NewPortfolioView {
        portfolio_id: portfolio.id,
        ip_address: visitor.ip_address,
        user_agent: visitor.user_agent,
        referrer: visitor.referrer,
    };
    if let Err(e) = state.views.record_view(view, VIEW_DEDUP_WINDOW).await {
        tracing::warn!(portfolio_id = %portfolio.id, "Failed to record view: {}", e);
    }

    Ok(portfolio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::new_template;
    use crate::config::AppConfig;
    use crate::db::models::{ROLE_ADMIN, ROLE_USER};
    use crate::models::TemplateCategory;
    use crate::store::{PortfolioStore, StoreResult};
    use async_trait::async_trait;
    use chrono::DateTime;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Lands a queued section write right after the next load, as if
    /// another request edited the section mid-flight.
    struct InterleavedSectionWrite {
        inner: Arc<dyn PortfolioStore>,
        queued: Mutex<Option<(SectionName, Value)>>,
    }

    #[async_trait]
    impl PortfolioStore for InterleavedSectionWrite {
        async fn list_portfolios_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Portfolio>> {
            self.inner.list_portfolios_by_user(user_id).await
        }

        async fn get_portfolio(&self, id: Uuid) -> StoreResult<Portfolio> {
            let loaded = self.inner.get_portfolio(id).await?;
            let queued = self.queued.lock().unwrap().take();
            if let Some((section, payload)) = queued {
                self.inner
                    .write_section(id, &section, &payload, Utc::now())
                    .await?;
            }
            Ok(loaded)
        }

        async fn find_portfolio_by_subdomain(
            &self,
            subdomain: &str,
        ) -> StoreResult<Option<Portfolio>> {
            self.inner.find_portfolio_by_subdomain(subdomain).await
        }

        async fn subdomain_taken(
            &self,
            subdomain: &str,
            excluding: Option<Uuid>,
        ) -> StoreResult<bool> {
            self.inner.subdomain_taken(subdomain, excluding).await
        }

        async fn insert_portfolio(&self, portfolio: &Portfolio) -> StoreResult<Portfolio> {
            self.inner.insert_portfolio(portfolio).await
        }

        async fn update_portfolio(&self, portfolio: &Portfolio) -> StoreResult<Portfolio> {
            self.inner.update_portfolio(portfolio).await
        }

        async fn write_section(
            &self,
            id: Uuid,
            section: &SectionName,
            payload: &Value,
            updated_at: DateTime<Utc>,
        ) -> StoreResult<()> {
            self.inner.write_section(id, section, payload, updated_at).await
        }

        async fn delete_portfolio(&self, id: Uuid) -> StoreResult<()> {
            self.inner.delete_portfolio(id).await
        }
    }

    fn user(role: &str) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            email: "u@example.com".to_string(),
            role: role.to_string(),
        }
    }

    async fn setup() -> (AppState, Template) {
        let state = AppState::in_memory(AppConfig::default());
        let template = state
            .templates
            .insert_template(&new_template("Dev", "", TemplateCategory::Developer))
            .await
            .unwrap();
        (state, template)
    }

    fn request(template: &Template, subdomain: &str) -> CreatePortfolioRequest {
        CreatePortfolioRequest {
            template_id: template.id,
            title: "Jane Doe".to_string(),
            subdomain: subdomain.to_string(),
            ..CreatePortfolioRequest::default()
        }
    }

    #[tokio::test]
    async fn test_create_portfolio_seeds_settings_and_content() {
        let (state, template) = setup().await;
        let owner = user(ROLE_USER);
        let mut req = request(&template, "jane");
        req.color_scheme_id = Some("dark".to_string());
        req.content
            .insert(SectionName::About, json!({ "content": "Hello" }));

        let p = create_portfolio(&state, &owner, req).await.unwrap();
        assert_eq!(p.user_id, owner.user_id);
        assert!(!p.is_published);
        assert_eq!(p.settings.color_scheme_id.as_deref(), Some("dark"));
        assert_eq!(p.section_content[&SectionName::About]["content"], "Hello");
        for section in &p.settings.layout.sections {
            assert!(p.section_content.contains_key(section));
        }
    }

    #[tokio::test]
    async fn test_subdomain_collision_is_conflict() {
        let (state, template) = setup().await;
        let first = create_portfolio(&state, &user(ROLE_USER), request(&template, "jane"))
            .await
            .unwrap();

        let err = create_portfolio(&state, &user(ROLE_USER), request(&template, "jane"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Stored documents written before validation existed may hold upper case.
        let mut legacy = first.clone();
        legacy.id = Uuid::new_v4();
        legacy.subdomain = "JOHN".to_string();
        state.portfolios.insert_portfolio(&legacy).await.unwrap();
        let err = create_portfolio(&state, &user(ROLE_USER), request(&template, "john"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Upper case never reaches the store: it is malformed input.
        let err = create_portfolio(&state, &user(ROLE_USER), request(&template, "JANE"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_reserved_subdomain_is_validation_error() {
        let (state, template) = setup().await;
        let err = create_portfolio(&state, &user(ROLE_USER), request(&template, "admin"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_template_is_not_found() {
        let (state, _) = setup().await;
        let mut req = request(&new_template("x", "", TemplateCategory::Other), "jane");
        req.template_id = Uuid::new_v4();
        let err = create_portfolio(&state, &user(ROLE_USER), req).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_section_update_requires_ownership_and_persists() {
        let (state, template) = setup().await;
        let owner = user(ROLE_USER);
        let p = create_portfolio(&state, &owner, request(&template, "jane"))
            .await
            .unwrap();

        let err = update_portfolio_section(
            &state,
            &user(ROLE_ADMIN),
            p.id,
            SectionName::Projects,
            &json!({ "items": [] }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let about_before = p.section_content[&SectionName::About].clone();
        update_portfolio_section(
            &state,
            &owner,
            p.id,
            SectionName::Projects,
            &json!({ "items": [{ "id": "p1" }, { "id": "p2" }] }),
        )
        .await
        .unwrap();

        let stored = state.portfolios.get_portfolio(p.id).await.unwrap();
        assert_eq!(
            stored.section_content[&SectionName::Projects]["items"],
            json!([{ "id": "p1" }, { "id": "p2" }])
        );
        assert_eq!(stored.section_content[&SectionName::About], about_before);

        let projects = delete_portfolio_item(
            &state,
            &owner,
            p.id,
            SectionName::Projects,
            &ItemSelector {
                item_id: None,
                item_index: Some(0),
            },
        )
        .await
        .unwrap();
        assert_eq!(projects["items"], json!([{ "id": "p2" }]));
    }

    #[tokio::test]
    async fn test_missing_portfolio_reported_before_ownership() {
        let (state, _) = setup().await;
        let err = update_portfolio_section(
            &state,
            &user(ROLE_USER),
            Uuid::new_v4(),
            SectionName::About,
            &json!({}),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_portfolio_settings_and_subdomain() {
        let (state, template) = setup().await;
        let owner = user(ROLE_USER);
        let p = create_portfolio(&state, &owner, request(&template, "jane"))
            .await
            .unwrap();
        create_portfolio(&state, &user(ROLE_USER), request(&template, "taken"))
            .await
            .unwrap();

        let err = update_portfolio(
            &state,
            &owner,
            p.id,
            UpdatePortfolioRequest {
                subdomain: Some("taken".to_string()),
                ..UpdatePortfolioRequest::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = update_portfolio(
            &state,
            &owner,
            p.id,
            UpdatePortfolioRequest {
                color_scheme_id: Some("nope".to_string()),
                ..UpdatePortfolioRequest::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let updated = update_portfolio(
            &state,
            &owner,
            p.id,
            UpdatePortfolioRequest {
                subdomain: Some("jane-doe".to_string()),
                is_published: Some(true),
                font_pairing_id: Some("code".to_string()),
                show_footer: Some(false),
                ..UpdatePortfolioRequest::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.subdomain, "jane-doe");
        assert!(updated.is_published);
        assert_eq!(updated.settings.fonts.heading, "Fira Code");
        assert!(!updated.settings.layout.show_footer);
    }

    #[tokio::test]
    async fn test_settings_update_keeps_section_edit_made_after_load() {
        let (mut state, template) = setup().await;
        let owner = user(ROLE_USER);
        let p = create_portfolio(&state, &owner, request(&template, "jane"))
            .await
            .unwrap();

        let edit = json!({ "items": [{ "id": "p1", "title": "Compiler" }] });
        state.portfolios = Arc::new(InterleavedSectionWrite {
            inner: state.portfolios.clone(),
            queued: Mutex::new(Some((SectionName::Projects, edit.clone()))),
        });

        let updated = update_portfolio(
            &state,
            &owner,
            p.id,
            UpdatePortfolioRequest {
                title: Some("Jane D.".to_string()),
                ..UpdatePortfolioRequest::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.title, "Jane D.");
        assert_eq!(updated.section_content[&SectionName::Projects], edit);

        let stored = get_portfolio(&state, &owner, p.id).await.unwrap();
        assert_eq!(stored.title, "Jane D.");
        assert_eq!(stored.section_content[&SectionName::Projects], edit);
    }

    #[tokio::test]
    async fn test_admin_may_delete_but_strangers_may_not() {
        let (state, template) = setup().await;
        let owner = user(ROLE_USER);
        let p = create_portfolio(&state, &owner, request(&template, "jane"))
            .await
            .unwrap();

        let err = delete_portfolio(&state, &user(ROLE_USER), p.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        delete_portfolio(&state, &user(ROLE_ADMIN), p.id).await.unwrap();
        assert!(matches!(
            get_portfolio(&state, &owner, p.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_public_view_requires_publish_and_dedupes() {
        let (state, template) = setup().await;
        let owner = user(ROLE_USER);
        let p = create_portfolio(&state, &owner, request(&template, "jane"))
            .await
            .unwrap();
        let visitor = || Visitor {
            ip_address: "10.0.0.1".to_string(),
            ..Visitor::default()
        };

        assert!(matches!(
            get_public_portfolio(&state, "jane", visitor()).await.unwrap_err(),
            AppError::NotFound(_)
        ));

        update_portfolio(
            &state,
            &owner,
            p.id,
            UpdatePortfolioRequest {
                is_published: Some(true),
                ..UpdatePortfolioRequest::default()
            },
        )
        .await
        .unwrap();

        get_public_portfolio(&state, "jane", visitor()).await.unwrap();
        get_public_portfolio(&state, "JANE", visitor()).await.unwrap();
        let stats = portfolio_stats(&state, &owner, p.id).await.unwrap();
        assert_eq!(stats.total_views, 1);
    }

    #[tokio::test]
    async fn test_check_subdomain_reports_reason() {
        let (state, template) = setup().await;
        create_portfolio(&state, &user(ROLE_USER), request(&template, "jane"))
            .await
            .unwrap();

        assert!(!check_subdomain(&state, "jane").await.unwrap().available);
        assert!(!check_subdomain(&state, "ab").await.unwrap().available);
        let free = check_subdomain(&state, "john").await.unwrap();
        assert!(free.available);
        assert!(free.reason.is_none());
    }
}
