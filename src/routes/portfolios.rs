/**
 * Portfolio Routes
 * Owner-facing CRUD, section edits and stats for portfolios
 */
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::content::ItemSelector;
use crate::db::models::PortfolioStats;
use crate::error::AppResult;
use crate::models::{Portfolio, SectionName};
use crate::services::portfolios::{
    self, CreatePortfolioRequest, SubdomainAvailability, UpdatePortfolioRequest,
};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PortfolioListResponse {
    pub portfolios: Vec<Portfolio>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct SectionResponse {
    pub section: SectionName,
    pub data: Value,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

/// GET /api/portfolios
pub async fn list_portfolios(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<(StatusCode, Json<PortfolioListResponse>)> {
    let portfolios = portfolios::list_portfolios(&state, &user).await?;
    let total = portfolios.len();
    Ok((StatusCode::OK, Json(PortfolioListResponse { portfolios, total })))
}

/// POST /api/portfolios
pub async fn create_portfolio(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreatePortfolioRequest>,
) -> AppResult<(StatusCode, Json<Portfolio>)> {
    let portfolio = portfolios::create_portfolio(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(portfolio)))
}

/// GET /api/portfolios/check-subdomain/{subdomain}
pub async fn check_subdomain(
    State(state): State<AppState>,
    Path(subdomain): Path<String>,
) -> AppResult<(StatusCode, Json<SubdomainAvailability>)> {
    let availability = portfolios::check_subdomain(&state, &subdomain).await?;
    Ok((StatusCode::OK, Json(availability)))
}

/// GET /api/portfolios/{id}
pub async fn get_portfolio(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<Portfolio>)> {
    let portfolio = portfolios::get_portfolio(&state, &user, id).await?;
    Ok((StatusCode::OK, Json(portfolio)))
}

/// PATCH /api/portfolios/{id}
pub async fn update_portfolio(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePortfolioRequest>,
) -> AppResult<(StatusCode, Json<Portfolio>)> {
    let portfolio = portfolios::update_portfolio(&state, &user, id, payload).await?;
    Ok((StatusCode::OK, Json(portfolio)))
}

/// DELETE /api/portfolios/{id}
pub async fn delete_portfolio(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<DeleteResponse>)> {
    portfolios::delete_portfolio(&state, &user, id).await?;
    Ok((StatusCode::OK, Json(DeleteResponse { success: true })))
}

/// PATCH /api/portfolios/{id}/sections/{section}
pub async fn update_section(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, section)): Path<(Uuid, String)>,
    Json(patch): Json<Value>,
) -> AppResult<(StatusCode, Json<SectionResponse>)> {
    let section = SectionName::from(section);
    let data =
        portfolios::update_portfolio_section(&state, &user, id, section.clone(), &patch).await?;
    Ok((StatusCode::OK, Json(SectionResponse { section, data })))
}

/// DELETE /api/portfolios/{id}/sections/{section}?itemId=&itemIndex=
pub async fn delete_section_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, section)): Path<(Uuid, String)>,
    Query(selector): Query<ItemSelector>,
) -> AppResult<(StatusCode, Json<SectionResponse>)> {
    let section = SectionName::from(section);
    let data =
        portfolios::delete_portfolio_item(&state, &user, id, section.clone(), &selector).await?;
    Ok((StatusCode::OK, Json(SectionResponse { section, data })))
}

/// GET /api/portfolios/{id}/stats
pub async fn portfolio_stats(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<PortfolioStats>)> {
    let stats = portfolios::portfolio_stats(&state, &user, id).await?;
    Ok((StatusCode::OK, Json(stats)))
}
