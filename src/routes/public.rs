/**
 * Public Routes
 * Published portfolios served by subdomain
 */
use axum::{
    extract::{ConnectInfo, FromRequestParts, Path, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;
use std::convert::Infallible;
use std::net::SocketAddr;

use crate::error::AppResult;
use crate::models::{Portfolio, TemplateSummary};
use crate::services::portfolios::{self, Visitor};
use crate::state::AppState;

/// Best-effort client address: proxy headers first, then the socket peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = forwarded_ip(&parts.headers)
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
            .unwrap_or_else(|| "unknown".to_string());
        Ok(ClientIp(ip))
    }
}

#[derive(Debug, Serialize)]
pub struct PublicPortfolioResponse {
    pub portfolio: Portfolio,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateSummary>,
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

/// GET /api/public/{subdomain}
pub async fn get_public_portfolio(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
    Path(subdomain): Path<String>,
) -> AppResult<(StatusCode, Json<PublicPortfolioResponse>)> {
    let visitor = Visitor {
        ip_address: ip,
        user_agent: header_string(&headers, header::USER_AGENT),
        referrer: header_string(&headers, header::REFERER),
    };
    let portfolio = portfolios::get_public_portfolio(&state, &subdomain, visitor).await?;

    let template = match state.templates.get_template(portfolio.template_id).await {
        Ok(t) => Some(TemplateSummary::from(&t)),
        Err(e) => {
            tracing::warn!(template_id = %portfolio.template_id, "Template lookup failed: {}", e);
            None
        }
    };

    Ok((StatusCode::OK, Json(PublicPortfolioResponse { portfolio, template })))
}
