//! Portfolio Builder - templates, portfolio content and publishing

pub mod auth;
pub mod compose;
pub mod config;
pub mod content;
pub mod db;
pub mod email;
pub mod error;
pub mod logging;
pub mod migration;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::net::SocketAddr;
use thiserror::Error;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
};

use crate::config::{AppConfig, ConfigError};
use crate::state::AppState;
use crate::store::StoreError;

/// JSON bodies are small; uploads get their own cap.
const JSON_BODY_LIMIT: usize = 2 * 1024 * 1024;
const UPLOAD_BODY_LIMIT: usize = upload::MAX_FILE_SIZE + 64 * 1024;

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("seeding templates: {0}")]
    Seed(#[from] StoreError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Allowed origins come from ALLOWED_ORIGINS, else the frontend URL.
pub fn configure_cors(config: &AppConfig) -> CorsLayer {
    let mut origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    if origins.is_empty() {
        match config.frontend_url.parse() {
            Ok(origin) => origins.push(origin),
            Err(_) => {
                tracing::warn!(
                    "FRONTEND_URL {:?} is not a valid origin; falling back to localhost",
                    config.frontend_url
                );
                origins.push(HeaderValue::from_static("http://localhost:3000"));
            }
        }
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(routes::auth::register))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/me", get(routes::auth::me))
        .route("/api/auth/verify-email", post(routes::auth::verify_email))
        .route("/api/auth/forgot-password", post(routes::auth::forgot_password))
        .route("/api/auth/reset-password", post(routes::auth::reset_password))
        .route(
            "/api/templates",
            get(routes::templates::list_templates).post(routes::templates::create_template),
        )
        .route(
            "/api/templates/defaults/{category}",
            get(routes::templates::get_defaults),
        )
        .route("/api/templates/{id}", get(routes::templates::get_template))
        .route(
            "/api/templates/{id}/enhance",
            post(routes::templates::enhance_template),
        )
        .route("/api/admin/migrate", post(routes::templates::migrate_templates))
        .route(
            "/api/portfolios",
            get(routes::portfolios::list_portfolios).post(routes::portfolios::create_portfolio),
        )
        .route(
            "/api/portfolios/check-subdomain/{subdomain}",
            get(routes::portfolios::check_subdomain),
        )
        .route(
            "/api/portfolios/{id}",
            get(routes::portfolios::get_portfolio)
                .patch(routes::portfolios::update_portfolio)
                .delete(routes::portfolios::delete_portfolio),
        )
        .route(
            "/api/portfolios/{id}/sections/{section}",
            patch(routes::portfolios::update_section)
                .delete(routes::portfolios::delete_section_item),
        )
        .route(
            "/api/portfolios/{id}/stats",
            get(routes::portfolios::portfolio_stats),
        )
        .route(
            "/api/public/{subdomain}",
            get(routes::public::get_public_portfolio),
        )
        .route("/health", get(routes::health::health_ping))
        .route("/health/detailed", get(routes::health::health_detailed))
        .route("/health/database", get(routes::health::health_database))
        .route("/health/ready", get(routes::health::health_ready))
        .layer(RequestBodyLimitLayer::new(JSON_BODY_LIMIT))
}

fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/api/upload", post(routes::upload::upload_image))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(UPLOAD_BODY_LIMIT))
}

/// Build the application router around an injected state.
pub fn create_app(state: AppState) -> Router {
    let cors = configure_cors(&state.config);

    api_routes()
        .merge(upload_routes())
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

/// Postgres when DATABASE_URL is set, otherwise the in-memory store with
/// the starter templates.
async fn build_state(config: AppConfig) -> Result<AppState, StartupError> {
    if std::env::var("DATABASE_URL").is_ok() {
        let pool = db::init_pool(None).await?;
        db::run_migrations(&pool).await?;
        return Ok(AppState::postgres(pool, config));
    }

    tracing::info!("DATABASE_URL not set. Using the in-memory store.");
    let state = AppState::in_memory(config);
    let seeded = migration::seed_default_templates(state.templates.as_ref()).await?;
    tracing::info!("Seeded {} starter templates", seeded);
    Ok(state)
}

/// Run the server (used by main).
pub async fn run() -> Result<(), StartupError> {
    dotenvy::dotenv().ok();

    let _log_guards = logging::init(&logging::LogConfig::from_env());

    let config = AppConfig::from_env();
    config.validate()?;
    if config.is_production() && config.admin_email.is_none() {
        tracing::warn!("ADMIN_EMAIL is not set; no account can be granted the admin role");
    }

    let addr = config.bind_address()?;
    let state = build_state(config).await?;
    let app = create_app(state);

    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    async fn preflight(config: AppConfig, origin: &str) -> axum::response::Response {
        create_app(AppState::in_memory(config))
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/templates")
                    .header(header::ORIGIN, origin)
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_cors_allows_only_configured_origins() {
        let config = AppConfig {
            allowed_origins: vec!["https://a.example".to_string(), "bad\norigin".to_string()],
            ..AppConfig::default()
        };

        let res = preflight(config.clone(), "https://a.example").await;
        assert_eq!(
            res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://a.example"
        );
        assert_eq!(res.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");

        let res = preflight(config, "https://evil.example").await;
        assert!(res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn test_cors_falls_back_to_frontend_url() {
        let config = AppConfig {
            frontend_url: "https://portfolio.example".to_string(),
            ..AppConfig::default()
        };
        let res = preflight(config, "https://portfolio.example").await;
        assert_eq!(
            res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://portfolio.example"
        );

        let config = AppConfig {
            frontend_url: "not a url\u{0}".to_string(),
            ..AppConfig::default()
        };
        let res = preflight(config, "http://localhost:3000").await;
        assert_eq!(
            res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
    }

    #[tokio::test]
    async fn test_unknown_route_is_404_with_request_id() {
        let app = create_app(AppState::in_memory(AppConfig::default()));
        let res = app
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(res.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_oversized_json_is_rejected() {
        let app = create_app(AppState::in_memory(AppConfig::default()));
        let body = vec![b' '; JSON_BODY_LIMIT + 1];
        let res = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::CONTENT_LENGTH, body.len())
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
