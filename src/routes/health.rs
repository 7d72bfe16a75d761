/**
 * Health Routes
 * Liveness, readiness and dependency checks
 */
use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Result of probing one dependency.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCheck {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceCheck {
    fn healthy(response_time: Option<u64>) -> Self {
        Self {
            status: "healthy".to_string(),
            response_time,
            error: None,
        }
    }

    fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            status: "unhealthy".to_string(),
            response_time: None,
            error: Some(error.into()),
        }
    }

    fn in_memory() -> Self {
        Self {
            status: "in-memory".to_string(),
            response_time: None,
            error: None,
        }
    }

    fn is_usable(&self) -> bool {
        self.status != "unhealthy"
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthChecks {
    pub database: ServiceCheck,
    pub uploads: ServiceCheck,
    pub email: ServiceCheck,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedHealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub uptime: u64,
    pub environment: String,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub uptime: u64,
    pub database: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SimpleHealthResponse {
    pub status: String,
}

/// Without a pool the server is on the in-memory store, which is always up.
async fn check_database(state: &AppState) -> ServiceCheck {
    match &state.db {
        None => ServiceCheck::in_memory(),
        Some(pool) => match crate::db::health_check(pool).await {
            Ok(duration) => ServiceCheck::healthy(Some(duration.as_millis() as u64)),
            Err(e) => {
                tracing::warn!("Database health check failed: {}", e);
                ServiceCheck::unhealthy(e.to_string())
            }
        },
    }
}

fn configured(present: bool, fallback: &str) -> ServiceCheck {
    if present {
        ServiceCheck::healthy(None)
    } else {
        ServiceCheck {
            status: fallback.to_string(),
            response_time: None,
            error: None,
        }
    }
}

/// GET /health
pub async fn health_ping() -> Json<SimpleHealthResponse> {
    Json(SimpleHealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /health/detailed
pub async fn health_detailed(State(state): State<AppState>) -> (StatusCode, Json<DetailedHealthResponse>) {
    let database = check_database(&state).await;
    let status = if database.is_usable() { "ok" } else { "degraded" };

    let response = DetailedHealthResponse {
        status: status.to_string(),
        timestamp: Utc::now(),
        uptime: state.started_at.elapsed().as_secs(),
        environment: state.config.environment.clone(),
        checks: HealthChecks {
            database,
            uploads: configured(state.config.cloudinary.is_some(), "placeholder"),
            email: configured(state.config.email.is_some(), "log-only"),
        },
    };

    (StatusCode::OK, Json(response))
}

/// GET /health/database
pub async fn health_database(State(state): State<AppState>) -> (StatusCode, Json<ServiceCheck>) {
    let check = check_database(&state).await;
    let status = if check.is_usable() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(check))
}

/// GET /health/ready
pub async fn health_ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let database = check_database(&state).await;
    let ready = database.is_usable();

    let response = ReadyResponse {
        status: if ready { "ready" } else { "not ready" }.to_string(),
        timestamp: Utc::now(),
        uptime: state.started_at.elapsed().as_secs(),
        database: database.status,
        reason: (!ready).then(|| "Database is not reachable".to_string()),
    };

    let code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn get_json<T: serde::de::DeserializeOwned>(uri: &str) -> (StatusCode, T) {
        let app = crate::create_app(AppState::in_memory(AppConfig::default()));
        let req = Request::get(uri).body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_ping_returns_ok() {
        let (status, body) = get_json::<SimpleHealthResponse>("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
    }

    #[tokio::test]
    async fn test_database_reports_in_memory_without_pool() {
        let (status, body) = get_json::<ServiceCheck>("/health/database").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "in-memory");
    }

    #[tokio::test]
    async fn test_detailed_lists_fallback_collaborators() {
        let (status, body) = get_json::<DetailedHealthResponse>("/health/detailed").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
        assert_eq!(body.environment, "development");
        assert_eq!(body.checks.uploads.status, "placeholder");
        assert_eq!(body.checks.email.status, "log-only");
    }

    #[tokio::test]
    async fn test_ready_without_database() {
        let (status, body) = get_json::<ReadyResponse>("/health/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ready");
        assert!(body.reason.is_none());
    }
}
