use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;

use crate::AppState;

use super::model::{HealthStatus, aggregate_readiness};

/// 负载均衡器用的基础探活，永远 200
#[axum::debug_handler]
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "timestamp": Utc::now(),
            "service": "menu-backend",
        })),
    )
}

/// 存活检查：只看进程自身，不触达任何外部依赖
#[axum::debug_handler]
pub async fn liveness(State(state): State<AppState>) -> impl IntoResponse {
    let application = state.health.check_application();
    let alive = application.status != HealthStatus::Unhealthy;

    let status = if alive {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "status": if alive { "alive" } else { "unhealthy" },
            "timestamp": Utc::now(),
            "application": application,
        })),
    )
}

/// 就绪检查：并发探测全部必需依赖，任何一个 unhealthy 即 503，
/// 并在响应中列出失败的依赖名
#[axum::debug_handler]
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let checks = state.health.readiness_checks().await;
    let (ready, failing) = aggregate_readiness(&checks);

    let status = if ready {
        StatusCode::OK
    } else {
        tracing::warn!(failed = ?failing, "readiness check failed");
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "status": if ready { "ready" } else { "not_ready" },
            "timestamp": Utc::now(),
            "checks": checks,
            "failed_dependencies": failing,
        })),
    )
}

/// 详细诊断：就绪检查的超集，外部服务等非必需依赖只报告、不改变判定
#[axum::debug_handler]
pub async fn detailed(State(state): State<AppState>) -> impl IntoResponse {
    let checks = state.health.detailed_checks().await;

    let required = ["application", "database", "redis"];
    let unhealthy: Vec<String> = checks
        .iter()
        .filter(|c| {
            required.contains(&c.component.as_str()) && c.status == HealthStatus::Unhealthy
        })
        .map(|c| c.component.clone())
        .collect();
    let degraded = checks
        .iter()
        .any(|c| required.contains(&c.component.as_str()) && c.status == HealthStatus::Degraded);

    let overall = if !unhealthy.is_empty() {
        HealthStatus::Unhealthy
    } else if degraded {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    };

    let status = if overall == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        status,
        Json(serde_json::json!({
            "status": overall,
            "timestamp": Utc::now(),
            "checks": checks,
            "unhealthy_components": unhealthy,
        })),
    )
}
