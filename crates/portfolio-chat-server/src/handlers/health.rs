use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::services::conversation::SessionStats;
use crate::services::portfolio::PortfolioCacheStats;
use crate::services::response_cache::ResponseCacheStats;
use crate::state::AppState;

#[derive(Serialize)]
pub struct BannerResponse {
    message: String,
    version: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    status: String,
    response_cache: ResponseCacheStats,
    sessions: SessionStats,
    portfolio: PortfolioCacheStats,
}

pub async fn banner(State(state): State<AppState>) -> Json<BannerResponse> {
    Json(BannerResponse {
        message: format!("{} portfolio chat API is running", state.settings.portfolio.name),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Always ready: both caches degrade to fallbacks instead of failing.
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let service = &state.chat_service;
    (
        StatusCode::OK,
        Json(ReadinessResponse {
            status: "ready".to_string(),
            response_cache: service.responses().stats(),
            sessions: service.sessions().stats(),
            portfolio: service.portfolio().stats(),
        }),
    )
}
