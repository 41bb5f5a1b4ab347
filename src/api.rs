// src/api.rs
use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::ingest::types::{PaymentKind, PersistedRecord};
use crate::store::Storage;

pub const DEFAULT_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 500;
pub const STATS_WINDOW: usize = 100;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Storage>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/bounties", get(list_bounties))
        .route("/api/stats", get(stats))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

struct ApiError(anyhow::Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::warn!(error = ?self.0, "api storage error");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "storage unavailable" })),
        )
            .into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: Option<usize>,
}

async fn list_bounties(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<PersistedRecord>>, ApiError> {
    let limit = q.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    Ok(Json(state.store.get_recent(limit).await?))
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Stats {
    pub total: usize,
    pub by_origin: BTreeMap<String, usize>,
    pub avg_score: f64,
    pub crypto_count: usize,
    pub window: usize,
}

/// Aggregate over a slice of recent records.
pub fn summarize(recent: &[PersistedRecord]) -> Stats {
    let mut by_origin = BTreeMap::new();
    let mut sum = 0i64;
    let mut crypto = 0usize;
    for r in recent {
        *by_origin.entry(r.record.origin.clone()).or_insert(0) += 1;
        sum += r.score;
        if r.record.payment_kind == PaymentKind::Crypto {
            crypto += 1;
        }
    }
    let avg = if recent.is_empty() {
        0.0
    } else {
        sum as f64 / recent.len() as f64
    };
    Stats {
        total: recent.len(),
        by_origin,
        avg_score: (avg * 10.0).round() / 10.0,
        crypto_count: crypto,
        window: STATS_WINDOW,
    }
}

async fn stats(State(state): State<AppState>) -> Result<Json<Stats>, ApiError> {
    let recent = state.store.get_recent(STATS_WINDOW).await?;
    Ok(Json(summarize(&recent)))
}
