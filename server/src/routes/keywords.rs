use axum::extract::State;
use axum::Json;
use chrono::{NaiveDate, Utc};
use clipharvest::keywords::{PoolStats, SeedReport};
use clipharvest::{RotationRequest, RotationResult};
use serde::Deserialize;

use crate::error::ApiError;
use crate::routes::blocking;
use crate::state::AppState;

const DEFAULT_AUTO_SEED_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedRequest {
    pub keywords: Vec<String>,
    /// Defaults to the configured default category.
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoSeedRequest {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotateRequest {
    pub count: usize,
    /// Rotation day; today (UTC) when absent.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub category: Option<String>,
}

pub async fn seed(
    State(state): State<AppState>,
    Json(request): Json<SeedRequest>,
) -> Result<Json<SeedReport>, ApiError> {
    let pool = state.keywords.clone();
    let report = blocking(move || {
        let report = match &request.category {
            Some(category) => pool.seed_from_category(category, &request.keywords),
            None => pool.seed(&request.keywords),
        };
        report.map_err(ApiError::from)
    })
    .await?;
    Ok(Json(report))
}

pub async fn auto_seed(
    State(state): State<AppState>,
    request: Option<Json<AutoSeedRequest>>,
) -> Result<Json<SeedReport>, ApiError> {
    let limit = request
        .and_then(|Json(r)| r.limit)
        .unwrap_or(DEFAULT_AUTO_SEED_LIMIT);
    let pool = state.keywords.clone();
    let report =
        blocking(move || pool.auto_seed_from_history(limit).map_err(ApiError::from)).await?;
    Ok(Json(report))
}

pub async fn rotate(
    State(state): State<AppState>,
    Json(request): Json<RotateRequest>,
) -> Result<Json<RotationResult>, ApiError> {
    let rotation = RotationRequest {
        count: request.count,
        as_of: request.date.unwrap_or_else(|| Utc::now().date_naive()),
        force: request.force,
        category: request.category,
    };
    let pool = state.keywords.clone();
    let result = blocking(move || pool.rotate(&rotation).map_err(ApiError::from)).await?;
    Ok(Json(result))
}

pub async fn pool_stats(State(state): State<AppState>) -> Result<Json<PoolStats>, ApiError> {
    let pool = state.keywords.clone();
    let stats = blocking(move || pool.stats().map_err(ApiError::from)).await?;
    Ok(Json(stats))
}
