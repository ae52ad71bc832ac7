//! Farm surveillance overview handlers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::farm::{FarmService, FarmStats, FarmSurveillance};
use crate::AppState;

/// Compliance status, season and current calculation for a farm
pub async fn get_farm_surveillance(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
) -> AppResult<Json<FarmSurveillance>> {
    let service = FarmService::new(state.store, state.clock, state.config.surveillance.clone());
    let overview = service.surveillance(farm_id).await?;
    Ok(Json(overview))
}

pub async fn get_farm_stats(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
) -> AppResult<Json<FarmStats>> {
    let service = FarmService::new(state.store, state.clock, state.config.surveillance.clone());
    let stats = service.stats(farm_id).await?;
    Ok(Json(stats))
}
