//! Seasonal stage handlers

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::services::season::{SeasonOverview, SeasonService};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SeasonQuery {
    /// 1-12, defaults to the current month
    pub month: Option<u32>,
}

/// Active stage, prevalence and threats for a month
pub async fn get_season(
    State(state): State<AppState>,
    Query(query): Query<SeasonQuery>,
) -> AppResult<Json<SeasonOverview>> {
    let service = SeasonService::new(state.store, state.clock);
    let overview = service.overview(query.month).await?;
    Ok(Json(overview))
}
