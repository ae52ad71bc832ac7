//! Administrative maintenance handlers
//!
//! All operations accept `dry_run=true` to report without writing.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::SessionStatus;
use crate::services::maintenance::{
    DurationRepairReport, MaintenanceService, SweepReport, TargetRepairReport,
};
use crate::AppState;

fn maintenance_service(state: AppState) -> MaintenanceService {
    MaintenanceService::new(state.store, state.clock, state.config.surveillance.clone())
}

#[derive(Debug, Deserialize, Validate)]
pub struct SweepQuery {
    /// Staleness threshold, defaults to the configured one
    #[validate(range(min = 1, max = 720, message = "Hours must be between 1 and 720"))]
    pub hours: Option<i64>,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Deserialize)]
pub struct DryRunQuery {
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Deserialize)]
pub struct RepairTargetsQuery {
    /// Sessions to inspect, in-progress by default
    pub status: Option<SessionStatus>,
    #[serde(default)]
    pub dry_run: bool,
}

pub async fn sweep_stale_sessions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<SweepQuery>,
) -> AppResult<Json<SweepReport>> {
    query.validate()?;
    tracing::info!(user_id = %current_user.0, dry_run = query.dry_run, "Manual stale session sweep");

    let report = maintenance_service(state)
        .sweep_stale(query.hours, query.dry_run)
        .await?;
    Ok(Json(report))
}

pub async fn repair_session_durations(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<DryRunQuery>,
) -> AppResult<Json<DurationRepairReport>> {
    tracing::info!(user_id = %current_user.0, dry_run = query.dry_run, "Repairing session durations");

    let report = maintenance_service(state)
        .repair_durations(query.dry_run)
        .await?;
    Ok(Json(report))
}

pub async fn repair_session_targets(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<RepairTargetsQuery>,
) -> AppResult<Json<TargetRepairReport>> {
    let status = query.status.unwrap_or(SessionStatus::InProgress);
    tracing::info!(user_id = %current_user.0, status = %status, dry_run = query.dry_run, "Repairing session targets");

    let report = maintenance_service(state)
        .repair_targets(status, query.dry_run)
        .await?;
    Ok(Json(report))
}
