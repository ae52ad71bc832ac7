//! Survey session HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::{Observation, ObservationInput, SessionSummary};
use crate::services::survey::{StartedSession, SurveyService};
use crate::AppState;

fn survey_service(state: AppState) -> SurveyService {
    SurveyService::new(state.store, state.clock, state.config.surveillance.clone())
}

// ============================================================================
// Sessions
// ============================================================================

/// Start a session for the calling surveyor, replacing any active one on the farm
pub async fn start_session(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<StartedSession>)> {
    let started = survey_service(state)
        .start_session(farm_id, current_user.0)
        .await?;
    Ok((StatusCode::CREATED, Json(started)))
}

/// Sessions for a farm, newest first
pub async fn list_sessions(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
) -> AppResult<Json<Vec<SessionSummary>>> {
    let sessions = survey_service(state).list_for_farm(farm_id).await?;
    Ok(Json(sessions))
}

pub async fn get_session(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<SessionSummary>> {
    let summary = survey_service(state).summary(session_id).await?;
    Ok(Json(summary))
}

pub async fn delete_session(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(session_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    tracing::info!(session_id = %session_id, user_id = %current_user.0, "Deleting survey session");
    survey_service(state).delete(session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn finish_session(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<SessionSummary>> {
    let summary = survey_service(state).finish(session_id).await?;
    Ok(Json(summary))
}

pub async fn abandon_session(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<SessionSummary>> {
    let summary = survey_service(state).abandon(session_id).await?;
    Ok(Json(summary))
}

// ============================================================================
// Observations
// ============================================================================

/// Record one plant. The sequence number is assigned when omitted.
pub async fn record_observation(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(session_id): Path<Uuid>,
    Json(input): Json<ObservationInput>,
) -> AppResult<(StatusCode, Json<Observation>)> {
    let observation = survey_service(state)
        .record_observation(session_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(observation)))
}

pub async fn list_observations(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<Vec<Observation>>> {
    let observations = survey_service(state).observations(session_id).await?;
    Ok(Json(observations))
}
