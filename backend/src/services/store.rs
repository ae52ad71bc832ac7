//! Persistence contract for the surveillance core
//!
//! Services talk to storage exclusively through [`SurveillanceStore`], so the
//! same orchestration runs against Postgres in production and against the
//! in-memory store in tests. Operations that read-then-write
//! (`replace_current_calculation`, `append_observation`,
//! `transition_session`) are atomic in every implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    Farm, NewCalculation, Observation, ObservationInput, SeasonalStage, SessionStatus,
    SurveillanceCalculation, SurveySession,
};

/// Terminal transition applied to a session under lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionTransition {
    Finish,
    Abandon,
}

#[async_trait]
pub trait SurveillanceStore: Send + Sync {
    // ── Farms and seasons ──

    async fn farm(&self, farm_id: Uuid) -> AppResult<Option<Farm>>;
    async fn seasonal_stages(&self) -> AppResult<Vec<SeasonalStage>>;

    // ── Calculations ──

    async fn current_calculation(&self, farm_id: Uuid)
        -> AppResult<Option<SurveillanceCalculation>>;

    /// Newest first
    async fn calculations_for_farm(&self, farm_id: Uuid) -> AppResult<Vec<SurveillanceCalculation>>;

    /// Unset the farm's current flag and insert the new current record in one atomic unit.
    async fn replace_current_calculation(
        &self,
        calculation: NewCalculation,
        created_at: DateTime<Utc>,
    ) -> AppResult<SurveillanceCalculation>;

    // ── Sessions ──

    async fn insert_session(&self, session: &SurveySession) -> AppResult<()>;
    async fn session(&self, session_id: Uuid) -> AppResult<Option<SurveySession>>;

    /// Newest first
    async fn sessions_for_farm(&self, farm_id: Uuid) -> AppResult<Vec<SurveySession>>;
    async fn sessions_with_status(&self, status: SessionStatus) -> AppResult<Vec<SurveySession>>;

    /// Delete a session and its observations. Returns whether it existed.
    async fn delete_session(&self, session_id: Uuid) -> AppResult<bool>;

    /// Delete the surveyor's in-progress sessions on a farm
    async fn delete_active_sessions(&self, farm_id: Uuid, surveyor_id: Uuid) -> AppResult<u64>;

    /// In-progress sessions started before `cutoff`
    async fn stale_sessions(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<SurveySession>>;

    /// Delete in-progress sessions started before `cutoff`, re-checking status at delete time.
    async fn delete_stale_sessions(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;

    /// Apply a terminal transition with the observation count read under lock.
    async fn transition_session(
        &self,
        session_id: Uuid,
        transition: SessionTransition,
        at: DateTime<Utc>,
    ) -> AppResult<SurveySession>;

    async fn update_session_end_time(&self, session_id: Uuid, end_time: DateTime<Utc>)
        -> AppResult<()>;
    async fn update_session_target(&self, session_id: Uuid, target_plants: i64) -> AppResult<()>;

    // ── Observations ──

    /// Validate against the locked session, assign the sequence number and insert.
    async fn append_observation(
        &self,
        session_id: Uuid,
        input: ObservationInput,
        at: DateTime<Utc>,
    ) -> AppResult<Observation>;

    /// Ordered by plant sequence number
    async fn observations(&self, session_id: Uuid) -> AppResult<Vec<Observation>>;
    async fn observation_count(&self, session_id: Uuid) -> AppResult<i64>;

    /// Completed observations across the farm's completed sessions
    async fn completed_observations_for_farm(&self, farm_id: Uuid) -> AppResult<Vec<Observation>>;

    // ── Health ──

    async fn ping(&self) -> AppResult<()>;
}
