//! In-memory [`SurveillanceStore`] used for tests and database-less runs
//!
//! A single async mutex guards all state, so every trait operation is atomic.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{validate_farm_dimensions, validate_stage_prevalence};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    Farm, NewCalculation, Observation, ObservationInput, ObservationLedger, SeasonalStage,
    SessionStatus, SurveillanceCalculation, SurveySession,
};
use crate::services::store::{SessionTransition, SurveillanceStore};

#[derive(Default)]
struct MemoryState {
    farms: HashMap<Uuid, Farm>,
    stages: Vec<SeasonalStage>,
    calculations: Vec<SurveillanceCalculation>,
    sessions: HashMap<Uuid, SurveySession>,
    observations: Vec<Observation>,
}

impl MemoryState {
    fn session_observations(&self, session_id: Uuid) -> impl Iterator<Item = &Observation> {
        self.observations
            .iter()
            .filter(move |o| o.session_id == session_id)
    }

    fn remove_sessions(&mut self, ids: &HashSet<Uuid>) -> u64 {
        for id in ids {
            self.sessions.remove(id);
        }
        self.observations.retain(|o| !ids.contains(&o.session_id));
        ids.len() as u64
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a farm. Farm management lives outside the surveillance core.
    pub async fn insert_farm(&self, farm: Farm) -> AppResult<()> {
        validate_farm_dimensions(farm.size_hectares, farm.stocking_rate)
            .map_err(|msg| AppError::validation("farm", msg))?;
        self.state.lock().await.farms.insert(farm.id, farm);
        Ok(())
    }

    /// Add a seasonal stage mapping
    pub async fn insert_stage(&self, stage: SeasonalStage) -> AppResult<()> {
        validate_stage_prevalence(stage.prevalence)
            .map_err(|msg| AppError::validation("prevalence", msg))?;
        self.state.lock().await.stages.push(stage);
        Ok(())
    }
}

fn session_not_found() -> AppError {
    AppError::NotFound("Survey session".to_string())
}

#[async_trait]
impl SurveillanceStore for MemoryStore {
    async fn farm(&self, farm_id: Uuid) -> AppResult<Option<Farm>> {
        Ok(self.state.lock().await.farms.get(&farm_id).cloned())
    }

    async fn seasonal_stages(&self) -> AppResult<Vec<SeasonalStage>> {
        Ok(self.state.lock().await.stages.clone())
    }

    async fn current_calculation(
        &self,
        farm_id: Uuid,
    ) -> AppResult<Option<SurveillanceCalculation>> {
        let state = self.state.lock().await;
        Ok(state
            .calculations
            .iter()
            .filter(|c| c.farm_id == farm_id && c.is_current)
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn calculations_for_farm(&self, farm_id: Uuid) -> AppResult<Vec<SurveillanceCalculation>> {
        let state = self.state.lock().await;
        let mut calculations: Vec<_> = state
            .calculations
            .iter()
            .filter(|c| c.farm_id == farm_id)
            .cloned()
            .collect();
        calculations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(calculations)
    }

    async fn replace_current_calculation(
        &self,
        calculation: NewCalculation,
        created_at: DateTime<Utc>,
    ) -> AppResult<SurveillanceCalculation> {
        let mut state = self.state.lock().await;
        if !state.farms.contains_key(&calculation.farm_id) {
            return Err(AppError::NotFound("Farm".to_string()));
        }

        for existing in state
            .calculations
            .iter_mut()
            .filter(|c| c.farm_id == calculation.farm_id)
        {
            existing.is_current = false;
        }

        let record = calculation.into_record(Uuid::new_v4(), created_at);
        state.calculations.push(record.clone());
        Ok(record)
    }

    async fn insert_session(&self, session: &SurveySession) -> AppResult<()> {
        self.state
            .lock()
            .await
            .sessions
            .insert(session.id, session.clone());
        Ok(())
    }

    async fn session(&self, session_id: Uuid) -> AppResult<Option<SurveySession>> {
        Ok(self.state.lock().await.sessions.get(&session_id).cloned())
    }

    async fn sessions_for_farm(&self, farm_id: Uuid) -> AppResult<Vec<SurveySession>> {
        let state = self.state.lock().await;
        let mut sessions: Vec<_> = state
            .sessions
            .values()
            .filter(|s| s.farm_id == farm_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(sessions)
    }

    async fn sessions_with_status(&self, status: SessionStatus) -> AppResult<Vec<SurveySession>> {
        let state = self.state.lock().await;
        let mut sessions: Vec<_> = state
            .sessions
            .values()
            .filter(|s| s.status == status)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(sessions)
    }

    async fn delete_session(&self, session_id: Uuid) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        let ids = HashSet::from([session_id]);
        let existed = state.sessions.contains_key(&session_id);
        state.remove_sessions(&ids);
        Ok(existed)
    }

    async fn delete_active_sessions(&self, farm_id: Uuid, surveyor_id: Uuid) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let ids: HashSet<Uuid> = state
            .sessions
            .values()
            .filter(|s| s.farm_id == farm_id && s.surveyor_id == surveyor_id && s.is_active())
            .map(|s| s.id)
            .collect();
        Ok(state.remove_sessions(&ids))
    }

    async fn stale_sessions(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<SurveySession>> {
        let state = self.state.lock().await;
        Ok(state
            .sessions
            .values()
            .filter(|s| s.is_active() && s.start_time < cutoff)
            .cloned()
            .collect())
    }

    async fn delete_stale_sessions(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let ids: HashSet<Uuid> = state
            .sessions
            .values()
            .filter(|s| s.is_active() && s.start_time < cutoff)
            .map(|s| s.id)
            .collect();
        Ok(state.remove_sessions(&ids))
    }

    async fn transition_session(
        &self,
        session_id: Uuid,
        transition: SessionTransition,
        at: DateTime<Utc>,
    ) -> AppResult<SurveySession> {
        let mut state = self.state.lock().await;
        let observed = state.session_observations(session_id).count() as i64;
        let session = state
            .sessions
            .get_mut(&session_id)
            .ok_or_else(session_not_found)?;

        match transition {
            SessionTransition::Finish => session.finish(observed, at)?,
            SessionTransition::Abandon => session.abandon(at)?,
        }
        Ok(session.clone())
    }

    async fn update_session_end_time(
        &self,
        session_id: Uuid,
        end_time: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let session = state
            .sessions
            .get_mut(&session_id)
            .ok_or_else(session_not_found)?;
        session.end_time = Some(end_time);
        Ok(())
    }

    async fn update_session_target(&self, session_id: Uuid, target_plants: i64) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let session = state
            .sessions
            .get_mut(&session_id)
            .ok_or_else(session_not_found)?;
        session.target_plants = Some(target_plants);
        Ok(())
    }

    async fn append_observation(
        &self,
        session_id: Uuid,
        input: ObservationInput,
        at: DateTime<Utc>,
    ) -> AppResult<Observation> {
        let mut state = self.state.lock().await;
        let session = state
            .sessions
            .get(&session_id)
            .ok_or_else(session_not_found)?;

        let requested = input.requested_sequence();
        let ledger = ObservationLedger {
            observed: state.session_observations(session_id).count() as i64,
            max_sequence: state
                .session_observations(session_id)
                .map(|o| o.plant_sequence_number)
                .max(),
            requested_taken: requested.is_some_and(|n| {
                state
                    .session_observations(session_id)
                    .any(|o| o.plant_sequence_number == n)
            }),
        };
        let sequence = session.plan_observation(&ledger, requested)?;

        let observation = input.into_observation(session_id, sequence, at);
        state.observations.push(observation.clone());
        Ok(observation)
    }

    async fn observations(&self, session_id: Uuid) -> AppResult<Vec<Observation>> {
        let state = self.state.lock().await;
        let mut observations: Vec<_> = state.session_observations(session_id).cloned().collect();
        observations.sort_by_key(|o| (o.plant_sequence_number, o.observed_at));
        Ok(observations)
    }

    async fn observation_count(&self, session_id: Uuid) -> AppResult<i64> {
        Ok(self.state.lock().await.session_observations(session_id).count() as i64)
    }

    async fn completed_observations_for_farm(&self, farm_id: Uuid) -> AppResult<Vec<Observation>> {
        let state = self.state.lock().await;
        let completed: HashSet<Uuid> = state
            .sessions
            .values()
            .filter(|s| s.farm_id == farm_id && s.status == SessionStatus::Completed)
            .map(|s| s.id)
            .collect();
        Ok(state
            .observations
            .iter()
            .filter(|o| completed.contains(&o.session_id))
            .cloned()
            .collect())
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
