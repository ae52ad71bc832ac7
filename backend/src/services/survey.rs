//! Survey session workflow
//!
//! Starting a session is an explicit orchestration: sweep stale sessions,
//! drop the surveyor's previous active session on the farm, resolve a target,
//! then insert. Recording and finishing delegate the rules to the core and
//! rely on the store for atomicity.

use std::sync::Arc;

use chrono::Datelike;
use serde::Serialize;
use shared::{resolve_target, unresolved_reason, validate_notes, Clock, TargetInputs, TargetStrategy};
use uuid::Uuid;

use crate::config::SurveillanceConfig;
use crate::error::{AppError, AppResult};
use crate::models::{Farm, Observation, ObservationInput, SeasonalInfo, SessionSummary, SurveySession};
use crate::services::store::{SessionTransition, SurveillanceStore};

#[derive(Clone)]
pub struct SurveyService {
    store: Arc<dyn SurveillanceStore>,
    clock: Arc<dyn Clock>,
    settings: SurveillanceConfig,
}

/// A newly started session and how it was set up
#[derive(Debug, Clone, Serialize)]
pub struct StartedSession {
    #[serde(flatten)]
    pub session: SurveySession,
    /// Strategy that produced the target, if any did
    pub target_source: Option<TargetStrategy>,
    /// Why no target could be derived
    pub target_note: Option<String>,
    /// Earlier active sessions of this surveyor on the farm that were discarded
    pub replaced_sessions: u64,
    pub swept_sessions: u64,
}

/// Collect what the target strategies need for a farm in the given month
pub(crate) async fn target_inputs(
    store: &dyn SurveillanceStore,
    farm: &Farm,
    month: u32,
    settings: &SurveillanceConfig,
) -> AppResult<TargetInputs> {
    let current = store.current_calculation(farm.id).await?;
    let stages = store.seasonal_stages().await?;
    let season = SeasonalInfo::for_month(&stages, month);

    Ok(TargetInputs {
        current_calculation: current.map(|c| c.required_plants),
        population: farm.total_plants(),
        prevalence: season.prevalence,
        confidence: settings.default_confidence(),
        margin_of_error: settings.margin_of_error,
    })
}

impl SurveyService {
    pub fn new(
        store: Arc<dyn SurveillanceStore>,
        clock: Arc<dyn Clock>,
        settings: SurveillanceConfig,
    ) -> Self {
        Self {
            store,
            clock,
            settings,
        }
    }

    pub async fn start_session(&self, farm_id: Uuid, surveyor_id: Uuid) -> AppResult<StartedSession> {
        let farm = self
            .store
            .farm(farm_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Farm".to_string()))?;
        let now = self.clock.now();

        let swept_sessions = self
            .store
            .delete_stale_sessions(now - self.settings.staleness())
            .await?;
        if swept_sessions > 0 {
            tracing::info!(count = swept_sessions, "Swept stale survey sessions");
        }

        let replaced_sessions = self.store.delete_active_sessions(farm_id, surveyor_id).await?;

        let inputs = target_inputs(self.store.as_ref(), &farm, now.month(), &self.settings).await?;
        let resolved = resolve_target(&inputs);
        let target_note = match resolved {
            Some(_) => None,
            None => {
                let reason = unresolved_reason(&inputs);
                tracing::warn!(farm_id = %farm_id, reason, "Starting session without a target");
                Some(reason.to_string())
            }
        };

        let session = SurveySession::start(
            farm_id,
            surveyor_id,
            resolved.map(|r| r.target_plants),
            now,
        );
        self.store.insert_session(&session).await?;

        tracing::info!(
            session_id = %session.id,
            farm_id = %farm_id,
            surveyor_id = %surveyor_id,
            target = ?session.target_plants,
            source = resolved.map(|r| r.source.description()),
            replaced = replaced_sessions,
            "Survey session started"
        );

        Ok(StartedSession {
            session,
            target_source: resolved.map(|r| r.source),
            target_note,
            replaced_sessions,
            swept_sessions,
        })
    }

    pub async fn record_observation(
        &self,
        session_id: Uuid,
        input: ObservationInput,
    ) -> AppResult<Observation> {
        if let Some(notes) = &input.notes {
            validate_notes(notes).map_err(|msg| AppError::validation("notes", msg))?;
        }

        let observation = self
            .store
            .append_observation(session_id, input, self.clock.now())
            .await?;

        tracing::debug!(
            session_id = %session_id,
            plant = observation.plant_sequence_number,
            pests = observation.pest_ids.len(),
            diseases = observation.disease_ids.len(),
            "Observation recorded"
        );

        Ok(observation)
    }

    pub async fn finish(&self, session_id: Uuid) -> AppResult<SessionSummary> {
        self.transition(session_id, SessionTransition::Finish).await
    }

    pub async fn abandon(&self, session_id: Uuid) -> AppResult<SessionSummary> {
        self.transition(session_id, SessionTransition::Abandon).await
    }

    async fn transition(
        &self,
        session_id: Uuid,
        transition: SessionTransition,
    ) -> AppResult<SessionSummary> {
        let session = self
            .store
            .transition_session(session_id, transition, self.clock.now())
            .await?;
        tracing::info!(session_id = %session_id, status = %session.status, "Survey session closed");

        let observations = self.store.observations(session_id).await?;
        Ok(SessionSummary::build(&session, &observations))
    }

    pub async fn summary(&self, session_id: Uuid) -> AppResult<SessionSummary> {
        let session = self.require_session(session_id).await?;
        let observations = self.store.observations(session_id).await?;
        Ok(SessionSummary::build(&session, &observations))
    }

    /// Summaries of a farm's sessions, newest first
    pub async fn list_for_farm(&self, farm_id: Uuid) -> AppResult<Vec<SessionSummary>> {
        let sessions = self.store.sessions_for_farm(farm_id).await?;

        let mut summaries = Vec::with_capacity(sessions.len());
        for session in &sessions {
            let observations = self.store.observations(session.id).await?;
            summaries.push(SessionSummary::build(session, &observations));
        }
        Ok(summaries)
    }

    pub async fn observations(&self, session_id: Uuid) -> AppResult<Vec<Observation>> {
        self.require_session(session_id).await?;
        self.store.observations(session_id).await
    }

    pub async fn delete(&self, session_id: Uuid) -> AppResult<()> {
        if !self.store.delete_session(session_id).await? {
            return Err(AppError::NotFound("Survey session".to_string()));
        }
        tracing::info!(session_id = %session_id, "Survey session deleted");
        Ok(())
    }

    async fn require_session(&self, session_id: Uuid) -> AppResult<SurveySession> {
        self.store
            .session(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Survey session".to_string()))
    }
}
