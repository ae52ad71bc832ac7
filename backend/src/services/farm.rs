//! Farm-level surveillance overview and statistics

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, Duration};
use serde::Serialize;
use shared::{Clock, ComplianceReport};
use uuid::Uuid;

use crate::config::SurveillanceConfig;
use crate::error::{AppError, AppResult};
use crate::models::{Farm, Observation, Season, SeasonalInfo, SessionStatus, SurveillanceCalculation};
use crate::services::store::SurveillanceStore;

/// How many pests and diseases the stats report
const TOP_THREATS: usize = 5;

#[derive(Clone)]
pub struct FarmService {
    store: Arc<dyn SurveillanceStore>,
    clock: Arc<dyn Clock>,
    settings: SurveillanceConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct FarmSurveillance {
    pub farm_id: Uuid,
    pub farm_name: String,
    pub total_plants: Option<i64>,
    pub season: Season,
    pub seasonal: SeasonalInfo,
    pub compliance: ComplianceReport,
    pub current_calculation: Option<SurveillanceCalculation>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ThreatCount {
    pub id: Uuid,
    pub occurrences: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FarmStats {
    pub farm_id: Uuid,
    pub completed_sessions: usize,
    pub completed_observations: usize,
    pub recent_window_days: i64,
    pub recent_sessions: usize,
    pub top_pests: Vec<ThreatCount>,
    pub top_diseases: Vec<ThreatCount>,
}

/// Most frequent ids, ties broken by id so the order is stable
fn top_counts<'a>(ids: impl Iterator<Item = &'a Uuid>) -> Vec<ThreatCount> {
    let mut counts: HashMap<Uuid, usize> = HashMap::new();
    for id in ids {
        *counts.entry(*id).or_default() += 1;
    }

    let mut ranked: Vec<ThreatCount> = counts
        .into_iter()
        .map(|(id, occurrences)| ThreatCount { id, occurrences })
        .collect();
    ranked.sort_by(|a, b| b.occurrences.cmp(&a.occurrences).then(a.id.cmp(&b.id)));
    ranked.truncate(TOP_THREATS);
    ranked
}

impl FarmService {
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

    /// Compliance status, seasonal context and the current calculation for a farm
    pub async fn surveillance(&self, farm_id: Uuid) -> AppResult<FarmSurveillance> {
        let farm = self.require_farm(farm_id).await?;
        let now = self.clock.now();
        let today = now.date_naive();

        let last_surveillance = self
            .store
            .sessions_for_farm(farm_id)
            .await?
            .into_iter()
            .filter(|s| s.status == SessionStatus::Completed)
            .filter_map(|s| s.end_time)
            .max();
        let compliance = self.settings.schedule().evaluate(last_surveillance, today);

        let stages = self.store.seasonal_stages().await?;
        let seasonal = SeasonalInfo::for_month(&stages, now.month());
        let current_calculation = self.store.current_calculation(farm_id).await?;

        Ok(FarmSurveillance {
            farm_id,
            total_plants: farm.total_plants(),
            season: farm.current_season(today),
            farm_name: farm.name,
            seasonal,
            compliance,
            current_calculation,
        })
    }

    pub async fn stats(&self, farm_id: Uuid) -> AppResult<FarmStats> {
        self.require_farm(farm_id).await?;
        let recent_cutoff = self.clock.now() - Duration::days(self.settings.recent_window_days);

        let completed: Vec<_> = self
            .store
            .sessions_for_farm(farm_id)
            .await?
            .into_iter()
            .filter(|s| s.status == SessionStatus::Completed)
            .collect();
        let recent_sessions = completed
            .iter()
            .filter(|s| s.start_time >= recent_cutoff)
            .count();

        let observations: Vec<Observation> =
            self.store.completed_observations_for_farm(farm_id).await?;

        Ok(FarmStats {
            farm_id,
            completed_sessions: completed.len(),
            completed_observations: observations.len(),
            recent_window_days: self.settings.recent_window_days,
            recent_sessions,
            top_pests: top_counts(observations.iter().flat_map(|o| o.pest_ids.iter())),
            top_diseases: top_counts(observations.iter().flat_map(|o| o.disease_ids.iter())),
        })
    }

    async fn require_farm(&self, farm_id: Uuid) -> AppResult<Farm> {
        self.store
            .farm(farm_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Farm".to_string()))
    }
}
