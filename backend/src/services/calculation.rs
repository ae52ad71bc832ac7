//! Surveillance effort calculations for farms

use std::sync::Arc;

use chrono::Datelike;
use shared::{calculate_from_raw, calculate_surveillance_effort, validate_notes, Clock};
use uuid::Uuid;

use crate::config::SurveillanceConfig;
use crate::error::{AppError, AppResult};
use crate::models::{
    CalculationOutcome, ConfidenceLevel, Farm, NewCalculation, SeasonalInfo,
    SurveillanceCalculation,
};
use crate::services::store::SurveillanceStore;

#[derive(Clone)]
pub struct CalculationService {
    store: Arc<dyn SurveillanceStore>,
    clock: Arc<dyn Clock>,
    settings: SurveillanceConfig,
}

impl CalculationService {
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

    /// Stateless calculator for raw form values. Failures are reported inside the outcome.
    pub fn preview(
        &self,
        population: Option<i64>,
        confidence_level: &str,
        prevalence: &str,
    ) -> CalculationOutcome {
        let result = calculate_from_raw(
            population,
            confidence_level,
            prevalence,
            self.settings.margin_of_error,
        );
        if let Err(e) = &result {
            tracing::debug!(code = e.code(), "Calculator preview rejected input");
        }
        CalculationOutcome::from(result)
    }

    /// Calculate from the farm's population and this month's prevalence and make
    /// the result the farm's current calculation.
    pub async fn calculate_for_farm(
        &self,
        farm_id: Uuid,
        created_by: Uuid,
        confidence: Option<ConfidenceLevel>,
        notes: Option<String>,
    ) -> AppResult<SurveillanceCalculation> {
        if let Some(notes) = &notes {
            validate_notes(notes).map_err(|msg| AppError::validation("notes", msg))?;
        }

        let farm = self.require_farm(farm_id).await?;
        let population = farm.total_plants().ok_or_else(|| {
            AppError::validation(
                "population",
                "Farm size and stocking rate are required to calculate surveillance effort",
            )
        })?;

        let now = self.clock.now();
        let stages = self.store.seasonal_stages().await?;
        let season = SeasonalInfo::for_month(&stages, now.month());
        let prevalence = season.prevalence.ok_or_else(|| {
            AppError::validation(
                "prevalence",
                format!("No seasonal prevalence data for month {}", season.month_used),
            )
        })?;

        let confidence = confidence.unwrap_or_else(|| self.settings.default_confidence());
        let result = calculate_surveillance_effort(
            Some(population),
            confidence,
            prevalence,
            self.settings.margin_of_error,
        )?;

        let calculation = self
            .store
            .replace_current_calculation(
                NewCalculation {
                    farm_id,
                    created_by,
                    season: season.season_label(),
                    notes: notes.filter(|n| !n.trim().is_empty()),
                    result,
                },
                now,
            )
            .await?;

        tracing::info!(
            farm_id = %farm_id,
            calculation_id = %calculation.id,
            required_plants = calculation.required_plants,
            confidence = calculation.confidence_level.percent(),
            "Surveillance calculation saved as current"
        );

        Ok(calculation)
    }

    pub async fn current(&self, farm_id: Uuid) -> AppResult<SurveillanceCalculation> {
        self.require_farm(farm_id).await?;
        self.store
            .current_calculation(farm_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Current calculation".to_string()))
    }

    /// All calculations for a farm, newest first
    pub async fn history(&self, farm_id: Uuid) -> AppResult<Vec<SurveillanceCalculation>> {
        self.require_farm(farm_id).await?;
        self.store.calculations_for_farm(farm_id).await
    }

    async fn require_farm(&self, farm_id: Uuid) -> AppResult<Farm> {
        self.store
            .farm(farm_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Farm".to_string()))
    }
}
