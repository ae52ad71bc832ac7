//! Surveillance calculator handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::{CalculationOutcome, ConfidenceLevel, SurveillanceCalculation};
use crate::services::CalculationService;
use crate::AppState;

/// Raw calculator form. Numbers may arrive as JSON numbers or strings.
#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub population: Option<i64>,
    #[serde(default)]
    pub confidence_level: Option<Value>,
    #[serde(default)]
    pub prevalence: Option<Value>,
}

fn raw_text(value: Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CalculateRequest {
    /// 90, 95 or 99; anything else falls back to 95
    pub confidence_level: Option<i64>,
    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

/// Run the calculator on raw input without saving anything
pub async fn preview_calculation(
    State(state): State<AppState>,
    Json(input): Json<PreviewRequest>,
) -> Json<CalculationOutcome> {
    let service = CalculationService::new(state.store, state.clock, state.config.surveillance.clone());
    Json(service.preview(
        input.population,
        &raw_text(input.confidence_level),
        &raw_text(input.prevalence),
    ))
}

/// Calculate for a farm and make it the current calculation
pub async fn create_calculation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
    Json(input): Json<CalculateRequest>,
) -> AppResult<(StatusCode, Json<SurveillanceCalculation>)> {
    input.validate()?;

    let service = CalculationService::new(state.store, state.clock, state.config.surveillance.clone());
    let calculation = service
        .calculate_for_farm(
            farm_id,
            current_user.0,
            input.confidence_level.map(ConfidenceLevel::from_percent),
            input.notes,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(calculation)))
}

/// Calculation history, newest first
pub async fn list_calculations(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
) -> AppResult<Json<Vec<SurveillanceCalculation>>> {
    let service = CalculationService::new(state.store, state.clock, state.config.surveillance.clone());
    let calculations = service.history(farm_id).await?;
    Ok(Json(calculations))
}

pub async fn get_current_calculation(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
) -> AppResult<Json<SurveillanceCalculation>> {
    let service = CalculationService::new(state.store, state.clock, state.config.surveillance.clone());
    let calculation = service.current(farm_id).await?;
    Ok(Json(calculation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_text_accepts_numbers_and_strings() {
        assert_eq!(raw_text(Some(serde_json::json!(0.1))), "0.1");
        assert_eq!(raw_text(Some(serde_json::json!("0.25"))), "0.25");
        assert_eq!(raw_text(Some(serde_json::json!(95))), "95");
        assert_eq!(raw_text(None), "");
        assert_eq!(raw_text(Some(Value::Null)), "");
    }
}
