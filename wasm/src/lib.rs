//! WebAssembly module for the Mango Surveillance Platform
//!
//! Lets the field app work offline:
//! - Surveillance effort (sample size) calculation
//! - Seasonal lookup
//! - Survey session progress and duration display
//! - Compliance status against the inspection cycle
//!
//! Structured values cross the boundary as JSON strings.

use chrono::{DateTime, NaiveDate, Utc};
use wasm_bindgen::prelude::*;

pub use shared::models::*;
pub use shared::validation::*;
use shared::{calculate_from_raw, ComplianceSchedule, DEFAULT_MARGIN_OF_ERROR};

fn report_error(message: String) -> JsValue {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::error_1(&JsValue::from_str(&message));
    JsValue::from_str(&message)
}

fn parse_session(session_json: &str) -> Result<SurveySession, JsValue> {
    serde_json::from_str(session_json)
        .map_err(|e| report_error(format!("Invalid session JSON: {}", e)))
}

/// Calculate the number of plants to inspect.
///
/// Returns a `CalculationOutcome` as JSON; input problems are reported in
/// its `error` field rather than thrown.
#[wasm_bindgen]
pub fn calculate_sample_size(
    population: Option<f64>,
    confidence_level: &str,
    prevalence: &str,
) -> Result<String, JsValue> {
    let population = population.filter(|n| n.is_finite()).map(|n| n as i64);
    let outcome: CalculationOutcome =
        calculate_from_raw(population, confidence_level, prevalence, DEFAULT_MARGIN_OF_ERROR).into();

    serde_json::to_string(&outcome)
        .map_err(|e| report_error(format!("Failed to encode outcome: {}", e)))
}

/// Season name for a calendar month (1-12)
#[wasm_bindgen]
pub fn season_for_month(month: u32) -> String {
    Season::for_month(month).to_string()
}

/// Percent of the session target covered by `observed` plants
#[wasm_bindgen]
pub fn session_progress(session_json: &str, observed: i32) -> Result<u8, JsValue> {
    Ok(parse_session(session_json)?.progress_percentage(observed as i64))
}

#[wasm_bindgen]
pub fn can_finish_session(session_json: &str, observed: i32) -> Result<bool, JsValue> {
    Ok(parse_session(session_json)?.can_finish(observed as i64))
}

#[wasm_bindgen]
pub fn remaining_plants(session_json: &str, observed: i32) -> Result<f64, JsValue> {
    Ok(parse_session(session_json)?.remaining_plants(observed as i64) as f64)
}

/// `"N/A"`, `"42 min"` or `"1h 5m"`
#[wasm_bindgen]
pub fn session_duration_display(session_json: &str) -> Result<String, JsValue> {
    Ok(parse_session(session_json)?.duration_display())
}

/// Evaluate the 14-day inspection cycle.
///
/// `last_surveillance` is an RFC 3339 timestamp, `today` a `YYYY-MM-DD` date.
/// Returns a `ComplianceReport` as JSON.
#[wasm_bindgen]
pub fn compliance_status(last_surveillance: Option<String>, today: &str) -> Result<String, JsValue> {
    let last = last_surveillance
        .map(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| report_error(format!("Invalid timestamp '{}': {}", raw, e)))
        })
        .transpose()?;
    let today = NaiveDate::parse_from_str(today, "%Y-%m-%d")
        .map_err(|e| report_error(format!("Invalid date '{}': {}", today, e)))?;

    let report = ComplianceSchedule::default().evaluate(last, today);
    serde_json::to_string(&report)
        .map_err(|e| report_error(format!("Failed to encode report: {}", e)))
}
