//! Surveillance effort calculation models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CalculationError;

/// Statistical confidence level for the sample-size estimate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(from = "i64", into = "i64")]
pub enum ConfidenceLevel {
    /// 90%, z = 1.645
    Ninety,
    /// 95%, z = 1.960
    #[default]
    NinetyFive,
    /// 99%, z = 2.575
    NinetyNine,
}

impl ConfidenceLevel {
    pub const ALL: [ConfidenceLevel; 3] = [
        ConfidenceLevel::Ninety,
        ConfidenceLevel::NinetyFive,
        ConfidenceLevel::NinetyNine,
    ];

    /// Map a percentage onto a supported level, falling back to 95%
    pub fn from_percent(percent: i64) -> Self {
        match percent {
            90 => ConfidenceLevel::Ninety,
            95 => ConfidenceLevel::NinetyFive,
            99 => ConfidenceLevel::NinetyNine,
            _ => ConfidenceLevel::default(),
        }
    }

    /// Parse user input such as `"99"`; anything unparseable yields the default
    pub fn parse_or_default(raw: &str) -> Self {
        raw.trim()
            .parse::<i64>()
            .map(Self::from_percent)
            .unwrap_or_default()
    }

    pub fn percent(&self) -> i64 {
        match self {
            ConfidenceLevel::Ninety => 90,
            ConfidenceLevel::NinetyFive => 95,
            ConfidenceLevel::NinetyNine => 99,
        }
    }

    /// Two-sided z-score
    pub fn z_score(&self) -> Decimal {
        match self {
            ConfidenceLevel::Ninety => Decimal::new(1645, 3),
            ConfidenceLevel::NinetyFive => Decimal::new(1960, 3),
            ConfidenceLevel::NinetyNine => Decimal::new(2575, 3),
        }
    }
}

impl From<i64> for ConfidenceLevel {
    fn from(percent: i64) -> Self {
        Self::from_percent(percent)
    }
}

impl From<ConfidenceLevel> for i64 {
    fn from(level: ConfidenceLevel) -> Self {
        level.percent()
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}% confidence", self.percent())
    }
}

/// Output of the surveillance effort calculator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalculationResult {
    /// Plant population N
    pub population: i64,
    /// Level actually used, after fallback
    pub confidence_level: ConfidenceLevel,
    pub prevalence: Decimal,
    pub margin_of_error: Decimal,
    pub required_plants: i64,
    /// Required plants as a share of N, one decimal place
    pub percentage_of_total: Decimal,
    /// Inspection rounds needed to cover the population; `None` when nothing needs surveying
    pub survey_frequency: Option<i64>,
}

/// Flat, display-friendly form of a calculation attempt.
///
/// On failure every numeric field is `None` and `error` holds the message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalculationOutcome {
    pub population: Option<i64>,
    pub confidence_level: Option<ConfidenceLevel>,
    pub prevalence: Option<Decimal>,
    pub margin_of_error: Option<Decimal>,
    pub required_plants: Option<i64>,
    pub percentage_of_total: Option<Decimal>,
    pub survey_frequency: Option<i64>,
    pub error: Option<String>,
    pub error_code: Option<String>,
}

impl From<Result<CalculationResult, CalculationError>> for CalculationOutcome {
    fn from(result: Result<CalculationResult, CalculationError>) -> Self {
        match result {
            Ok(r) => CalculationOutcome {
                population: Some(r.population),
                confidence_level: Some(r.confidence_level),
                prevalence: Some(r.prevalence),
                margin_of_error: Some(r.margin_of_error),
                required_plants: Some(r.required_plants),
                percentage_of_total: Some(r.percentage_of_total),
                survey_frequency: r.survey_frequency,
                error: None,
                error_code: None,
            },
            Err(e) => CalculationOutcome {
                population: None,
                confidence_level: None,
                prevalence: None,
                margin_of_error: None,
                required_plants: None,
                percentage_of_total: None,
                survey_frequency: None,
                error: Some(e.to_string()),
                error_code: Some(e.code().to_string()),
            },
        }
    }
}

/// A calculation stored against a farm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveillanceCalculation {
    pub id: Uuid,
    pub farm_id: Uuid,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    /// Seasonal stage name at calculation time
    pub season: String,
    pub confidence_level: ConfidenceLevel,
    pub population_size: i64,
    pub prevalence: Decimal,
    pub margin_of_error: Decimal,
    pub required_plants: i64,
    pub percentage_of_total: Decimal,
    pub survey_frequency: Option<i64>,
    pub is_current: bool,
    pub notes: Option<String>,
}

/// A calculation about to become the farm's current one
#[derive(Debug, Clone)]
pub struct NewCalculation {
    pub farm_id: Uuid,
    pub created_by: Uuid,
    pub season: String,
    pub notes: Option<String>,
    pub result: CalculationResult,
}

impl NewCalculation {
    /// Materialise as the current record
    pub fn into_record(self, id: Uuid, created_at: DateTime<Utc>) -> SurveillanceCalculation {
        SurveillanceCalculation {
            id,
            farm_id: self.farm_id,
            created_by: self.created_by,
            created_at,
            season: self.season,
            confidence_level: self.result.confidence_level,
            population_size: self.result.population,
            prevalence: self.result.prevalence,
            margin_of_error: self.result.margin_of_error,
            required_plants: self.result.required_plants,
            percentage_of_total: self.result.percentage_of_total,
            survey_frequency: self.result.survey_frequency,
            is_current: true,
            notes: self.notes,
        }
    }
}
