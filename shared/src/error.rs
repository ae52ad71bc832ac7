//! Error types for the surveillance core
//!
//! Every message is written so a caller can show it to the grower as-is.

use thiserror::Error;

/// Input problems detected by the surveillance effort calculator.
///
/// These are deterministic: retrying with the same inputs yields the same error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalculationError {
    #[error("Total number of plants (N) is required for the calculation")]
    PopulationRequired,

    #[error("Total number of plants (N) must be positive, got {population}")]
    PopulationNotPositive { population: i64 },

    #[error("Invalid prevalence value (p): '{value}' is not a number")]
    InvalidPrevalence { value: String },

    #[error("Prevalence (p) must be between 0 and 1, got {value}")]
    PrevalenceOutOfRange { value: String },

    #[error("Calculation error: {0}. Please check input parameters")]
    Arithmetic(&'static str),
}

impl CalculationError {
    /// Machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            CalculationError::PopulationRequired => "POPULATION_REQUIRED",
            CalculationError::PopulationNotPositive { .. } => "POPULATION_NOT_POSITIVE",
            CalculationError::InvalidPrevalence { .. } => "INVALID_PREVALENCE",
            CalculationError::PrevalenceOutOfRange { .. } => "PREVALENCE_OUT_OF_RANGE",
            CalculationError::Arithmetic(_) => "CALCULATION_ERROR",
        }
    }

    /// Input field the error refers to
    pub fn field(&self) -> &'static str {
        match self {
            CalculationError::PopulationRequired
            | CalculationError::PopulationNotPositive { .. } => "population",
            CalculationError::InvalidPrevalence { .. }
            | CalculationError::PrevalenceOutOfRange { .. } => "prevalence",
            CalculationError::Arithmetic(_) => "calculation",
        }
    }
}

/// Rejected survey session transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("This survey session is no longer active (status: {status})")]
    NotActive { status: String },

    #[error("Cannot add more observations. The target of {target} plants has already been reached. Please finish the session")]
    TargetReached { target: i64 },

    #[error("Plant sequence number {0} has already been used in this session")]
    SequenceInUse(i64),

    #[error("Cannot complete session. You need to survey {target} plants but only surveyed {observed}")]
    NotEnoughObservations { observed: i64, target: i64 },

    #[error("Cannot complete session. Record at least one observation first")]
    NoObservations,

    #[error("You have surveyed more plants ({observed}) than required ({target}). Please contact an administrator")]
    OverCollected { observed: i64, target: i64 },
}

impl SessionError {
    /// Machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::NotActive { .. } => "SESSION_NOT_ACTIVE",
            SessionError::TargetReached { .. } => "TARGET_REACHED",
            SessionError::SequenceInUse(_) => "SEQUENCE_IN_USE",
            SessionError::NotEnoughObservations { .. } => "NOT_ENOUGH_OBSERVATIONS",
            SessionError::NoObservations => "NO_OBSERVATIONS",
            SessionError::OverCollected { .. } => "OVER_COLLECTED",
        }
    }

    /// Over-collection needs manual repair rather than a corrected retry.
    pub fn is_integrity_anomaly(&self) -> bool {
        matches!(self, SessionError::OverCollected { .. })
    }
}
