//! Surveillance effort calculator
//!
//! Sample size for estimating a proportion in a finite population:
//!
//! ```text
//! m = z² · p · (1 − p) / d²
//! n = m / (1 + (m − 1) / N)
//! required = min(N, ⌈n⌉)
//! ```
//!
//! All arithmetic is done in `Decimal` so results are reproducible.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::CalculationError;
use crate::models::{CalculationResult, ConfidenceLevel};

/// Margin of error d used system-wide (5%)
pub const DEFAULT_MARGIN_OF_ERROR: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

/// Compute the sample size from raw form input.
///
/// An unparseable confidence level falls back to 95%; an unparseable
/// prevalence is an error.
pub fn calculate_from_raw(
    population: Option<i64>,
    confidence_level: &str,
    prevalence: &str,
    margin_of_error: Decimal,
) -> Result<CalculationResult, CalculationError> {
    check_population(population)?;

    let confidence = ConfidenceLevel::parse_or_default(confidence_level);
    let prevalence = parse_prevalence(prevalence)?;

    calculate_surveillance_effort(population, confidence, prevalence, margin_of_error)
}

/// Compute the number of plants to inspect for a population N.
pub fn calculate_surveillance_effort(
    population: Option<i64>,
    confidence: ConfidenceLevel,
    prevalence: Decimal,
    margin_of_error: Decimal,
) -> Result<CalculationResult, CalculationError> {
    let population = check_population(population)?;

    let required_plants = if prevalence.is_zero() {
        0
    } else if prevalence >= Decimal::ONE {
        population
    } else if prevalence > Decimal::ZERO {
        finite_population_sample(population, confidence, prevalence, margin_of_error)?
    } else {
        return Err(CalculationError::PrevalenceOutOfRange {
            value: prevalence.to_string(),
        });
    };

    Ok(CalculationResult {
        population,
        confidence_level: confidence,
        prevalence,
        margin_of_error,
        required_plants,
        percentage_of_total: percentage_of_total(required_plants, population),
        survey_frequency: survey_frequency(required_plants, population),
    })
}

fn check_population(population: Option<i64>) -> Result<i64, CalculationError> {
    match population {
        None => Err(CalculationError::PopulationRequired),
        Some(n) if n <= 0 => Err(CalculationError::PopulationNotPositive { population: n }),
        Some(n) => Ok(n),
    }
}

fn parse_prevalence(raw: &str) -> Result<Decimal, CalculationError> {
    let trimmed = raw.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| CalculationError::InvalidPrevalence {
            value: raw.to_string(),
        })
}

fn finite_population_sample(
    population: i64,
    confidence: ConfidenceLevel,
    prevalence: Decimal,
    margin_of_error: Decimal,
) -> Result<i64, CalculationError> {
    let z = confidence.z_score();
    let d_squared = margin_of_error * margin_of_error;
    if d_squared.is_zero() {
        return Err(CalculationError::Arithmetic(
            "margin of error squared cannot be zero",
        ));
    }

    let m = z * z * prevalence * (Decimal::ONE - prevalence) / d_squared;

    let correction = Decimal::ONE + (m - Decimal::ONE) / Decimal::from(population);
    if correction.is_zero() {
        return Err(CalculationError::Arithmetic(
            "division by zero while correcting for population size",
        ));
    }
    let n = m / correction;

    let mut required = n
        .ceil()
        .to_i64()
        .ok_or(CalculationError::Arithmetic("sample size out of range"))?
        .min(population);

    // never report zero plants for a non-zero prevalence
    if required < 1 && n > Decimal::ZERO {
        required = 1;
    }

    Ok(required)
}

/// Share of the population to inspect, rounded to one decimal place
pub fn percentage_of_total(required_plants: i64, population: i64) -> Decimal {
    if population <= 0 || required_plants <= 0 {
        return Decimal::new(0, 1);
    }
    (Decimal::from(required_plants) / Decimal::from(population) * Decimal::ONE_HUNDRED).round_dp(1)
}

/// Number of inspection rounds that partition the population
pub fn survey_frequency(required_plants: i64, population: i64) -> Option<i64> {
    if required_plants <= 0 || population < required_plants {
        return None;
    }
    Some((population / required_plants).max(1))
}
