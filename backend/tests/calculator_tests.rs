//! Surveillance effort calculator tests
//!
//! Property checks over the sample-size formula:
//! - required plants stay within [1, N] for 0 < p < 1
//! - boundary prevalences (p = 0, p >= 1) short-circuit
//! - the calculation is pure and monotonic in confidence

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    calculate_from_raw, calculate_surveillance_effort, ConfidenceLevel, DEFAULT_MARGIN_OF_ERROR,
};

fn population_strategy() -> impl Strategy<Value = i64> {
    1..=200_000i64
}

/// 0.001 to 0.999
fn prevalence_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..=999i64).prop_map(|n| Decimal::new(n, 3))
}

fn confidence_strategy() -> impl Strategy<Value = ConfidenceLevel> {
    prop::sample::select(ConfidenceLevel::ALL.to_vec())
}

fn compute(
    population: i64,
    confidence: ConfidenceLevel,
    prevalence: Decimal,
) -> shared::CalculationResult {
    calculate_surveillance_effort(Some(population), confidence, prevalence, DEFAULT_MARGIN_OF_ERROR)
        .unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[test]
fn test_reference_confidence_levels() {
    let ninety = compute(1000, ConfidenceLevel::Ninety, Decimal::new(1, 1));
    let ninety_five = compute(1000, ConfidenceLevel::NinetyFive, Decimal::new(1, 1));
    let ninety_nine = compute(1000, ConfidenceLevel::NinetyNine, Decimal::new(1, 1));

    assert_eq!(ninety_five.required_plants, 122);
    assert!(ninety.required_plants < ninety_five.required_plants);
    assert!(ninety_five.required_plants < ninety_nine.required_plants);
}

#[test]
fn test_raw_input_errors_are_values() {
    let err = calculate_from_raw(Some(0), "95", "0.1", DEFAULT_MARGIN_OF_ERROR).unwrap_err();
    assert_eq!(err.code(), "POPULATION_NOT_POSITIVE");

    // Population is checked before prevalence
    let err = calculate_from_raw(None, "95", "not a number", DEFAULT_MARGIN_OF_ERROR).unwrap_err();
    assert_eq!(err.code(), "POPULATION_REQUIRED");
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Sample size is at least one plant and never more than the population
    #[test]
    fn prop_required_plants_bounded(
        population in population_strategy(),
        confidence in confidence_strategy(),
        prevalence in prevalence_strategy()
    ) {
        let result = compute(population, confidence, prevalence);

        prop_assert!(result.required_plants >= 1);
        prop_assert!(result.required_plants <= population);
        prop_assert!(result.percentage_of_total >= Decimal::ZERO);
        prop_assert!(result.percentage_of_total <= Decimal::ONE_HUNDRED);
        prop_assert_eq!(result.confidence_level, confidence);
    }

    /// Rounds of `required` plants fit into the population
    #[test]
    fn prop_frequency_partitions_population(
        population in population_strategy(),
        prevalence in prevalence_strategy()
    ) {
        let result = compute(population, ConfidenceLevel::NinetyFive, prevalence);
        let frequency = result.survey_frequency.unwrap();

        prop_assert!(frequency >= 1);
        prop_assert!(frequency * result.required_plants <= population);
    }

    /// Zero prevalence means nothing to survey
    #[test]
    fn prop_zero_prevalence(population in population_strategy(), confidence in confidence_strategy()) {
        let result = compute(population, confidence, Decimal::ZERO);

        prop_assert_eq!(result.required_plants, 0);
        prop_assert_eq!(result.percentage_of_total, Decimal::ZERO);
        prop_assert_eq!(result.survey_frequency, None);
    }

    /// Certain presence means surveying every plant
    #[test]
    fn prop_full_prevalence(
        population in population_strategy(),
        extra in 0i64..=500i64
    ) {
        let prevalence = Decimal::ONE + Decimal::new(extra, 2);
        let result = compute(population, ConfidenceLevel::NinetyFive, prevalence);

        prop_assert_eq!(result.required_plants, population);
        prop_assert_eq!(result.survey_frequency, Some(1));
        prop_assert_eq!(result.percentage_of_total, Decimal::ONE_HUNDRED);
    }

    /// Negative prevalence is rejected
    #[test]
    fn prop_negative_prevalence_rejected(
        population in population_strategy(),
        n in 1i64..=1000i64
    ) {
        let result = calculate_surveillance_effort(
            Some(population),
            ConfidenceLevel::NinetyFive,
            Decimal::new(-n, 3),
            DEFAULT_MARGIN_OF_ERROR,
        );

        prop_assert_eq!(result.unwrap_err().code(), "PREVALENCE_OUT_OF_RANGE");
    }

    /// Same inputs, same answer
    #[test]
    fn prop_calculation_is_pure(
        population in population_strategy(),
        confidence in confidence_strategy(),
        prevalence in prevalence_strategy()
    ) {
        prop_assert_eq!(
            compute(population, confidence, prevalence),
            compute(population, confidence, prevalence)
        );
    }

    /// Higher confidence never asks for fewer plants
    #[test]
    fn prop_monotonic_in_confidence(
        population in population_strategy(),
        prevalence in prevalence_strategy()
    ) {
        let ninety = compute(population, ConfidenceLevel::Ninety, prevalence).required_plants;
        let ninety_five = compute(population, ConfidenceLevel::NinetyFive, prevalence).required_plants;
        let ninety_nine = compute(population, ConfidenceLevel::NinetyNine, prevalence).required_plants;

        prop_assert!(ninety <= ninety_five);
        prop_assert!(ninety_five <= ninety_nine);
    }
}
