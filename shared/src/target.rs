//! Target sample size resolution for new survey sessions
//!
//! Strategies are tried in order and the first one that yields a positive
//! target wins. A saved calculation ends the chain even when it requires
//! no plants.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculator::calculate_surveillance_effort;
use crate::models::ConfidenceLevel;

/// Everything the strategies may consult
#[derive(Debug, Clone, Default)]
pub struct TargetInputs {
    /// Required plants from the farm's current calculation
    pub current_calculation: Option<i64>,
    pub population: Option<i64>,
    /// Seasonal prevalence for the current month
    pub prevalence: Option<Decimal>,
    pub confidence: ConfidenceLevel,
    pub margin_of_error: Decimal,
}

/// Where a session target came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TargetStrategy {
    SavedCalculation,
    FreshCalculation,
    PopulationHeuristic,
}

impl TargetStrategy {
    pub const ORDER: [TargetStrategy; 3] = [
        TargetStrategy::SavedCalculation,
        TargetStrategy::FreshCalculation,
        TargetStrategy::PopulationHeuristic,
    ];

    pub fn resolve(&self, inputs: &TargetInputs) -> Option<i64> {
        let target = match self {
            TargetStrategy::SavedCalculation => inputs.current_calculation,
            TargetStrategy::FreshCalculation => {
                let prevalence = inputs.prevalence?;
                calculate_surveillance_effort(
                    inputs.population,
                    inputs.confidence,
                    prevalence,
                    inputs.margin_of_error,
                )
                .ok()
                .map(|result| result.required_plants)
            }
            TargetStrategy::PopulationHeuristic => inputs
                .population
                .filter(|n| *n > 0)
                .map(|n| (n / 10).clamp(1, 5)),
        };
        target.filter(|t| *t > 0)
    }

    pub fn description(&self) -> &'static str {
        match self {
            TargetStrategy::SavedCalculation => "saved calculation",
            TargetStrategy::FreshCalculation => "calculated default",
            TargetStrategy::PopulationHeuristic => "fallback (10% of plants, min 1, max 5)",
        }
    }
}

/// A resolved target and the strategy that produced it
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub target_plants: i64,
    pub source: TargetStrategy,
}

/// Run the strategies top-down. `None` leaves the session without a target.
pub fn resolve_target(inputs: &TargetInputs) -> Option<ResolvedTarget> {
    for strategy in TargetStrategy::ORDER {
        if let Some(target_plants) = strategy.resolve(inputs) {
            return Some(ResolvedTarget {
                target_plants,
                source: strategy,
            });
        }
        if strategy == TargetStrategy::SavedCalculation && inputs.current_calculation.is_some() {
            return None;
        }
    }
    None
}

/// Explain why no target could be derived
pub fn unresolved_reason(inputs: &TargetInputs) -> &'static str {
    if inputs.current_calculation.is_some() {
        return "saved calculation requires no plants";
    }
    match (inputs.population, inputs.prevalence) {
        (None, _) => "no farm plant count",
        (Some(n), _) if n <= 0 => "farm plant count is not positive",
        (Some(_), None) => "no seasonal prevalence data",
        (Some(_), Some(_)) => "no strategy produced a positive target",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::DEFAULT_MARGIN_OF_ERROR;

    fn inputs() -> TargetInputs {
        TargetInputs {
            current_calculation: None,
            population: Some(1000),
            prevalence: Some(Decimal::new(1, 1)),
            confidence: ConfidenceLevel::NinetyFive,
            margin_of_error: DEFAULT_MARGIN_OF_ERROR,
        }
    }

    #[test]
    fn test_saved_calculation_wins() {
        let mut i = inputs();
        i.current_calculation = Some(40);
        assert_eq!(
            resolve_target(&i),
            Some(ResolvedTarget {
                target_plants: 40,
                source: TargetStrategy::SavedCalculation
            })
        );
    }

    #[test]
    fn test_fresh_calculation_when_nothing_saved() {
        let resolved = resolve_target(&inputs()).unwrap();
        assert_eq!(resolved.source, TargetStrategy::FreshCalculation);
        assert_eq!(resolved.target_plants, 122);
    }

    #[test]
    fn test_heuristic_without_prevalence() {
        let mut i = inputs();
        i.prevalence = None;
        let resolved = resolve_target(&i).unwrap();
        assert_eq!(resolved.source, TargetStrategy::PopulationHeuristic);
        assert_eq!(resolved.target_plants, 5);

        i.population = Some(23);
        assert_eq!(resolve_target(&i).unwrap().target_plants, 2);

        i.population = Some(4);
        assert_eq!(resolve_target(&i).unwrap().target_plants, 1);
    }

    #[test]
    fn test_zero_fresh_calculation_falls_through() {
        let mut i = inputs();
        i.prevalence = Some(Decimal::ZERO);
        let resolved = resolve_target(&i).unwrap();
        assert_eq!(resolved.source, TargetStrategy::PopulationHeuristic);
    }

    #[test]
    fn test_saved_zero_calculation_leaves_no_target() {
        let mut i = inputs();
        i.current_calculation = Some(0);
        assert_eq!(resolve_target(&i), None);
        assert_eq!(unresolved_reason(&i), "saved calculation requires no plants");
    }

    #[test]
    fn test_no_target_without_population() {
        let mut i = inputs();
        i.population = None;
        assert_eq!(resolve_target(&i), None);
        assert_eq!(unresolved_reason(&i), "no farm plant count");
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_resolved_target_is_positive(
                saved in proptest::option::of(-10i64..500),
                population in proptest::option::of(-10i64..100_000),
                prevalence_millis in proptest::option::of(0i64..1500),
            ) {
                let i = TargetInputs {
                    current_calculation: saved,
                    population,
                    prevalence: prevalence_millis.map(|m| Decimal::new(m, 3)),
                    confidence: ConfidenceLevel::NinetyFive,
                    margin_of_error: DEFAULT_MARGIN_OF_ERROR,
                };

                let resolved = resolve_target(&i);
                if let Some(resolved) = resolved {
                    prop_assert!(resolved.target_plants > 0);
                }
                if saved.is_some() {
                    prop_assert!(resolved.map_or(true, |r| r.source == TargetStrategy::SavedCalculation));
                }
            }

            #[test]
            fn prop_heuristic_between_one_and_five(population in 1i64..1_000_000) {
                let i = TargetInputs {
                    population: Some(population),
                    ..TargetInputs::default()
                };

                let target = TargetStrategy::PopulationHeuristic.resolve(&i).unwrap();
                prop_assert!((1..=5).contains(&target));
            }
        }
    }
}
