//! Validation utilities for surveillance inputs

use rust_decimal::Decimal;

// ============================================================================
// Calculator Settings
// ============================================================================

/// Margin of error must be a proportion strictly between 0 and 1
pub fn validate_margin_of_error(margin: Decimal) -> Result<(), &'static str> {
    if margin <= Decimal::ZERO || margin >= Decimal::ONE {
        return Err("Margin of error must be between 0 and 1");
    }
    Ok(())
}

/// Prevalence configured on a seasonal stage must lie in [0, 1]
pub fn validate_stage_prevalence(prevalence: Decimal) -> Result<(), &'static str> {
    if prevalence < Decimal::ZERO || prevalence > Decimal::ONE {
        return Err("Stage prevalence must be between 0 and 1");
    }
    Ok(())
}

// ============================================================================
// Survey Sessions
// ============================================================================

/// Maximum length of free-text observation notes
pub const MAX_NOTES_LENGTH: usize = 2000;

pub fn validate_notes(notes: &str) -> Result<(), &'static str> {
    if notes.chars().count() > MAX_NOTES_LENGTH {
        return Err("Notes must be at most 2000 characters");
    }
    Ok(())
}

/// Staleness threshold for the session sweep, at most 30 days
pub fn validate_staleness_hours(hours: i64) -> Result<(), &'static str> {
    if hours < 1 {
        return Err("Staleness threshold must be at least 1 hour");
    }
    if hours > 720 {
        return Err("Staleness threshold must be at most 720 hours");
    }
    Ok(())
}

// ============================================================================
// Farms
// ============================================================================

/// Farm dimensions used for the plant population
pub fn validate_farm_dimensions(
    size_hectares: Option<Decimal>,
    stocking_rate: Option<i32>,
) -> Result<(), &'static str> {
    if let Some(size) = size_hectares {
        if size <= Decimal::ZERO {
            return Err("Farm size must be positive");
        }
    }
    if let Some(rate) = stocking_rate {
        if rate <= 0 {
            return Err("Stocking rate must be positive");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_margin_of_error() {
        assert!(validate_margin_of_error(Decimal::new(5, 2)).is_ok());
        assert!(validate_margin_of_error(Decimal::ZERO).is_err());
        assert!(validate_margin_of_error(Decimal::ONE).is_err());
    }

    #[test]
    fn test_stage_prevalence() {
        assert!(validate_stage_prevalence(Decimal::ZERO).is_ok());
        assert!(validate_stage_prevalence(Decimal::ONE).is_ok());
        assert!(validate_stage_prevalence(Decimal::new(-1, 1)).is_err());
    }

    #[test]
    fn test_notes_length() {
        assert!(validate_notes("Leaf damage on north side").is_ok());
        assert!(validate_notes(&"x".repeat(2001)).is_err());
    }

    #[test]
    fn test_staleness_hours() {
        assert!(validate_staleness_hours(2).is_ok());
        assert!(validate_staleness_hours(0).is_err());
        assert!(validate_staleness_hours(721).is_err());
    }

    #[test]
    fn test_farm_dimensions() {
        assert!(validate_farm_dimensions(Some(Decimal::new(125, 1)), Some(100)).is_ok());
        assert!(validate_farm_dimensions(None, None).is_ok());
        assert!(validate_farm_dimensions(Some(Decimal::ZERO), None).is_err());
        assert!(validate_farm_dimensions(None, Some(-4)).is_err());
    }
}
