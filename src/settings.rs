//! Engine configuration.

use thiserror::Error;

use crate::family::FamilyError;

/// The two observed guard formulas for rejecting an update as too noisy,
/// exposed as configuration rather than hard-coded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GuardPolicy {
    /// Admit an update iff `accepted >= fraction * num_simulations`.
    MinFraction(f64),
    /// Admit an update iff `accepted >= count`.
    MinCount(u64),
}

impl GuardPolicy {
    pub(crate) fn admits(&self, accepted: u64, total: u64) -> bool {
        match *self {
            GuardPolicy::MinFraction(fraction) => accepted as f64 >= fraction * total as f64,
            GuardPolicy::MinCount(count) => accepted >= count,
        }
    }
}

/// Settings for the EP-ABC engine.
#[derive(Debug, Clone, Copy)]
pub struct EpSettings {
    /// Monte-Carlo simulations per site update (M).
    pub num_simulations: usize,
    /// Guard against committing an update from too few accepted draws.
    pub guard: GuardPolicy,
    /// Seed of the engine RNG. Runs with equal seeds and settings are
    /// reproducible, independent of thread count.
    pub seed: u64,
}

impl Default for EpSettings {
    fn default() -> Self {
        Self {
            num_simulations: 1000,
            guard: GuardPolicy::MinFraction(0.001),
            seed: 0,
        }
    }
}

impl EpSettings {
    pub(crate) fn validate(&self) -> Result<(), SettingsError> {
        if self.num_simulations == 0 {
            return Err(SettingsError::NoSimulations);
        }
        match self.guard {
            GuardPolicy::MinFraction(fraction) => {
                if !fraction.is_finite() || fraction <= 0f64 || fraction > 1f64 {
                    return Err(SettingsError::BadGuardFraction(fraction));
                }
            }
            GuardPolicy::MinCount(count) => {
                if count == 0 {
                    return Err(SettingsError::BadGuardCount);
                }
            }
        }
        Ok(())
    }
}

/// Construction-time configuration failures. The engine is never built in an
/// invalid state.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("at least one simulation per site update is required")]
    NoSimulations,
    #[error("guard fraction must lie in (0, 1], got {0}")]
    BadGuardFraction(f64),
    #[error("guard count must be at least one")]
    BadGuardCount,
    #[error("tolerance must be finite and non-negative, got {0}")]
    BadTolerance(f64),
    #[error("prior moments do not match the family dimension {0}")]
    PriorDimension(usize),
    #[error("simulator has {simulator} parameters but the family has dimension {family}")]
    SimulatorDimension { simulator: usize, family: usize },
    #[error("prior is not a proper gaussian")]
    DegeneratePrior(#[source] FamilyError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_validate() {
        assert!(EpSettings::default().validate().is_ok());
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let mut settings = EpSettings {
            num_simulations: 0,
            ..EpSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::NoSimulations)
        ));

        settings.num_simulations = 100;
        settings.guard = GuardPolicy::MinFraction(0.0);
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::BadGuardFraction(_))
        ));

        settings.guard = GuardPolicy::MinFraction(1.5);
        assert!(settings.validate().is_err());

        settings.guard = GuardPolicy::MinCount(0);
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::BadGuardCount)
        ));

        settings.guard = GuardPolicy::MinCount(5);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn guard_boundaries_are_exact() {
        let fraction = GuardPolicy::MinFraction(0.005);
        assert!(!fraction.admits(4, 1000));
        assert!(fraction.admits(5, 1000));

        let count = GuardPolicy::MinCount(5);
        assert!(!count.admits(4, 1000));
        assert!(count.admits(5, 1000));
    }
}
