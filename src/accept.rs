//! Acceptance oracles.
//!
//! ABC replaces likelihood evaluation with an acceptance rule comparing a
//! simulated observation against the real one. Both supported modes, the
//! boolean predicate and the distance-below-tolerance rule, are expressed
//! through the single [`Acceptance`] trait so the engine never branches on
//! the mode.

use crate::settings::SettingsError;

/// Decides whether a simulated observation is compatible with a data point.
pub trait Acceptance<Obs>: Send + Sync {
    fn accept(&self, observed: &Obs, simulated: &Obs) -> bool;
}

/// Boolean-predicate acceptance mode.
pub struct Predicate<F>(pub F);

impl<Obs, F> Acceptance<Obs> for Predicate<F>
where
    F: Fn(&Obs, &Obs) -> bool + Send + Sync,
{
    fn accept(&self, observed: &Obs, simulated: &Obs) -> bool {
        (self.0)(observed, simulated)
    }
}

/// Distance-plus-tolerance acceptance mode: accepted iff
/// `distance(simulated, observed) <= epsilon`.
pub struct WithinTolerance<D> {
    distance: D,
    epsilon: f64,
}

impl<D> WithinTolerance<D> {
    pub fn new(distance: D, epsilon: f64) -> Result<Self, SettingsError> {
        if !epsilon.is_finite() || epsilon < 0f64 {
            return Err(SettingsError::BadTolerance(epsilon));
        }
        Ok(Self { distance, epsilon })
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }
}

impl<Obs, D> Acceptance<Obs> for WithinTolerance<D>
where
    D: Fn(&Obs, &Obs) -> f64 + Send + Sync,
{
    fn accept(&self, observed: &Obs, simulated: &Obs) -> bool {
        (self.distance)(simulated, observed) <= self.epsilon
    }
}
