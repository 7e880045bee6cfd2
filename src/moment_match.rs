//! Moment matching of accepted trials.

use crate::{
    family::{GaussianFamily, Moments},
    sampler::Trial,
    settings::GuardPolicy,
};

/// Result of moment-matching one batch of trials.
#[derive(Debug, Clone)]
pub enum UpdateOutcome<F: GaussianFamily> {
    /// Enough accepted draws with a proper empirical covariance.
    Updated {
        moments: Moments<F>,
        /// Accepted-fraction estimate of the local normalizing constant.
        z: f64,
        accepted: u64,
    },
    /// The guard rejected the batch as too noisy.
    Insufficient { accepted: u64 },
    /// The guard passed but the empirical covariance was not
    /// positive-definite. Recoverable, equivalent to `Insufficient`.
    Degenerate { accepted: u64 },
}

/// Fold the accepted trials into empirical moments, guarded against
/// degenerate batches. The fold runs in trial order, so the result is
/// deterministic for a given trial vector.
pub fn match_moments<F: GaussianFamily>(
    family: &F,
    trials: &[Trial],
    guard: &GuardPolicy,
) -> UpdateOutcome<F> {
    let mut acc = family.new_accumulator();
    for trial in trials.iter().filter(|trial| trial.accepted) {
        family.accumulate(&mut acc, &trial.theta);
    }
    let accepted = acc.count;
    let total = trials.len() as u64;
    if !guard.admits(accepted, total) {
        return UpdateOutcome::Insufficient { accepted };
    }
    match family.empirical_moments(&acc) {
        Ok(moments) => UpdateOutcome::Updated {
            moments,
            z: accepted as f64 / total as f64,
            accepted,
        },
        Err(_) => UpdateOutcome::Degenerate { accepted },
    }
}
