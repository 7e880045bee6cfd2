//! Monte-Carlo simulation trials.
//!
//! One site update draws M parameter vectors from the cavity Gaussian, runs
//! the simulator once per draw and records the acceptance verdict. Trials
//! are mutually independent, so they run on the rayon pool; every trial owns
//! a `ChaCha8Rng` seeded with the iteration seed and the trial index as the
//! stream, which makes the output deterministic for a given seed no matter
//! how the work is scheduled.

use anyhow::Result;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::{
    accept::Acceptance,
    family::{GaussianFamily, Moments},
    model::Simulator,
};

/// One simulation trial: the parameter draw and whether the simulated
/// observation was accepted against the real data point.
#[derive(Debug, Clone)]
pub struct Trial {
    pub theta: Box<[f64]>,
    pub accepted: bool,
}

/// Run `num` independent trials against one data point.
///
/// Returns all trials in trial order, accepted or not; filtering is the
/// moment matcher's job. A simulator error aborts the whole batch.
pub fn simulate_trials<F, S, A>(
    family: &F,
    cavity: &Moments<F>,
    chol: &F::Scale,
    simulator: &S,
    acceptance: &A,
    observed: &S::Observation,
    num: usize,
    seed: u64,
) -> Result<Vec<Trial>>
where
    F: GaussianFamily,
    S: Simulator,
    A: Acceptance<S::Observation>,
{
    (0..num)
        .into_par_iter()
        .map(|trial| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            rng.set_stream(trial as u64);
            let mut theta = vec![0f64; family.dim()].into_boxed_slice();
            family.draw_into(&mut rng, &cavity.mean, chol, &mut theta);
            let simulated = simulator.simulate(&theta, &mut rng)?;
            let accepted = acceptance.accept(observed, &simulated);
            Ok(Trial { theta, accepted })
        })
        .collect()
}
