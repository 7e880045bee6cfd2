//! The EP-ABC engine.
//!
//! Owns the global natural-parameter state and the site store, and applies
//! the per-iteration state machine: compute the cavity, sample and simulate,
//! moment-match, then either commit the update or skip it, and emit one
//! trace entry. Numerical degeneracies never abort a pass; they degrade the
//! iteration to a skip and surface through the diagnostic sink.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use crate::{
    accept::Acceptance,
    events::{DiagnosticSink, EpEvent},
    family::{cavity, GaussianFamily, Moments, Natural},
    model::Simulator,
    moment_match::{match_moments, UpdateOutcome},
    sampler::simulate_trials,
    settings::{EpSettings, SettingsError},
};

/// Immutable per-iteration snapshot of the global approximation.
#[derive(Debug, Clone)]
pub struct TraceEntry<F: GaussianFamily> {
    pub mean: F::Loc,
    pub cov: F::Scale,
    /// Accepted-fraction estimate of the local normalizing constant of the
    /// most recent committed update.
    pub z: f64,
}

#[derive(Error, Debug)]
pub enum EpError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("data index {index} out of range for {len} observations")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("simulator failed")]
    Simulation(#[source] anyhow::Error),
}

/// Expectation-propagation ABC over a Gaussian approximating family.
///
/// The engine is built from a prior in moment form, an ordered dataset, a
/// simulator and an acceptance oracle; it is the single writer of the global
/// approximation and the site store, and maintains
/// `global == prior + Σ sites` across every commit.
pub struct EpAbc<F, S, A>
where
    F: GaussianFamily,
    S: Simulator,
    A: Acceptance<S::Observation>,
{
    family: F,
    simulator: S,
    acceptance: A,
    data: Vec<S::Observation>,
    settings: EpSettings,
    prior: Natural<F>,
    global: Natural<F>,
    /// Moment-form mirror of `global`, kept in lockstep by every commit.
    moments: Moments<F>,
    sites: Vec<Natural<F>>,
    z: f64,
    rng: ChaCha8Rng,
    sink: Box<dyn DiagnosticSink>,
}

impl<F, S, A> EpAbc<F, S, A>
where
    F: GaussianFamily,
    S: Simulator,
    A: Acceptance<S::Observation>,
{
    pub fn new(
        family: F,
        simulator: S,
        acceptance: A,
        data: Vec<S::Observation>,
        prior: Moments<F>,
        settings: EpSettings,
    ) -> Result<Self, SettingsError> {
        settings.validate()?;
        if !family.moments_dims_ok(&prior) {
            return Err(SettingsError::PriorDimension(family.dim()));
        }
        if simulator.dim() != family.dim() {
            return Err(SettingsError::SimulatorDimension {
                simulator: simulator.dim(),
                family: family.dim(),
            });
        }
        let prior_natural = family
            .to_natural(&prior)
            .map_err(SettingsError::DegeneratePrior)?;
        let sites = data.iter().map(|_| family.zero()).collect();
        let rng = ChaCha8Rng::seed_from_u64(settings.seed);
        Ok(Self {
            global: prior_natural.clone(),
            prior: prior_natural,
            moments: prior,
            sites,
            family,
            simulator,
            acceptance,
            data,
            settings,
            z: 1f64,
            rng,
            sink: Box::new(|_: EpEvent| {}),
        })
    }

    /// Attach a diagnostic sink. Events are the only way to tell a skipped
    /// iteration apart from the trace.
    pub fn with_diagnostics(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Process the data point at `index` and return its trace entry.
    pub fn run_iteration(&mut self, index: usize) -> Result<TraceEntry<F>, EpError> {
        if index >= self.data.len() {
            return Err(EpError::IndexOutOfRange {
                index,
                len: self.data.len(),
            });
        }
        self.iterate(index)
    }

    /// One full pass: every data point once, strictly in dataset order.
    pub fn run_pass(&mut self) -> Result<Vec<TraceEntry<F>>, EpError> {
        let mut trace = Vec::with_capacity(self.data.len());
        for index in 0..self.data.len() {
            trace.push(self.iterate(index)?);
        }
        Ok(trace)
    }

    /// Repeated sweeps; the traces concatenate. The engine never decides
    /// convergence, callers bound the number of passes.
    pub fn run_passes(&mut self, passes: usize) -> Result<Vec<TraceEntry<F>>, EpError> {
        let mut trace = Vec::with_capacity(passes * self.data.len());
        for _ in 0..passes {
            trace.extend(self.run_pass()?);
        }
        Ok(trace)
    }

    fn iterate(&mut self, index: usize) -> Result<TraceEntry<F>, EpError> {
        let iteration_seed: u64 = self.rng.random();

        let cavity_natural = cavity(&self.family, &self.global, &self.sites[index]);
        let Ok(cavity_moments) = self.family.to_moments(&cavity_natural) else {
            self.sink.record(EpEvent::DegenerateCavity { index });
            return Ok(self.snapshot());
        };
        let Ok(chol) = self.family.chol(&cavity_moments.cov) else {
            self.sink.record(EpEvent::DegenerateCavity { index });
            return Ok(self.snapshot());
        };

        self.simulator.specialize(&self.data[index]);
        let trials = simulate_trials(
            &self.family,
            &cavity_moments,
            &chol,
            &self.simulator,
            &self.acceptance,
            &self.data[index],
            self.settings.num_simulations,
            iteration_seed,
        )
        .map_err(EpError::Simulation)?;

        let total = trials.len() as u64;
        match match_moments(&self.family, &trials, &self.settings.guard) {
            UpdateOutcome::Updated {
                moments,
                z,
                accepted,
            } => match self.family.to_natural(&moments) {
                Ok(global) => {
                    // Commit the full transition at once so the additive
                    // invariant never observes a half-applied update.
                    let site = self.family.sub(&global, &cavity_natural);
                    self.global = global;
                    self.sites[index] = site;
                    self.moments = moments;
                    self.z = z;
                    self.sink.record(EpEvent::SiteUpdated {
                        index,
                        accepted,
                        total,
                    });
                }
                Err(_) => {
                    self.sink
                        .record(EpEvent::DegenerateMoments { index, accepted });
                }
            },
            UpdateOutcome::Insufficient { accepted } => {
                self.sink.record(EpEvent::InsufficientAcceptance {
                    index,
                    accepted,
                    total,
                });
            }
            UpdateOutcome::Degenerate { accepted } => {
                self.sink
                    .record(EpEvent::DegenerateMoments { index, accepted });
            }
        }

        Ok(self.snapshot())
    }

    fn snapshot(&self) -> TraceEntry<F> {
        TraceEntry {
            mean: self.moments.mean.clone(),
            cov: self.moments.cov.clone(),
            z: self.z,
        }
    }

    pub fn family(&self) -> &F {
        &self.family
    }

    pub fn dim(&self) -> usize {
        self.family.dim()
    }

    pub fn data(&self) -> &[S::Observation] {
        &self.data
    }

    pub fn prior(&self) -> &Natural<F> {
        &self.prior
    }

    /// Current natural parameters of the global approximation.
    pub fn global(&self) -> &Natural<F> {
        &self.global
    }

    /// Current moment parameters of the global approximation.
    pub fn global_moments(&self) -> &Moments<F> {
        &self.moments
    }

    /// Natural-parameter contribution attributed to data point `index`.
    pub fn site(&self, index: usize) -> Option<&Natural<F>> {
        self.sites.get(index)
    }

    pub fn sites(&self) -> &[Natural<F>] {
        &self.sites
    }

    pub fn z(&self) -> f64 {
        self.z
    }
}
