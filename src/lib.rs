//! Likelihood-free Bayesian inference with Gaussian expectation propagation.
//!
//! EP-ABC approximates the posterior of a simulator's parameters θ by a
//! Gaussian. Each data point's intractable likelihood contribution is
//! replaced by a moment-matched Gaussian site factor, estimated from
//! simulations accepted against that data point. The engine sweeps the
//! dataset in order, refining one site per iteration; callers decide how
//! many passes to run.
//!
//! Users supply a [`Simulator`], an [`Acceptance`] oracle (a boolean
//! predicate or a distance with tolerance), a prior in moment form and the
//! observed data, then drive [`EpAbc::run_pass`] and read the trace.

pub(crate) mod accept;
pub(crate) mod dense;
pub(crate) mod engine;
pub(crate) mod events;
pub(crate) mod family;
pub(crate) mod model;
pub(crate) mod moment_match;
pub(crate) mod sampler;
pub(crate) mod scalar;
pub(crate) mod settings;

pub use accept::{Acceptance, Predicate, WithinTolerance};
pub use dense::DenseGaussian;
pub use engine::{EpAbc, EpError, TraceEntry};
pub use events::{DiagnosticSink, EpEvent};
pub use family::{cavity, FamilyError, GaussianFamily, MomentAccumulator, Moments, Natural};
pub use model::Simulator;
pub use moment_match::{match_moments, UpdateOutcome};
pub use sampler::{simulate_trials, Trial};
pub use scalar::ScalarGaussian;
pub use settings::{EpSettings, GuardPolicy, SettingsError};
