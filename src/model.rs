//! The external simulator capability.
//!
//! EP-ABC never evaluates a likelihood. The only thing it asks of the model
//! is to produce one synthetic observation for a given parameter vector.

use anyhow::Result;
use rand::Rng;

/// A stochastic simulator parameterized by θ.
///
/// Implementations must be thread-safe: the engine runs the Monte-Carlo
/// trials of one site update in parallel, each with its own RNG.
pub trait Simulator: Send + Sync {
    type Observation: Clone + Send + Sync + 'static;

    /// The length of the parameter vector θ. Checked against the Gaussian
    /// family's dimension when the engine is built.
    fn dim(&self) -> usize;

    /// Prepare for simulating against one data point.
    ///
    /// Called once per iteration, before the trials, so simulators that need
    /// per-observation context (a fixed tree topology, say) can cache it
    /// here. The default does nothing.
    fn specialize(&mut self, _data_point: &Self::Observation) {}

    /// Produce one synthetic observation at θ.
    ///
    /// An error is treated as unrecoverable: the whole iteration is
    /// abandoned and the error propagates out of the pass.
    fn simulate<R: Rng + ?Sized>(&self, theta: &[f64], rng: &mut R) -> Result<Self::Observation>;
}
