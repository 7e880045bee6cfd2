//! The Gaussian approximating family.
//!
//! EP-ABC keeps every distribution in play (prior, global approximation,
//! cavity, sites) inside one Gaussian family, either univariate or
//! multivariate. The two cases share all control flow and differ only in
//! their algebra, so the algebra is a capability trait and the engine is
//! generic over it.

use std::fmt::Debug;

use rand::Rng;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FamilyError {
    /// A covariance (or precision) matrix required in moment form is not
    /// symmetric positive-definite.
    #[error("matrix is not positive definite")]
    NotPositiveDefinite,
    /// A parameter matrix is singular to machine precision.
    #[error("matrix is singular to machine precision")]
    NonInvertible,
}

/// Natural parameters (r, Q) of a Gaussian factor.
///
/// Related to moment form by Q = -0.5 * Σ⁻¹ and r = Σ⁻¹ * μ. Unlike moment
/// parameters these are closed under addition and subtraction, which is what
/// makes the site bookkeeping additive.
#[derive(Debug, Clone)]
pub struct Natural<F: GaussianFamily> {
    pub r: F::Loc,
    pub q: F::Scale,
}

/// Moment parameters (μ, Σ) of a Gaussian. For the scalar family the scale
/// component is the variance.
#[derive(Debug, Clone)]
pub struct Moments<F: GaussianFamily> {
    pub mean: F::Loc,
    pub cov: F::Scale,
}

/// Running sufficient statistics of accepted parameter draws: the accepted
/// count, Σθ and Σθθᵗ.
#[derive(Debug, Clone)]
pub struct MomentAccumulator<F: GaussianFamily> {
    pub count: u64,
    pub sum: F::Loc,
    pub outer: F::Scale,
}

/// Algebra of one Gaussian representation.
///
/// Implementations carry the dimension and provide the operations the engine
/// needs: the additive group on natural parameters, both parameter
/// conversions, a Cholesky factorization for sampling and definiteness
/// checks, and outer-product moment accumulation. [`crate::ScalarGaussian`]
/// and [`crate::DenseGaussian`] must satisfy identical contracts.
pub trait GaussianFamily: Sized + Clone + Send + Sync + 'static {
    type Loc: Clone + Debug + Send + Sync + 'static;
    type Scale: Clone + Debug + Send + Sync + 'static;

    fn dim(&self) -> usize;

    /// The additive identity, used to initialize every site.
    fn zero(&self) -> Natural<Self>;

    fn add(&self, a: &Natural<Self>, b: &Natural<Self>) -> Natural<Self>;
    fn sub(&self, a: &Natural<Self>, b: &Natural<Self>) -> Natural<Self>;

    /// Convert moment parameters to natural parameters.
    ///
    /// Fails with [`FamilyError::NonInvertible`] when Σ is singular to
    /// machine precision and [`FamilyError::NotPositiveDefinite`] when it is
    /// not positive-definite.
    fn to_natural(&self, moments: &Moments<Self>) -> Result<Natural<Self>, FamilyError>;

    /// Convert natural parameters to moment parameters.
    ///
    /// The returned covariance is explicitly symmetrized and checked for
    /// positive-definiteness here, not left for a later sampling failure.
    fn to_moments(&self, natural: &Natural<Self>) -> Result<Moments<Self>, FamilyError>;

    /// Lower Cholesky factor of a covariance (the standard deviation in the
    /// scalar case).
    fn chol(&self, cov: &Self::Scale) -> Result<Self::Scale, FamilyError>;

    /// Draw θ ~ N(mean, L·Lᵗ) into `out`, where `chol` is the factor
    /// returned by [`GaussianFamily::chol`].
    fn draw_into<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        mean: &Self::Loc,
        chol: &Self::Scale,
        out: &mut [f64],
    );

    fn new_accumulator(&self) -> MomentAccumulator<Self>;

    /// Fold one accepted draw into the sufficient statistics.
    fn accumulate(&self, acc: &mut MomentAccumulator<Self>, theta: &[f64]);

    /// Empirical moments μ̂ = Σθ/n, Σ̂ = Σθθᵗ/n - μ̂μ̂ᵗ of the accumulated
    /// draws. Fails when Σ̂ is not positive-definite, which includes the
    /// zero-variance case of identical draws.
    fn empirical_moments(&self, acc: &MomentAccumulator<Self>) -> Result<Moments<Self>, FamilyError>;

    fn write_loc(&self, loc: &Self::Loc, out: &mut [f64]);

    fn loc_to_vec(&self, loc: &Self::Loc) -> Vec<f64> {
        let mut out = vec![0f64; self.dim()];
        self.write_loc(loc, &mut out);
        out
    }

    fn moments_dims_ok(&self, moments: &Moments<Self>) -> bool;
}

/// The leave-one-out distribution: the global approximation with one site's
/// contribution removed. Pure; neither argument is touched.
pub fn cavity<F: GaussianFamily>(
    family: &F,
    global: &Natural<F>,
    site: &Natural<F>,
) -> Natural<F> {
    family.sub(global, site)
}
