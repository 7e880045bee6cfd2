//! Multivariate Gaussian family backed by faer.

use faer::{Col, Mat};
use itertools::izip;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::family::{FamilyError, GaussianFamily, MomentAccumulator, Moments, Natural};

/// d-dimensional Gaussian representation. Locations are `Col<f64>`, scales
/// are symmetric d×d `Mat<f64>`.
#[derive(Debug, Clone, Copy)]
pub struct DenseGaussian {
    dim: usize,
}

impl DenseGaussian {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

/// Lower Cholesky factor of a symmetric positive-definite matrix.
///
/// A non-positive pivot means the input is not positive-definite; a pivot
/// that is positive but below machine precision relative to the diagonal
/// means the input is singular.
fn cholesky_lower(matrix: &Mat<f64>) -> Result<Mat<f64>, FamilyError> {
    let dim = matrix.ncols();
    let scale = (0..dim)
        .map(|i| matrix[(i, i)].abs())
        .fold(f64::MIN_POSITIVE, f64::max);
    let mut lower = Mat::<f64>::zeros(dim, dim);
    for row in 0..dim {
        for col in 0..=row {
            let mut sum = matrix[(row, col)];
            for k in 0..col {
                sum -= lower[(row, k)] * lower[(col, k)];
            }
            if row == col {
                if !sum.is_finite() {
                    return Err(FamilyError::NonInvertible);
                }
                if sum < 0f64 {
                    return Err(FamilyError::NotPositiveDefinite);
                }
                if sum <= scale * f64::EPSILON {
                    return Err(FamilyError::NonInvertible);
                }
                lower[(row, col)] = sum.sqrt();
            } else {
                lower[(row, col)] = sum / lower[(col, col)];
            }
        }
    }
    Ok(lower)
}

/// Solve L y = b and then Lᵗ x = y.
fn spd_solve(lower: &Mat<f64>, b: &Col<f64>) -> Col<f64> {
    let dim = lower.ncols();
    let mut y = Col::<f64>::zeros(dim);
    for i in 0..dim {
        let mut sum = b[i];
        for k in 0..i {
            sum -= lower[(i, k)] * y[k];
        }
        y[i] = sum / lower[(i, i)];
    }
    let mut x = Col::<f64>::zeros(dim);
    for i in (0..dim).rev() {
        let mut sum = y[i];
        for k in (i + 1)..dim {
            sum -= lower[(k, i)] * x[k];
        }
        x[i] = sum / lower[(i, i)];
    }
    x
}

/// Inverse of the matrix whose lower Cholesky factor is `lower`, column by
/// column through [`spd_solve`].
fn spd_inverse(lower: &Mat<f64>) -> Mat<f64> {
    let dim = lower.ncols();
    let mut inverse = Mat::<f64>::zeros(dim, dim);
    for col in 0..dim {
        let unit = Col::from_fn(dim, |i| if i == col { 1f64 } else { 0f64 });
        let solved = spd_solve(lower, &unit);
        for row in 0..dim {
            inverse[(row, col)] = solved[row];
        }
    }
    inverse
}

/// Absorb floating-point asymmetry left by the solves.
fn symmetrize(matrix: &Mat<f64>) -> Mat<f64> {
    let dim = matrix.ncols();
    Mat::from_fn(dim, dim, |i, j| 0.5 * (matrix[(i, j)] + matrix[(j, i)]))
}

fn all_finite(matrix: &Mat<f64>) -> bool {
    let mut ok = true;
    faer::zip!(matrix.as_ref()).for_each(|faer::unzip!(val)| ok &= val.is_finite());
    ok
}

impl GaussianFamily for DenseGaussian {
    type Loc = Col<f64>;
    type Scale = Mat<f64>;

    fn dim(&self) -> usize {
        self.dim
    }

    fn zero(&self) -> Natural<Self> {
        Natural {
            r: Col::zeros(self.dim),
            q: Mat::zeros(self.dim, self.dim),
        }
    }

    fn add(&self, a: &Natural<Self>, b: &Natural<Self>) -> Natural<Self> {
        Natural {
            r: &a.r + &b.r,
            q: &a.q + &b.q,
        }
    }

    fn sub(&self, a: &Natural<Self>, b: &Natural<Self>) -> Natural<Self> {
        Natural {
            r: &a.r - &b.r,
            q: &a.q - &b.q,
        }
    }

    fn to_natural(&self, moments: &Moments<Self>) -> Result<Natural<Self>, FamilyError> {
        let lower = cholesky_lower(&moments.cov)?;
        let precision = symmetrize(&spd_inverse(&lower));
        if !all_finite(&precision) {
            return Err(FamilyError::NonInvertible);
        }
        let r = &precision * &moments.mean;
        let q = Mat::from_fn(self.dim, self.dim, |i, j| -0.5 * precision[(i, j)]);
        Ok(Natural { r, q })
    }

    fn to_moments(&self, natural: &Natural<Self>) -> Result<Moments<Self>, FamilyError> {
        // Σ⁻¹ = -2 Q, so a proper moment form needs -2Q positive-definite.
        let precision = Mat::from_fn(self.dim, self.dim, |i, j| -2f64 * natural.q[(i, j)]);
        let lower = cholesky_lower(&precision)?;
        let cov = symmetrize(&spd_inverse(&lower));
        if !all_finite(&cov) {
            return Err(FamilyError::NonInvertible);
        }
        let mean = spd_solve(&lower, &natural.r);
        Ok(Moments { mean, cov })
    }

    fn chol(&self, cov: &Self::Scale) -> Result<Self::Scale, FamilyError> {
        cholesky_lower(cov)
    }

    fn draw_into<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        mean: &Self::Loc,
        chol: &Self::Scale,
        out: &mut [f64],
    ) {
        let noise: Vec<f64> = (0..self.dim).map(|_| rng.sample(StandardNormal)).collect();
        for (i, slot) in out.iter_mut().enumerate() {
            let mut value = mean[i];
            for (j, &z) in noise.iter().enumerate().take(i + 1) {
                value += chol[(i, j)] * z;
            }
            *slot = value;
        }
    }

    fn new_accumulator(&self) -> MomentAccumulator<Self> {
        MomentAccumulator {
            count: 0,
            sum: Col::zeros(self.dim),
            outer: Mat::zeros(self.dim, self.dim),
        }
    }

    fn accumulate(&self, acc: &mut MomentAccumulator<Self>, theta: &[f64]) {
        acc.count += 1;
        for (i, &ti) in theta.iter().enumerate() {
            acc.sum[i] += ti;
            for (j, &tj) in theta.iter().enumerate() {
                acc.outer[(i, j)] += ti * tj;
            }
        }
    }

    fn empirical_moments(
        &self,
        acc: &MomentAccumulator<Self>,
    ) -> Result<Moments<Self>, FamilyError> {
        let n = acc.count as f64;
        let mean = Col::from_fn(self.dim, |i| acc.sum[i] / n);
        let cov = Mat::from_fn(self.dim, self.dim, |i, j| {
            acc.outer[(i, j)] / n - mean[i] * mean[j]
        });
        if !all_finite(&cov) {
            return Err(FamilyError::NonInvertible);
        }
        // Definiteness check up front; the factor itself is recomputed from
        // the cavity of the next iteration that needs it.
        cholesky_lower(&cov)?;
        Ok(Moments { mean, cov })
    }

    fn write_loc(&self, loc: &Self::Loc, out: &mut [f64]) {
        izip!(out.iter_mut(), loc.iter()).for_each(|(slot, &value)| *slot = value);
    }

    fn moments_dims_ok(&self, moments: &Moments<Self>) -> bool {
        moments.mean.nrows() == self.dim
            && moments.cov.nrows() == self.dim
            && moments.cov.ncols() == self.dim
    }
}
