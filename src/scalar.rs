//! Univariate Gaussian family.

use rand::Rng;
use rand_distr::StandardNormal;

use crate::family::{FamilyError, GaussianFamily, MomentAccumulator, Moments, Natural};

/// One-dimensional Gaussian representation. Locations are plain `f64`s and
/// the scale component is the variance.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarGaussian;

fn check_variance(v: f64) -> Result<(), FamilyError> {
    if !v.is_finite() || v == 0f64 {
        Err(FamilyError::NonInvertible)
    } else if v < 0f64 {
        Err(FamilyError::NotPositiveDefinite)
    } else {
        Ok(())
    }
}

impl GaussianFamily for ScalarGaussian {
    type Loc = f64;
    type Scale = f64;

    fn dim(&self) -> usize {
        1
    }

    fn zero(&self) -> Natural<Self> {
        Natural { r: 0f64, q: 0f64 }
    }

    fn add(&self, a: &Natural<Self>, b: &Natural<Self>) -> Natural<Self> {
        Natural {
            r: a.r + b.r,
            q: a.q + b.q,
        }
    }

    fn sub(&self, a: &Natural<Self>, b: &Natural<Self>) -> Natural<Self> {
        Natural {
            r: a.r - b.r,
            q: a.q - b.q,
        }
    }

    fn to_natural(&self, moments: &Moments<Self>) -> Result<Natural<Self>, FamilyError> {
        check_variance(moments.cov)?;
        Ok(Natural {
            r: moments.mean / moments.cov,
            q: -0.5 / moments.cov,
        })
    }

    fn to_moments(&self, natural: &Natural<Self>) -> Result<Moments<Self>, FamilyError> {
        // The precision is -2q; it must be strictly positive for a proper
        // moment form.
        let precision = -2f64 * natural.q;
        check_variance(precision)?;
        let cov = precision.recip();
        Ok(Moments {
            mean: natural.r * cov,
            cov,
        })
    }

    fn chol(&self, cov: &Self::Scale) -> Result<Self::Scale, FamilyError> {
        check_variance(*cov)?;
        Ok(cov.sqrt())
    }

    fn draw_into<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        mean: &Self::Loc,
        chol: &Self::Scale,
        out: &mut [f64],
    ) {
        let norm: f64 = rng.sample(StandardNormal);
        out[0] = mean + chol * norm;
    }

    fn new_accumulator(&self) -> MomentAccumulator<Self> {
        MomentAccumulator {
            count: 0,
            sum: 0f64,
            outer: 0f64,
        }
    }

    fn accumulate(&self, acc: &mut MomentAccumulator<Self>, theta: &[f64]) {
        acc.count += 1;
        acc.sum += theta[0];
        acc.outer += theta[0] * theta[0];
    }

    fn empirical_moments(
        &self,
        acc: &MomentAccumulator<Self>,
    ) -> Result<Moments<Self>, FamilyError> {
        let n = acc.count as f64;
        let mean = acc.sum / n;
        let cov = acc.outer / n - mean * mean;
        if !(cov.is_finite() && cov > 0f64) {
            return Err(FamilyError::NotPositiveDefinite);
        }
        Ok(Moments { mean, cov })
    }

    fn write_loc(&self, loc: &Self::Loc, out: &mut [f64]) {
        out[0] = *loc;
    }

    fn moments_dims_ok(&self, _moments: &Moments<Self>) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    use super::*;
    use crate::family::cavity;

    #[test]
    fn transforms_match_contracts() {
        let family = ScalarGaussian;
        let moments = Moments {
            mean: 1.5,
            cov: 0.25,
        };
        let natural = family.to_natural(&moments).unwrap();
        assert_abs_diff_eq!(natural.q, -2.0);
        assert_abs_diff_eq!(natural.r, 6.0);

        let back = family.to_moments(&natural).unwrap();
        assert_abs_diff_eq!(back.mean, 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(back.cov, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_variances_are_rejected() {
        let family = ScalarGaussian;
        let singular = Moments {
            mean: 0.0,
            cov: 0.0,
        };
        assert_eq!(
            family.to_natural(&singular).unwrap_err(),
            FamilyError::NonInvertible
        );
        let negative = Moments {
            mean: 0.0,
            cov: -1.0,
        };
        assert_eq!(
            family.to_natural(&negative).unwrap_err(),
            FamilyError::NotPositiveDefinite
        );
        // A natural form with q >= 0 has no moment form.
        let improper = Natural { r: 1.0, q: 0.5 };
        assert_eq!(
            family.to_moments(&improper).unwrap_err(),
            FamilyError::NotPositiveDefinite
        );
    }

    #[test]
    fn cavity_subtracts_site() {
        let family = ScalarGaussian;
        let global = Natural { r: 3.0, q: -2.0 };
        let site = Natural { r: 0.5, q: -0.25 };
        let cav = cavity(&family, &global, &site);
        assert_abs_diff_eq!(cav.r, 2.5);
        assert_abs_diff_eq!(cav.q, -1.75);
        // Pure: adding the site back recovers the global.
        let restored = family.add(&cav, &site);
        assert_abs_diff_eq!(restored.r, global.r);
        assert_abs_diff_eq!(restored.q, global.q);
    }

    #[test]
    fn empirical_moments_of_known_draws() {
        let family = ScalarGaussian;
        let mut acc = family.new_accumulator();
        for theta in [1.0, 2.0, 3.0] {
            family.accumulate(&mut acc, &[theta]);
        }
        assert_eq!(acc.count, 3);
        let moments = family.empirical_moments(&acc).unwrap();
        assert_abs_diff_eq!(moments.mean, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(moments.cov, 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn identical_draws_have_no_moments() {
        let family = ScalarGaussian;
        let mut acc = family.new_accumulator();
        family.accumulate(&mut acc, &[1.25]);
        family.accumulate(&mut acc, &[1.25]);
        assert!(family.empirical_moments(&acc).is_err());
    }

    proptest! {
        #[test]
        fn round_trip(mean in -50f64..50f64, cov in 1e-6f64..1e4f64) {
            let family = ScalarGaussian;
            let moments = Moments { mean, cov };
            let back = family
                .to_moments(&family.to_natural(&moments).unwrap())
                .unwrap();
            prop_assert!((back.mean - mean).abs() <= 1e-8 * (1.0 + mean.abs()));
            prop_assert!((back.cov - cov).abs() <= 1e-8 * cov);
        }
    }
}
