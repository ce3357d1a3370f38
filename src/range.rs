//! Feature range over which a host tabulates the form as a spline.

use crate::params::MixtureParameters;

/// Closed feature interval `[min, max]`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeatureRange {
    /// Lower bound, never negative.
    pub min: f32,
    /// Upper bound.
    pub max: f32,
}

/// Range from `spline_range` standard deviations below the smallest mean to
/// `spline_range` standard deviations above the largest.
///
/// Features are assumed to be non-negative (distances), so `min` is clamped
/// at zero. A NaN `min` also becomes zero.
pub fn estimate_range(params: &MixtureParameters, spline_range: f32) -> FeatureRange {
    let means = params.means();
    let stdevs = params.stdevs();
    let (mut imin, mut imax) = (0, 0);
    for (i, &m) in means.iter().enumerate().skip(1) {
        if m > means[imax] {
            imax = i;
        }
        if m < means[imin] {
            imin = i;
        }
    }

    let min = means[imin] - spline_range * stdevs[imin];
    let max = means[imax] + spline_range * stdevs[imax];
    FeatureRange {
        min: libm::fmaxf(min, 0.0),
        max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_spans_extreme_means() {
        let p = MixtureParameters::new(2.0, 1.0, 3.0, &[1.0, 1.0, 1.0], &[3.0, 8.0, 5.0], &[1.0, 2.0, 0.5])
            .unwrap();
        let r = estimate_range(&p, 1.5);
        assert_eq!(r, FeatureRange { min: 1.5, max: 11.0 });
    }

    #[test]
    fn min_is_clamped_at_zero() {
        let p = MixtureParameters::new(2.0, 1.0, 3.0, &[1.0, 1.0, 1.0], &[3.0, 8.0, 1.0], &[1.0, 2.0, 0.5])
            .unwrap();
        let r = estimate_range(&p, 4.0);
        assert_eq!(r.min, 0.0);
        assert_eq!(r.max, 16.0);
    }

    #[test]
    fn single_component() {
        let p = MixtureParameters::new(2.0, 1.0, 3.0, &[1.0], &[5.0], &[1.0]).unwrap();
        assert_eq!(estimate_range(&p, 2.0), FeatureRange { min: 3.0, max: 7.0 });
    }

    #[test]
    fn nan_min_is_clamped_at_zero() {
        let p = MixtureParameters::new(2.0, 1.0, 3.0, &[1.0], &[5.0], &[1.0]).unwrap();
        let r = estimate_range(&p, f32::NAN);
        assert_eq!(r.min, 0.0);
        assert!(r.max.is_nan());
    }
}
