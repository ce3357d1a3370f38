/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Truncated-mixture energy and its analytic derivative.
//!
//! Each component's raw Gaussian `raw = amp·exp(−½·rv²)` is used unchanged
//! inside its transition window `mean ± onset·scale`. Outside the window it
//! is blended towards its floor with a tanh sigmoid:
//!
//! ```text
//! below:  t = tanh(slope·(x + onset − mean)),  s = ½(1 + t)
//!         blend = (1 − s)·gmin + s·raw
//! above:  t = tanh(slope·(x − onset − mean)),  s = ½(1 + t)
//!         blend = (1 − s)·raw + s·gmin
//! inside: blend = raw
//!
//! E  = −RT·ln Σ blend
//! E' = RT·Σ term / Σ blend
//! ```
//!
//! The branch a component sits on is decided once, by [`Blend::new`], and both
//! the value and the derivative term are read from that same [`Blend`].

use crate::calibrate::Calibration;
use crate::error::{FormError, FormResult};
use crate::feature::{FeatureDelta, FeatureKind};
use crate::params::MixtureParameters;

/// Energy of one feature value, with the derivative when it was requested.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Energy {
    /// `−RT·ln(total blended density)`.
    pub value: f32,
    /// `dE/dx`, present only if requested.
    pub derivative: Option<f32>,
}

/// Which part of the piecewise blend a component is evaluated on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Branch {
    /// Feature below `mean − onset·scale`.
    Below,
    /// Feature inside the transition window; raw Gaussian.
    Inside,
    /// Feature above `mean + onset·scale`.
    Above,
}

/// One component's contribution at one feature value.
#[derive(Clone, Copy, Debug)]
pub struct Blend {
    /// Branch the component was evaluated on.
    pub branch: Branch,
    /// Normalised signed deviation `delta / σ`.
    pub rv: f32,
    /// Raw Gaussian value.
    pub raw: f32,
    tanh: f32,
    floor: f32,
    stdev: f32,
    slope: f32,
}

impl Blend {
    /// Classify component `k` at `x` and capture everything its value and
    /// derivative need.
    pub fn new(
        params: &MixtureParameters,
        calibration: &Calibration,
        k: usize,
        x: f32,
        rv: f32,
    ) -> Self {
        let mean = params.means()[k];
        let onset = calibration.onset(k);
        let half_width = onset * params.transition_distance_scale;
        let slope = params.transition_slope;

        let (branch, tanh) = if x < mean - half_width {
            (Branch::Below, libm::tanhf(slope * x + slope * (onset - mean)))
        } else if x > mean + half_width {
            (Branch::Above, libm::tanhf(slope * x - slope * (onset + mean)))
        } else {
            (Branch::Inside, 0.0)
        };

        Self {
            branch,
            rv,
            raw: calibration.amplitude(k) * libm::expf(-(0.5 * rv * rv)),
            tanh,
            floor: calibration.floor(k),
            stdev: params.stdevs()[k],
            slope,
        }
    }

    /// Blended density.
    pub fn value(&self) -> f32 {
        let s = 0.5 * (1.0 + self.tanh);
        match self.branch {
            Branch::Below => (1.0 - s) * self.floor + s * self.raw,
            Branch::Above => (1.0 - s) * self.raw + s * self.floor,
            Branch::Inside => self.raw,
        }
    }

    /// `−d(value)/dx`, the component's share of the energy derivative
    /// numerator.
    pub fn derivative_term(&self) -> f32 {
        let s = 0.5 * (1.0 + self.tanh);
        let sigmoid = 0.5 * (1.0 - self.tanh * self.tanh) * self.slope;
        let gauss = self.raw * self.rv / self.stdev;
        match self.branch {
            Branch::Below => sigmoid * (self.floor - self.raw) + s * gauss,
            Branch::Above => sigmoid * (self.raw - self.floor) + (1.0 - s) * gauss,
            Branch::Inside => gauss,
        }
    }
}

/// Evaluates energies against one calibrated parameter set.
#[derive(Clone, Copy, Debug)]
pub struct EnergyEvaluator<'a> {
    params: &'a MixtureParameters,
    calibration: &'a Calibration,
    rt: f32,
}

impl<'a> EnergyEvaluator<'a> {
    /// Bind parameters and their calibration.
    pub fn new(params: &'a MixtureParameters, calibration: &'a Calibration, rt: f32) -> Self {
        Self {
            params,
            calibration,
            rt,
        }
    }

    /// Blend of component `k` at `feature`.
    ///
    /// # Panics
    ///
    /// If `k` is not below [`MixtureParameters::modal`].
    pub fn blend<D: FeatureDelta>(
        &self,
        k: usize,
        feature: f32,
        kind: FeatureKind,
        delta: &D,
    ) -> FormResult<Blend> {
        self.check_coverage()?;
        self.component(k, feature, kind, delta)
    }

    /// Energy at `feature`, and `dE/dx` if `want_derivative`.
    pub fn evaluate<D: FeatureDelta>(
        &self,
        feature: f32,
        kind: FeatureKind,
        delta: &D,
        want_derivative: bool,
    ) -> FormResult<Energy> {
        self.check_coverage()?;
        let mut total = 0.0f32;
        let mut numerator = 0.0f32;
        for k in 0..self.params.modal() {
            let blend = self.component(k, feature, kind, delta)?;
            total += blend.value();
            if want_derivative {
                numerator += blend.derivative_term();
            }
        }
        finish(self.rt, feature, total, want_derivative.then_some(numerator))
    }

    fn component<D: FeatureDelta>(
        &self,
        k: usize,
        feature: f32,
        kind: FeatureKind,
        delta: &D,
    ) -> FormResult<Blend> {
        let rv = delta.delta(feature, self.params.means()[k], kind)? / self.params.stdevs()[k];
        Ok(Blend::new(self.params, self.calibration, k, feature, rv))
    }

    fn check_coverage(&self) -> FormResult<()> {
        let (expected, got) = (self.params.modal(), self.calibration.len());
        if expected != got {
            return Err(FormError::CalibrationMismatch { expected, got });
        }
        Ok(())
    }
}

/// Turn the summed density and derivative numerator into an [`Energy`].
fn finish(rt: f32, feature: f32, total: f32, numerator: Option<f32>) -> FormResult<Energy> {
    if !total.is_finite() || total <= 0.0 {
        log::warn!("mixture density {total:e} at feature {feature}, energy undefined");
        return Err(FormError::NonPositiveDensity(total));
    }

    let value = -(rt * libm::logf(total));
    if !value.is_finite() {
        return Err(FormError::NonPositiveDensity(total));
    }
    let derivative = numerator.map(|n| rt * n / total);
    if let Some(d) = derivative.filter(|d| !d.is_finite()) {
        log::warn!("energy derivative {d} at feature {feature} with density {total:e}");
        return Err(FormError::NonFiniteDerivative { feature, derivative: d });
    }
    Ok(Energy { value, derivative })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibrate::TruncationCalibrator;
    use crate::config::{FormConfig, RT};
    use crate::feature::StandardDelta;

    fn single(scale: f32) -> (MixtureParameters, Calibration) {
        let p = MixtureParameters::new(2.0, 1.0, scale, &[1.0], &[5.0], &[1.0]).unwrap();
        let c = TruncationCalibrator::new(&FormConfig::default()).calibrate(&p).unwrap();
        (p, c)
    }

    fn energy(p: &MixtureParameters, c: &Calibration, x: f32, deriv: bool) -> Energy {
        EnergyEvaluator::new(p, c, RT)
            .evaluate(x, FeatureKind::Distance, &StandardDelta, deriv)
            .unwrap()
    }

    #[test]
    fn minimum_at_mean_with_zero_derivative() {
        let (p, c) = single(3.0);
        let e = energy(&p, &c, 5.0, true);
        let expected = -RT * libm::logf(p.amplitude(0));
        assert!((e.value - expected).abs() < 1e-5);
        assert!(e.derivative.unwrap().abs() < 1e-6);
        assert!(energy(&p, &c, 4.5, false).value > e.value);
        assert!(energy(&p, &c, 5.5, false).value > e.value);
    }

    #[test]
    fn derivative_omitted_when_not_requested() {
        let (p, c) = single(3.0);
        assert_eq!(energy(&p, &c, 6.0, false).derivative, None);
    }

    #[test]
    fn branches_follow_window() {
        let (p, c) = single(1.0);
        let ev = EnergyEvaluator::new(&p, &c, RT);
        let onset = c.onset(0);
        let b = |x: f32| ev.blend(0, x, FeatureKind::Distance, &StandardDelta).unwrap().branch;
        assert_eq!(b(5.0), Branch::Inside);
        assert_eq!(b(5.0 - onset - 0.1), Branch::Below);
        assert_eq!(b(5.0 + onset + 0.1), Branch::Above);
    }

    #[test]
    fn inside_window_is_plain_gaussian() {
        let (p, c) = single(3.0);
        for &x in &[3.0f32, 4.2, 5.7, 7.0] {
            let rv = x - 5.0;
            let expected = -RT * libm::logf(p.amplitude(0) * libm::expf(-0.5 * rv * rv));
            let e = energy(&p, &c, x, true);
            assert!((e.value - expected).abs() < 1e-5, "x={x}");
            // dE/dx = RT·rv/σ inside the window
            assert!((e.derivative.unwrap() - RT * rv).abs() < 1e-5, "x={x}");
        }
    }

    #[test]
    fn far_tail_sits_on_floor() {
        let (p, c) = single(3.0);
        let ceiling = -RT * libm::logf(c.floor(0));
        let e = energy(&p, &c, 1000.0, true);
        assert!((e.value - ceiling).abs() < 1e-4);
        assert!(e.derivative.unwrap().abs() < 1e-6);
    }

    #[test]
    fn vanishing_density_is_an_error() {
        let (p, c) = single(3.0);
        let bare = c.with_floor(0.0);
        // Far tail: raw Gaussian underflows and the blend sits on a zero floor.
        let err = EnergyEvaluator::new(&p, &bare, RT)
            .evaluate(1.0e6, FeatureKind::Distance, &StandardDelta, false)
            .unwrap_err();
        assert!(matches!(err, FormError::NonPositiveDensity(_)));
    }

    #[test]
    fn delta_error_aborts_evaluation() {
        let (p, c) = single(3.0);
        let err = EnergyEvaluator::new(&p, &c, RT)
            .evaluate(f32::INFINITY, FeatureKind::Distance, &StandardDelta, true)
            .unwrap_err();
        assert!(matches!(err, FormError::NonFiniteFeature { .. }));
    }

    #[test]
    fn overflowing_derivative_is_not_a_density_error() {
        let err = finish(RT, 2.0, f32::MIN_POSITIVE, Some(1.0e10)).unwrap_err();
        assert!(matches!(err, FormError::NonFiniteDerivative { feature, .. } if feature == 2.0));
        // Same sums without the derivative are fine.
        assert!(finish(RT, 2.0, f32::MIN_POSITIVE, None).is_ok());
    }

    #[test]
    fn calibration_for_other_parameters_is_rejected() {
        let (_, c) = single(3.0);
        let two = MixtureParameters::new(2.0, 1.0, 3.0, &[0.5, 0.5], &[0.0, 10.0], &[1.0, 1.0]).unwrap();
        let ev = EnergyEvaluator::new(&two, &c, RT);
        assert_eq!(
            ev.evaluate(5.0, FeatureKind::Distance, &StandardDelta, true),
            Err(FormError::CalibrationMismatch { expected: 2, got: 1 })
        );
        assert!(ev.blend(0, 5.0, FeatureKind::Distance, &StandardDelta).is_err());
    }

    #[test]
    fn zero_weight_component_contributes_nothing() {
        let p = MixtureParameters::new(2.0, 1.0, 3.0, &[1.0, 0.0], &[5.0, 9.0], &[1.0, 1.0]).unwrap();
        let c = TruncationCalibrator::new(&FormConfig::default()).calibrate(&p).unwrap();
        let ev = EnergyEvaluator::new(&p, &c, RT);
        for &x in &[5.0f32, 9.0, 12.0] {
            let b = ev.blend(1, x, FeatureKind::Distance, &StandardDelta).unwrap();
            assert_eq!(b.value(), 0.0, "x={x}");
            assert_eq!(b.derivative_term(), 0.0, "x={x}");
        }
        let e = energy(&p, &c, 5.0, true);
        assert!((e.value - 0.542_27).abs() < 1e-4, "energy {}", e.value);
    }
}
