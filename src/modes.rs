//! Nearest and heaviest component lookups.
//!
//! These feed the host's diagnostic statistics (which reference location a
//! feature is closest to, how far it sits from it) and play no part in the
//! energy itself. Ties go to the lowest index.

use crate::error::FormResult;
use crate::feature::{FeatureDelta, FeatureKind};
use crate::params::MixtureParameters;

/// Component lookups over one parameter set.
#[derive(Clone, Copy, Debug)]
pub struct ModeSelector<'a, D> {
    params: &'a MixtureParameters,
    delta: &'a D,
}

impl<'a, D: FeatureDelta> ModeSelector<'a, D> {
    /// Bind parameters and the deviation primitive.
    pub fn new(params: &'a MixtureParameters, delta: &'a D) -> Self {
        Self { params, delta }
    }

    /// Index of the component whose mean is closest to `feature`.
    pub fn nearest(&self, feature: f32, kind: FeatureKind) -> FormResult<usize> {
        let mut best = 0;
        let mut best_dist = f32::MAX;
        for (k, &mean) in self.params.means().iter().enumerate() {
            let dist = libm::fabsf(self.delta.delta(feature, mean, kind)?);
            if dist < best_dist {
                best_dist = dist;
                best = k;
            }
        }
        Ok(best)
    }

    /// Index of the component with the largest absolute weight.
    pub fn heaviest(&self) -> usize {
        let weights = self.params.weights();
        let mut best = 0;
        for (k, &w) in weights.iter().enumerate().skip(1) {
            if libm::fabsf(w) > libm::fabsf(weights[best]) {
                best = k;
            }
        }
        best
    }

    /// Mean of the nearest component.
    pub fn nearest_mean(&self, feature: f32, kind: FeatureKind) -> FormResult<f32> {
        Ok(self.params.means()[self.nearest(feature, kind)?])
    }

    /// Mean of the heaviest component.
    pub fn heaviest_mean(&self) -> f32 {
        self.params.means()[self.heaviest()]
    }

    /// Signed deviation of `feature` from the nearest mean.
    pub fn nearest_deviation(&self, feature: f32, kind: FeatureKind) -> FormResult<f32> {
        let k = self.nearest(feature, kind)?;
        self.deviation(k, feature, kind)
    }

    /// Signed deviation of `feature` from the heaviest component's mean.
    pub fn heaviest_deviation(&self, feature: f32, kind: FeatureKind) -> FormResult<f32> {
        self.deviation(self.heaviest(), feature, kind)
    }

    /// Nearest deviation divided by that component's standard deviation.
    pub fn nearest_normalized_deviation(&self, feature: f32, kind: FeatureKind) -> FormResult<f32> {
        let k = self.nearest(feature, kind)?;
        Ok(self.deviation(k, feature, kind)? / self.params.stdevs()[k])
    }

    /// Heaviest deviation divided by that component's standard deviation.
    pub fn heaviest_normalized_deviation(
        &self,
        feature: f32,
        kind: FeatureKind,
    ) -> FormResult<f32> {
        let k = self.heaviest();
        Ok(self.deviation(k, feature, kind)? / self.params.stdevs()[k])
    }

    fn deviation(&self, k: usize, feature: f32, kind: FeatureKind) -> FormResult<f32> {
        self.delta.delta(feature, self.params.means()[k], kind)
    }
}
