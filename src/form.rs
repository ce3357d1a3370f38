//! Host-facing entry points and the form registry.
//!
//! A host scoring framework sees a restraint form as a table of callbacks,
//! each taking a feature value, a feature type, the component count and the
//! raw parameter buffer. [`RestraintForm`] is that table; [`TruncatedGaussian`]
//! implements it by decoding the buffer, calibrating, and delegating to
//! [`EnergyEvaluator`], [`ModeSelector`] and [`estimate_range`].
//!
//! Every call is stateless: parameters are decoded and calibrated afresh, so
//! a single form may be shared across threads.

use hashbrown::HashMap;

use crate::calibrate::{Calibration, TruncationCalibrator};
use crate::config::FormConfig;
use crate::energy::{Energy, EnergyEvaluator};
use crate::error::{FormError, FormResult};
use crate::feature::{FeatureDelta, FeatureKind, StandardDelta};
use crate::modes::ModeSelector;
use crate::params::MixtureParameters;
use crate::range::{estimate_range, FeatureRange};

// ─── RestraintForm ───────────────────────────────────────────────────────────

/// Callback table a host registers for one restraint functional form.
pub trait RestraintForm {
    /// Energy at `feature`, with `dE/dx` when `want_derivative`.
    fn evaluate(
        &self,
        feature: f32,
        kind: FeatureKind,
        modal: usize,
        params: &[f32],
        want_derivative: bool,
    ) -> FormResult<Energy>;

    /// Signed deviation from the nearest component mean.
    fn nearest_deviation(
        &self,
        feature: f32,
        kind: FeatureKind,
        modal: usize,
        params: &[f32],
    ) -> FormResult<f32>;

    /// Signed deviation from the heaviest component's mean.
    fn heaviest_deviation(
        &self,
        feature: f32,
        kind: FeatureKind,
        modal: usize,
        params: &[f32],
    ) -> FormResult<f32>;

    /// Nearest deviation in units of that component's standard deviation.
    fn nearest_normalized_deviation(
        &self,
        feature: f32,
        kind: FeatureKind,
        modal: usize,
        params: &[f32],
    ) -> FormResult<f32>;

    /// Heaviest deviation in units of that component's standard deviation.
    fn heaviest_normalized_deviation(
        &self,
        feature: f32,
        kind: FeatureKind,
        modal: usize,
        params: &[f32],
    ) -> FormResult<f32>;

    /// Mean of the component nearest to `feature`.
    fn nearest_mean(
        &self,
        feature: f32,
        kind: FeatureKind,
        modal: usize,
        params: &[f32],
    ) -> FormResult<f32>;

    /// Mean of the heaviest component.
    fn heaviest_mean(&self, kind: FeatureKind, modal: usize, params: &[f32]) -> FormResult<f32>;

    /// Interval the host should tabulate, `spline_range` spreads past the
    /// extreme means.
    fn range(
        &self,
        kind: FeatureKind,
        modal: usize,
        params: &[f32],
        spline_range: f32,
    ) -> FormResult<FeatureRange>;
}

// ─── TruncatedGaussian ───────────────────────────────────────────────────────

/// The truncated multi-Gaussian restraint form.
#[derive(Clone, Debug, Default)]
pub struct TruncatedGaussian<D = StandardDelta> {
    config: FormConfig,
    delta: D,
}

impl TruncatedGaussian<StandardDelta> {
    /// Form with default configuration and the built-in deviation.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<D: FeatureDelta> TruncatedGaussian<D> {
    /// Form with a validated configuration and a host deviation primitive.
    pub fn with_config(config: FormConfig, delta: D) -> FormResult<Self> {
        config.validate()?;
        Ok(Self { config, delta })
    }

    /// Configuration in use.
    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    /// Decode and calibrate a parameter buffer.
    pub fn calibrate(&self, modal: usize, params: &[f32]) -> FormResult<(MixtureParameters, Calibration)> {
        let params = MixtureParameters::decode(modal, params)?;
        let calibration = TruncationCalibrator::new(&self.config).calibrate(&params)?;
        Ok((params, calibration))
    }

    fn selector<'a>(&'a self, params: &'a MixtureParameters) -> ModeSelector<'a, D> {
        ModeSelector::new(params, &self.delta)
    }
}

impl<D: FeatureDelta> RestraintForm for TruncatedGaussian<D> {
    fn evaluate(
        &self,
        feature: f32,
        kind: FeatureKind,
        modal: usize,
        params: &[f32],
        want_derivative: bool,
    ) -> FormResult<Energy> {
        let (params, calibration) = self.calibrate(modal, params)?;
        EnergyEvaluator::new(&params, &calibration, self.config.rt).evaluate(
            feature,
            kind,
            &self.delta,
            want_derivative,
        )
    }

    fn nearest_deviation(
        &self,
        feature: f32,
        kind: FeatureKind,
        modal: usize,
        params: &[f32],
    ) -> FormResult<f32> {
        let params = MixtureParameters::decode(modal, params)?;
        self.selector(&params).nearest_deviation(feature, kind)
    }

    fn heaviest_deviation(
        &self,
        feature: f32,
        kind: FeatureKind,
        modal: usize,
        params: &[f32],
    ) -> FormResult<f32> {
        let params = MixtureParameters::decode(modal, params)?;
        self.selector(&params).heaviest_deviation(feature, kind)
    }

    fn nearest_normalized_deviation(
        &self,
        feature: f32,
        kind: FeatureKind,
        modal: usize,
        params: &[f32],
    ) -> FormResult<f32> {
        let params = MixtureParameters::decode(modal, params)?;
        self.selector(&params).nearest_normalized_deviation(feature, kind)
    }

    fn heaviest_normalized_deviation(
        &self,
        feature: f32,
        kind: FeatureKind,
        modal: usize,
        params: &[f32],
    ) -> FormResult<f32> {
        let params = MixtureParameters::decode(modal, params)?;
        self.selector(&params).heaviest_normalized_deviation(feature, kind)
    }

    fn nearest_mean(
        &self,
        feature: f32,
        kind: FeatureKind,
        modal: usize,
        params: &[f32],
    ) -> FormResult<f32> {
        let params = MixtureParameters::decode(modal, params)?;
        self.selector(&params).nearest_mean(feature, kind)
    }

    fn heaviest_mean(&self, _kind: FeatureKind, modal: usize, params: &[f32]) -> FormResult<f32> {
        let params = MixtureParameters::decode(modal, params)?;
        Ok(self.selector(&params).heaviest_mean())
    }

    fn range(
        &self,
        _kind: FeatureKind,
        modal: usize,
        params: &[f32],
        spline_range: f32,
    ) -> FormResult<FeatureRange> {
        let params = MixtureParameters::decode(modal, params)?;
        Ok(estimate_range(&params, spline_range))
    }
}

// ─── FormTable ───────────────────────────────────────────────────────────────

/// Identifier handed out by [`FormTable::register`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FormId(pub u32);

/// Registry of restraint forms keyed by sequential ids starting at 1.
pub struct FormTable<'a> {
    forms: HashMap<FormId, &'a (dyn RestraintForm + Sync)>,
    next: u32,
}

impl<'a> FormTable<'a> {
    /// Empty table.
    pub fn new() -> Self {
        Self {
            forms: HashMap::new(),
            next: 1,
        }
    }

    /// Register a form and return its id.
    pub fn register(&mut self, form: &'a (dyn RestraintForm + Sync)) -> FormId {
        let id = FormId(self.next);
        self.next += 1;
        self.forms.insert(id, form);
        log::debug!("registered restraint form {}", id.0);
        id
    }

    /// Look up a registered form.
    pub fn get(&self, id: FormId) -> FormResult<&'a (dyn RestraintForm + Sync)> {
        self.forms.get(&id).copied().ok_or(FormError::UnknownForm(id.0))
    }

    /// Number of registered forms.
    pub fn len(&self) -> usize {
        self.forms.len()
    }

    /// `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}

impl Default for FormTable<'_> {
    fn default() -> Self {
        Self::new()
    }
}
