//! Python FFI bindings via PyO3.
//!
//! Exposes the host entry points of [`TruncatedGaussian`] with integer
//! feature-type tags and flat `list[float]` parameter buffers, matching the
//! layout documented in [`crate::params`].
//!
//! # Building the Python extension
//!
//! ```bash
//! pip install maturin
//! maturin develop --features python-ffi
//! ```
//!
//! # Usage
//!
//! ```python
//! from truncgauss import TruncatedGaussian, DISTANCE
//!
//! form = TruncatedGaussian()
//! # ΔE, slope, scale, weights..., means..., stdevs...
//! params = [2.0, 1.0, 3.0, 1.0, 5.0, 1.0]
//! energy, deriv = form.evaluate(5.5, DISTANCE, 1, params, True)
//! lo, hi = form.range(DISTANCE, 1, params, 4.0)
//! ```

#![allow(non_snake_case)]

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::config::{FloorPolicy, FormConfig, DEFAULT_CALIBRATION_CYCLES, RT};
use crate::error::FormError;
use crate::feature::{FeatureKind, StandardDelta};
use crate::form::{RestraintForm, TruncatedGaussian as RustTruncatedGaussian};

fn to_py(err: FormError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn kind(tag: i32) -> FeatureKind {
    FeatureKind::from_tag(tag)
}

// ── TruncatedGaussian ────────────────────────────────────────────────────────

/// Truncated multi-Gaussian restraint form.
///
/// All methods are stateless: the parameter buffer is decoded and calibrated
/// on every call.
#[pyclass(name = "TruncatedGaussian")]
pub struct PyTruncatedGaussian {
    inner: RustTruncatedGaussian<StandardDelta>,
}

#[pymethods]
impl PyTruncatedGaussian {
    /// Create a new form.
    ///
    /// Args:
    ///     rt:                 thermal energy scale (default RT at 297.15 K, kcal/mol)
    ///     calibration_cycles: floor calibration cycles (default 20)
    ///     strict_floors:      raise instead of clamping floors above the peak density
    #[new]
    #[pyo3(signature = (rt=RT, calibration_cycles=DEFAULT_CALIBRATION_CYCLES, strict_floors=false))]
    pub fn new(rt: f32, calibration_cycles: usize, strict_floors: bool) -> PyResult<Self> {
        let config = FormConfig {
            rt,
            calibration_cycles,
            floor_policy: if strict_floors {
                FloorPolicy::Reject
            } else {
                FloorPolicy::Clamp
            },
        };
        let inner = RustTruncatedGaussian::with_config(config, StandardDelta).map_err(to_py)?;
        Ok(Self { inner })
    }

    /// Energy and (optionally) its derivative at `feature`.
    ///
    /// Returns:
    ///     (energy, derivative) — derivative is None unless `deriv` is True
    #[pyo3(signature = (feature, feature_type, modal, params, deriv=false))]
    pub fn evaluate(
        &self,
        feature: f32,
        feature_type: i32,
        modal: usize,
        params: Vec<f32>,
        deriv: bool,
    ) -> PyResult<(f32, Option<f32>)> {
        let e = self
            .inner
            .evaluate(feature, kind(feature_type), modal, &params, deriv)
            .map_err(to_py)?;
        Ok((e.value, e.derivative))
    }

    /// Signed deviation from the nearest component mean.
    pub fn nearest_deviation(
        &self,
        feature: f32,
        feature_type: i32,
        modal: usize,
        params: Vec<f32>,
    ) -> PyResult<f32> {
        self.inner
            .nearest_deviation(feature, kind(feature_type), modal, &params)
            .map_err(to_py)
    }

    /// Signed deviation from the heaviest component's mean.
    pub fn heaviest_deviation(
        &self,
        feature: f32,
        feature_type: i32,
        modal: usize,
        params: Vec<f32>,
    ) -> PyResult<f32> {
        self.inner
            .heaviest_deviation(feature, kind(feature_type), modal, &params)
            .map_err(to_py)
    }

    /// Nearest deviation divided by that component's standard deviation.
    pub fn nearest_normalized_deviation(
        &self,
        feature: f32,
        feature_type: i32,
        modal: usize,
        params: Vec<f32>,
    ) -> PyResult<f32> {
        self.inner
            .nearest_normalized_deviation(feature, kind(feature_type), modal, &params)
            .map_err(to_py)
    }

    /// Heaviest deviation divided by that component's standard deviation.
    pub fn heaviest_normalized_deviation(
        &self,
        feature: f32,
        feature_type: i32,
        modal: usize,
        params: Vec<f32>,
    ) -> PyResult<f32> {
        self.inner
            .heaviest_normalized_deviation(feature, kind(feature_type), modal, &params)
            .map_err(to_py)
    }

    /// Mean of the component nearest to `feature`.
    pub fn nearest_mean(
        &self,
        feature: f32,
        feature_type: i32,
        modal: usize,
        params: Vec<f32>,
    ) -> PyResult<f32> {
        self.inner
            .nearest_mean(feature, kind(feature_type), modal, &params)
            .map_err(to_py)
    }

    /// Mean of the component with the largest absolute weight.
    pub fn heaviest_mean(&self, feature_type: i32, modal: usize, params: Vec<f32>) -> PyResult<f32> {
        self.inner
            .heaviest_mean(kind(feature_type), modal, &params)
            .map_err(to_py)
    }

    /// Spline tabulation bounds `(min, max)`; `min` is never negative.
    pub fn range(
        &self,
        feature_type: i32,
        modal: usize,
        params: Vec<f32>,
        spline_range: f32,
    ) -> PyResult<(f32, f32)> {
        let r = self
            .inner
            .range(kind(feature_type), modal, &params, spline_range)
            .map_err(to_py)?;
        Ok((r.min, r.max))
    }

    /// Python repr string.
    pub fn __repr__(&self) -> String {
        let cfg = self.inner.config();
        format!(
            "TruncatedGaussian(rt={}, calibration_cycles={}, floor_policy={:?})",
            cfg.rt, cfg.calibration_cycles, cfg.floor_policy
        )
    }
}

// ── Module entry point ────────────────────────────────────────────────────────

/// Truncated multi-Gaussian restraint form — Python bindings.
#[pymodule]
pub fn truncgauss(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyTruncatedGaussian>()?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add("RT", RT)?;
    m.add("DISTANCE", FeatureKind::Distance.tag())?;
    m.add("ANGLE", FeatureKind::Angle.tag())?;
    m.add("DIHEDRAL", FeatureKind::Dihedral.tag())?;
    Ok(())
}
