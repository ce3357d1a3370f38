//! Error hierarchy for the truncated Gaussian form.
//!
//! Every host entry point returns [`FormResult`]. Two kinds of failure exist:
//! errors raised by the feature-deviation primitive, which abort the call
//! immediately, and numerical-domain failures (non-positive spread, floors
//! above the peak density, non-positive mixture density) which are reported
//! here rather than surfacing as NaN/Inf energies.

use thiserror::Error;

/// Root error type for all truncated Gaussian failures.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum FormError {
    /// The flat parameter buffer does not match the `3 + 3·modal` stride.
    #[error("parameter buffer holds {got} values, expected {expected} for {modal} components")]
    BufferLength {
        /// Component count the caller asked for.
        modal: usize,
        /// Length implied by `modal`.
        expected: usize,
        /// Length actually supplied.
        got: usize,
    },

    /// Component count is zero or above the stack capacity.
    #[error("component count must be in 1..={max}, got {modal}")]
    ComponentCount {
        /// Requested component count.
        modal: usize,
        /// Largest supported component count.
        max: usize,
    },

    /// A component's standard deviation is zero, negative or not finite.
    #[error("component {index} has non-positive standard deviation {stdev}")]
    NonPositiveStdev {
        /// Component index.
        index: usize,
        /// Offending value.
        stdev: f32,
    },

    /// A deviation primitive was asked to measure a feature type it does not
    /// handle.
    #[error("unknown feature type tag {0}")]
    UnknownFeatureType(i32),

    /// Feature value or reference mean is NaN or infinite.
    #[error("feature deviation undefined for feature {feature} against mean {mean}")]
    NonFiniteFeature {
        /// Raw feature value.
        feature: f32,
        /// Reference location.
        mean: f32,
    },

    /// Calibration pushed a floor above the component's peak density.
    #[error("component {index} floor {floor} exceeds its peak density {amp}")]
    FloorAboveAmplitude {
        /// Component index.
        index: usize,
        /// Calibrated floor.
        floor: f32,
        /// Peak density `w / (√(2π)·σ)`.
        amp: f32,
    },

    /// Blended mixture density is zero, negative or not finite.
    #[error("mixture density {0} is not positive, energy undefined")]
    NonPositiveDensity(f32),

    /// Density is fine but `dE/dx` overflowed.
    #[error("energy derivative {derivative} at feature {feature} is not finite")]
    NonFiniteDerivative {
        /// Feature value being evaluated.
        feature: f32,
        /// Offending derivative.
        derivative: f32,
    },

    /// A calibration does not cover the components it is used with, or its
    /// per-component arrays disagree in length.
    #[error("calibration covers {got} components, expected {expected}")]
    CalibrationMismatch {
        /// Components required.
        expected: usize,
        /// Components present.
        got: usize,
    },

    /// Other NaN/Inf produced while calibrating.
    #[error("numerical error in component {index}: {what}")]
    Numerical {
        /// Component index.
        index: usize,
        /// Short description of the failing quantity.
        what: &'static str,
    },

    /// Invalid [`crate::config::FormConfig`].
    #[error("config error: {0}")]
    Config(&'static str),

    /// No form is registered under the requested id.
    #[error("no form registered under id {0}")]
    UnknownForm(u32),
}

/// Convenience alias used throughout the crate.
pub type FormResult<T> = Result<T, FormError>;
