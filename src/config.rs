//! Runtime configuration for the truncated Gaussian form.
//!
//! All fields have defaults that reproduce the reference energies: RT at
//! 297.15 K, 20 calibration cycles and clamping of overflowing floors.

use crate::error::{FormError, FormResult};

/// RT at 297.15 K, in kcal/mol.
pub const RT: f32 = 0.590_099_1;

/// Number of calibration cycles used by the reference potential.
pub const DEFAULT_CALIBRATION_CYCLES: usize = 20;

/// Upper bound accepted by [`FormConfig::validate`] for the cycle count.
pub const MAX_CALIBRATION_CYCLES: usize = 1000;

// ─── FloorPolicy ─────────────────────────────────────────────────────────────

/// What calibration does when a component's floor reaches its peak density.
///
/// At that point the onset distance `σ·√(−2·ln(gmin/amp))` has no real value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FloorPolicy {
    /// Pin the floor to the peak density and the onset distance to zero.
    /// The component then contributes an almost flat term.
    #[default]
    Clamp,
    /// Fail the call with [`FormError::FloorAboveAmplitude`].
    Reject,
}

// ─── FormConfig ──────────────────────────────────────────────────────────────

/// Configuration shared by every evaluation of a form.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FormConfig {
    /// Thermal energy scale converting densities to energies. Default [`RT`].
    pub rt: f32,

    /// Fixed number of floor-calibration cycles. There is no convergence
    /// test; changing this changes computed energies. Default 20.
    pub calibration_cycles: usize,

    /// Handling of floors that reach the peak density. Default [`FloorPolicy::Clamp`].
    pub floor_policy: FloorPolicy,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            rt: RT,
            calibration_cycles: DEFAULT_CALIBRATION_CYCLES,
            floor_policy: FloorPolicy::Clamp,
        }
    }
}

impl FormConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> FormResult<()> {
        if !self.rt.is_finite() || self.rt <= 0.0 {
            return Err(FormError::Config("rt must be finite and > 0"));
        }
        if self.calibration_cycles > MAX_CALIBRATION_CYCLES {
            return Err(FormError::Config("calibration_cycles must be <= 1000"));
        }
        Ok(())
    }
}
