/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Mixture parameters and the flat host buffer they are decoded from.
//!
//! # Buffer layout
//!
//! ```text
//! [0]                 energy ceiling ΔE
//! [1]                 transition slope
//! [2]                 transition-distance scale
//! [3 .. 3+n]          weights
//! [3+n .. 3+2n]       means
//! [3+2n .. 3+3n]      standard deviations
//! ```
//!
//! # Invariants
//!
//! - `1 ≤ modal ≤ MAX_MODES`.
//! - Every standard deviation is finite and strictly positive.
//! - Weights are not constrained. A zero weight contributes nothing; negative
//!   weights fail later, in calibration.

use heapless::Vec as HVec;

use crate::error::{FormError, FormResult};

/// Maximum number of mixture components. Working arrays are sized by this.
pub const MAX_MODES: usize = 16;

/// Number of global scalars ahead of the per-component arrays.
pub const HEADER_LEN: usize = 3;

/// Largest buffer a [`MixtureParameters`] can be decoded from.
pub const MAX_BUFFER_LEN: usize = HEADER_LEN + 3 * MAX_MODES;

/// `√(2π)`, the Gaussian normalisation constant.
pub const SQRT_2PI: f32 = 2.506_628_3;

/// Buffer length required for `modal` components.
#[inline]
pub fn buffer_len(modal: usize) -> usize {
    HEADER_LEN + 3 * modal
}

/// Decoded truncated-mixture parameters.
///
/// Immutable once built; every evaluation borrows it. Deserialising runs the
/// same checks as [`MixtureParameters::new`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawMixtureParameters"))]
pub struct MixtureParameters {
    /// Energy ceiling ΔE bounding each component's penalty.
    pub energy_ceiling: f32,
    /// Sharpness of the tanh blend towards the floor.
    pub transition_slope: f32,
    /// Multiplier on the onset distance giving the untouched window half-width.
    pub transition_distance_scale: f32,
    weights: HVec<f32, MAX_MODES>,
    means: HVec<f32, MAX_MODES>,
    stdevs: HVec<f32, MAX_MODES>,
}

impl MixtureParameters {
    /// Decode `modal` components from the host buffer.
    pub fn decode(modal: usize, buffer: &[f32]) -> FormResult<Self> {
        check_modal(modal)?;
        let expected = buffer_len(modal);
        if buffer.len() != expected {
            return Err(FormError::BufferLength {
                modal,
                expected,
                got: buffer.len(),
            });
        }
        let body = &buffer[HEADER_LEN..];
        Self::new(
            buffer[0],
            buffer[1],
            buffer[2],
            &body[..modal],
            &body[modal..2 * modal],
            &body[2 * modal..],
        )
    }

    /// Build from separate per-component slices of equal length.
    pub fn new(
        energy_ceiling: f32,
        transition_slope: f32,
        transition_distance_scale: f32,
        weights: &[f32],
        means: &[f32],
        stdevs: &[f32],
    ) -> FormResult<Self> {
        let modal = weights.len();
        check_modal(modal)?;
        if means.len() != modal || stdevs.len() != modal {
            let got = HEADER_LEN + weights.len() + means.len() + stdevs.len();
            return Err(FormError::BufferLength {
                modal,
                expected: buffer_len(modal),
                got,
            });
        }
        if let Some((index, &stdev)) = stdevs
            .iter()
            .enumerate()
            .find(|(_, s)| !s.is_finite() || **s <= 0.0)
        {
            return Err(FormError::NonPositiveStdev { index, stdev });
        }

        let too_many = FormError::ComponentCount { modal, max: MAX_MODES };
        Ok(Self {
            energy_ceiling,
            transition_slope,
            transition_distance_scale,
            weights: HVec::from_slice(weights).map_err(|_| too_many)?,
            means: HVec::from_slice(means).map_err(|_| too_many)?,
            stdevs: HVec::from_slice(stdevs).map_err(|_| too_many)?,
        })
    }

    /// Number of mixture components.
    #[inline]
    pub fn modal(&self) -> usize {
        self.weights.len()
    }

    /// Component weights.
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Component means.
    pub fn means(&self) -> &[f32] {
        &self.means
    }

    /// Component standard deviations.
    pub fn stdevs(&self) -> &[f32] {
        &self.stdevs
    }

    /// Peak density `w / (√(2π)·σ)` of component `k`.
    #[inline]
    pub fn amplitude(&self, k: usize) -> f32 {
        self.weights[k] / (SQRT_2PI * self.stdevs[k])
    }

    /// Unnormalised Gaussian value of component `k` at `x`, with peak `amp`.
    #[inline]
    pub(crate) fn gaussian(&self, k: usize, amp: f32, x: f32) -> f32 {
        let d = x - self.means[k];
        let s = self.stdevs[k];
        amp * libm::expf(-0.5 * (d * d) / (s * s))
    }

    /// Re-encode in the host buffer layout.
    pub fn to_buffer(&self) -> HVec<f32, MAX_BUFFER_LEN> {
        let mut out = HVec::new();
        // Capacity is MAX_BUFFER_LEN and modal ≤ MAX_MODES, so no push can fail.
        let _ = out.extend_from_slice(&[
            self.energy_ceiling,
            self.transition_slope,
            self.transition_distance_scale,
        ]);
        let _ = out.extend_from_slice(&self.weights);
        let _ = out.extend_from_slice(&self.means);
        let _ = out.extend_from_slice(&self.stdevs);
        out
    }
}

/// Unchecked wire form of [`MixtureParameters`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawMixtureParameters {
    energy_ceiling: f32,
    transition_slope: f32,
    transition_distance_scale: f32,
    weights: HVec<f32, MAX_MODES>,
    means: HVec<f32, MAX_MODES>,
    stdevs: HVec<f32, MAX_MODES>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawMixtureParameters> for MixtureParameters {
    type Error = FormError;

    fn try_from(raw: RawMixtureParameters) -> FormResult<Self> {
        Self::new(
            raw.energy_ceiling,
            raw.transition_slope,
            raw.transition_distance_scale,
            &raw.weights,
            &raw.means,
            &raw.stdevs,
        )
    }
}

fn check_modal(modal: usize) -> FormResult<()> {
    if modal == 0 || modal > MAX_MODES {
        return Err(FormError::ComponentCount { modal, max: MAX_MODES });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_mode_buffer() -> [f32; 9] {
        [2.0, 1.0, 3.0, 0.4, 0.6, 1.0, 4.0, 0.5, 1.5]
    }

    #[test]
    fn decode_splits_buffer_by_stride() {
        let p = MixtureParameters::decode(2, &two_mode_buffer()).unwrap();
        assert_eq!(p.modal(), 2);
        assert_eq!(p.energy_ceiling, 2.0);
        assert_eq!(p.transition_slope, 1.0);
        assert_eq!(p.transition_distance_scale, 3.0);
        assert_eq!(p.weights(), &[0.4, 0.6]);
        assert_eq!(p.means(), &[1.0, 4.0]);
        assert_eq!(p.stdevs(), &[0.5, 1.5]);
    }

    #[test]
    fn to_buffer_restores_layout() {
        let buf = two_mode_buffer();
        let p = MixtureParameters::decode(2, &buf).unwrap();
        assert_eq!(p.to_buffer().as_slice(), &buf[..]);
    }

    #[test]
    fn wrong_length_is_rejected() {
        let buf = two_mode_buffer();
        let err = MixtureParameters::decode(2, &buf[..8]).unwrap_err();
        assert_eq!(
            err,
            FormError::BufferLength { modal: 2, expected: 9, got: 8 }
        );
    }

    #[test]
    fn zero_and_oversized_modal_are_rejected() {
        assert!(matches!(
            MixtureParameters::decode(0, &[1.0, 1.0, 1.0]),
            Err(FormError::ComponentCount { modal: 0, .. })
        ));
        let big = [1.0f32; HEADER_LEN + 3 * (MAX_MODES + 1)];
        assert!(matches!(
            MixtureParameters::decode(MAX_MODES + 1, &big),
            Err(FormError::ComponentCount { .. })
        ));
    }

    #[test]
    fn non_positive_stdev_is_rejected() {
        let mut buf = two_mode_buffer();
        buf[8] = 0.0;
        assert_eq!(
            MixtureParameters::decode(2, &buf).unwrap_err(),
            FormError::NonPositiveStdev { index: 1, stdev: 0.0 }
        );
        buf[8] = -1.0;
        assert!(MixtureParameters::decode(2, &buf).is_err());
    }

    #[test]
    fn amplitude_is_normalised_peak() {
        let p = MixtureParameters::new(2.0, 1.0, 3.0, &[1.0], &[5.0], &[1.0]).unwrap();
        assert!((p.amplitude(0) - 0.398_942_3).abs() < 1e-6);
        assert!((p.gaussian(0, p.amplitude(0), 5.0) - p.amplitude(0)).abs() < 1e-7);
    }

    #[test]
    fn mismatched_slices_are_rejected() {
        let err = MixtureParameters::new(2.0, 1.0, 3.0, &[1.0, 1.0], &[0.0], &[1.0, 1.0]);
        assert!(matches!(err, Err(FormError::BufferLength { .. })));
    }
}
