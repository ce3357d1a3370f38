/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Self-consistent truncation floors for a Gaussian mixture.
//!
//! Each component `k` is given a floor `gmin[k]`: its contribution to the
//! mixture density is never allowed below it, which caps the component's
//! energy penalty. The floors are coupled, because where components overlap
//! the density that ΔE is measured against is the sum of several terms.
//! [`TruncationCalibrator`] resolves the coupling with a fixed number of
//! cycles over a set of candidate maxima.
//!
//! # Cycle
//!
//! ```text
//! 1. g_max  = clamped per-component values at the candidate point with the
//!             largest Σ_k max(gauss_k(x), gmin[k])
//! 2. excess = Σ_k (g_max[k] − gmin[k])
//!    amp_dominant ⇔ excess ≤ amp[k] − gmin[k] for every k
//! 3. for k in 0..n:
//!        S       = amp_dominant ? amp[k] + Σ_{l≠k} gmin[l]
//!                               : g_max[k] + Σ_{l≠k} g_max[l]
//!        gmin[k] = exp(−(ΔE − RT·ln S)/RT) · w[k]
//!        onset   = σ[k]·√(−2·ln(gmin[k]/amp[k]))
//! ```
//!
//! Floors are updated in place during step 3: component `k` already sees the
//! new floors of components `0..k`.
//!
//! # Invariants
//!
//! - `0 < gmin[k] ≤ amp[k]` and `onset[k] ≥ 0` on success.
//! - The cycle count is fixed; there is no convergence test.

use heapless::Vec as HVec;

use crate::config::{FloorPolicy, FormConfig};
use crate::error::{FormError, FormResult};
use crate::params::{MixtureParameters, MAX_MODES};

// ─── candidate points ────────────────────────────────────────────────────────

/// Points at which the floored mixture sum is sampled for its maximum.
///
/// For every `k` and every `l < n − 1`, yields the pair point
/// `(mean[k] + mean[l]) / 2` followed by the triple points
/// `(mean[k] + (mean[l] + mean[m]) / 2) / 2` for `m > l`.
/// Empty for a single component.
pub fn candidate_points(means: &[f32]) -> impl Iterator<Item = f32> + '_ {
    let n = means.len();
    (0..n).flat_map(move |k| {
        (0..n.saturating_sub(1)).flat_map(move |l| {
            let pair = (means[k] + means[l]) / 2.0;
            core::iter::once(pair)
                .chain((l + 1..n).map(move |m| (means[k] + (means[l] + means[m]) / 2.0) / 2.0))
        })
    })
}

/// Number of points [`candidate_points`] yields for `n` means.
pub fn candidate_count(n: usize) -> usize {
    if n < 2 {
        return 0;
    }
    n * (n - 1) + n * n * (n - 1) / 2
}

// ─── Calibration ─────────────────────────────────────────────────────────────

/// Calibrated per-component truncation state, valid for one parameter set.
///
/// A deserialised calibration is checked with [`Calibration::validate`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawCalibration"))]
pub struct Calibration {
    amp: HVec<f32, MAX_MODES>,
    floor: HVec<f32, MAX_MODES>,
    onset: HVec<f32, MAX_MODES>,
    amp_dominant: bool,
}

impl Calibration {
    /// Peak density of component `k`.
    #[inline]
    pub fn amplitude(&self, k: usize) -> f32 {
        self.amp[k]
    }

    /// Truncation floor `gmin` of component `k`.
    #[inline]
    pub fn floor(&self, k: usize) -> f32 {
        self.floor[k]
    }

    /// Distance from the mean at which component `k`'s Gaussian meets its floor.
    #[inline]
    pub fn onset(&self, k: usize) -> f32 {
        self.onset[k]
    }

    /// All floors, in component order.
    pub fn floors(&self) -> &[f32] {
        &self.floor
    }

    /// All onset distances, in component order.
    pub fn onsets(&self) -> &[f32] {
        &self.onset
    }

    /// Dominance flag of the last cycle run. `true` before any cycle.
    pub fn amp_dominant(&self) -> bool {
        self.amp_dominant
    }

    /// Number of calibrated components.
    pub fn len(&self) -> usize {
        self.amp.len()
    }

    /// `true` if no component was calibrated.
    pub fn is_empty(&self) -> bool {
        self.amp.is_empty()
    }

    /// Check the per-component arrays agree in length and every component
    /// satisfies `0 ≤ floor ≤ amp` with a finite, non-negative onset.
    pub fn validate(&self) -> FormResult<()> {
        let n = self.amp.len();
        if n == 0 {
            return Err(FormError::ComponentCount { modal: 0, max: MAX_MODES });
        }
        for got in [self.floor.len(), self.onset.len()] {
            if got != n {
                return Err(FormError::CalibrationMismatch { expected: n, got });
            }
        }
        for k in 0..n {
            let (amp, floor, onset) = (self.amp[k], self.floor[k], self.onset[k]);
            if !amp.is_finite() || amp < 0.0 {
                return Err(FormError::Numerical { index: k, what: "peak density is not finite and non-negative" });
            }
            if !floor.is_finite() || floor < 0.0 || floor > amp {
                return Err(FormError::Numerical { index: k, what: "floor outside [0, peak density]" });
            }
            if !onset.is_finite() || onset < 0.0 {
                return Err(FormError::Numerical { index: k, what: "onset distance is not finite and non-negative" });
            }
        }
        Ok(())
    }
}

/// Unchecked wire form of [`Calibration`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawCalibration {
    amp: HVec<f32, MAX_MODES>,
    floor: HVec<f32, MAX_MODES>,
    onset: HVec<f32, MAX_MODES>,
    amp_dominant: bool,
}

#[cfg(feature = "serde")]
impl TryFrom<RawCalibration> for Calibration {
    type Error = FormError;

    fn try_from(raw: RawCalibration) -> FormResult<Self> {
        let cal = Calibration {
            amp: raw.amp,
            floor: raw.floor,
            onset: raw.onset,
            amp_dominant: raw.amp_dominant,
        };
        cal.validate()?;
        Ok(cal)
    }
}

#[cfg(test)]
impl Calibration {
    pub(crate) fn with_floor(mut self, floor: f32) -> Self {
        self.floor.iter_mut().for_each(|f| *f = floor);
        self
    }
}

// ─── TruncationCalibrator ────────────────────────────────────────────────────

/// Fixed-cycle floor calibration.
#[derive(Clone, Debug)]
pub struct TruncationCalibrator {
    rt: f32,
    cycles: usize,
    policy: FloorPolicy,
}

impl TruncationCalibrator {
    /// Build from a form configuration.
    pub fn new(config: &FormConfig) -> Self {
        Self {
            rt: config.rt,
            cycles: config.calibration_cycles,
            policy: config.floor_policy,
        }
    }

    /// Calibrate floors and onset distances for `params`.
    pub fn calibrate(&self, params: &MixtureParameters) -> FormResult<Calibration> {
        let n = params.modal();
        let w = params.weights();
        let mut amp = [0.0f32; MAX_MODES];
        let mut floor = [0.0f32; MAX_MODES];
        let mut onset = [0.0f32; MAX_MODES];

        for k in 0..n {
            amp[k] = params.amplitude(k);
            let ceiling = params.energy_ceiling - self.rt * libm::logf(amp[k]);
            floor[k] = libm::expf(-ceiling / self.rt) * w[k];
            onset[k] = self.settle(k, &mut floor[k], amp[k], params.stdevs()[k])?;
        }

        let mut amp_dominant = true;
        let mut g_max = [0.0f32; MAX_MODES];
        for cycle in 0..self.cycles {
            let peak = self.peak_candidate(params, &amp[..n], &floor[..n], &mut g_max[..n]);

            let excess: f32 = (0..n).map(|k| g_max[k] - floor[k]).sum();
            amp_dominant = (0..n).all(|k| excess <= amp[k] - floor[k]);
            log::trace!(
                "calibration cycle {cycle}: peak sum {peak:.6e}, excess {excess:.6e}, amp_dominant {amp_dominant}"
            );

            for k in 0..n {
                let (own, others) = if amp_dominant {
                    (amp[k], sum_except(&floor[..n], k))
                } else {
                    (g_max[k], sum_except(&g_max[..n], k))
                };
                let ceiling = params.energy_ceiling - self.rt * libm::logf(own + others);
                floor[k] = libm::expf(-ceiling / self.rt) * w[k];
                onset[k] = self.settle(k, &mut floor[k], amp[k], params.stdevs()[k])?;
            }
        }

        log::debug!(
            "calibrated {n} components over {} cycles, amp_dominant {amp_dominant}",
            self.cycles
        );

        let too_many = FormError::ComponentCount { modal: n, max: MAX_MODES };
        Ok(Calibration {
            amp: HVec::from_slice(&amp[..n]).map_err(|_| too_many)?,
            floor: HVec::from_slice(&floor[..n]).map_err(|_| too_many)?,
            onset: HVec::from_slice(&onset[..n]).map_err(|_| too_many)?,
            amp_dominant,
        })
    }

    /// Find the candidate point with the largest floored sum and write its
    /// clamped per-component values into `g_max`. Returns that sum.
    fn peak_candidate(
        &self,
        params: &MixtureParameters,
        amp: &[f32],
        floor: &[f32],
        g_max: &mut [f32],
    ) -> f32 {
        g_max.iter_mut().for_each(|g| *g = 0.0);
        let mut best = 0.0f32;
        for x in candidate_points(params.means()) {
            let sum: f32 = (0..amp.len())
                .map(|k| libm::fmaxf(params.gaussian(k, amp[k], x), floor[k]))
                .sum();
            if sum > best {
                best = sum;
                for (k, g) in g_max.iter_mut().enumerate() {
                    *g = libm::fmaxf(params.gaussian(k, amp[k], x), floor[k]);
                }
            }
        }
        best
    }

    /// Check a freshly computed floor and return the matching onset distance.
    fn settle(&self, index: usize, floor: &mut f32, amp: f32, stdev: f32) -> FormResult<f32> {
        // Zero weight: the component never contributes, floor and onset stay 0.
        if amp == 0.0 && *floor == 0.0 {
            return Ok(0.0);
        }
        if !floor.is_finite() || *floor <= 0.0 || !amp.is_finite() {
            return Err(FormError::Numerical {
                index,
                what: "truncation floor is not a positive finite density",
            });
        }
        if *floor >= amp {
            match self.policy {
                FloorPolicy::Reject if *floor > amp => {
                    return Err(FormError::FloorAboveAmplitude {
                        index,
                        floor: *floor,
                        amp,
                    });
                }
                FloorPolicy::Reject => return Ok(0.0),
                FloorPolicy::Clamp => {
                    if *floor > amp {
                        log::warn!(
                            "component {index}: floor {:.6e} above peak {amp:.6e}, clamping",
                            *floor
                        );
                    }
                    *floor = amp;
                    return Ok(0.0);
                }
            }
        }
        Ok(stdev * libm::sqrtf(-2.0 * libm::logf(*floor / amp)))
    }
}

fn sum_except(values: &[f32], skip: usize) -> f32 {
    values
        .iter()
        .enumerate()
        .filter(|&(l, _)| l != skip)
        .map(|(_, v)| *v)
        .sum()
}
