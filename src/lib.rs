//! # truncgauss
//!
//! Truncated multi-Gaussian restraint potential — a bounded, differentiable
//! energy that scores one geometric feature (a distance, angle or dihedral)
//! against a multi-modal reference distribution.
//!
//! ---
//!
//! ## The form
//!
//! The reference distribution is a mixture of Gaussian components. Taken
//! literally, `−RT·ln(mixture)` grows without bound away from every mean,
//! which lets a single badly placed feature dominate an optimisation. Here
//! each component is **floored**: its contribution never drops below a
//! density `gmin[k]` chosen so that the energy penalty it can impose stays
//! within the ceiling ΔE.
//!
//! Floors interact. Where components overlap, the peak density ΔE is measured
//! from is the sum of several terms, so each floor depends on all the others.
//! The floors are found by a fixed 20-cycle iteration over the points where
//! the floored mixture can peak.
//!
//! Inside a window around each mean the raw Gaussian is used unchanged;
//! outside it a tanh sigmoid blends the component onto its floor. The energy
//! derivative is analytic and is computed on exactly the branch the value was.
//!
//! ## The pipeline
//!
//! ```text
//! flat buffer → MixtureParameters → TruncationCalibrator → Calibration
//!                      │                                        │
//!                      ├── ModeSelector (diagnostics)           ▼
//!                      └── estimate_range (spline bounds)   EnergyEvaluator → Energy
//! ```
//!
//! ## Module overview
//!
//! | Module | Key types | What it does |
//! |--------|-----------|--------------|
//! | [`params`] | [`MixtureParameters`] | Decode the host buffer; per-component weights, means, spreads |
//! | [`feature`] | [`FeatureKind`], [`FeatureDelta`] | Feature-type tags and the signed deviation primitive |
//! | [`calibrate`] | [`TruncationCalibrator`], [`Calibration`] | Self-consistent floors and onset distances |
//! | [`energy`] | [`EnergyEvaluator`], [`Energy`] | Truncated-mixture energy and derivative |
//! | [`modes`] | [`ModeSelector`] | Nearest / heaviest component statistics |
//! | [`range`] | [`FeatureRange`] | Spline tabulation bounds |
//! | [`form`] | [`RestraintForm`], [`TruncatedGaussian`], [`FormTable`] | Host entry points and registry |
//! | [`config`] | [`FormConfig`] | RT, cycle count, floor-overflow policy |
//! | [`error`] | [`FormError`] | Error hierarchy |
//!
//! ## Quick start
//!
//! ```rust
//! use truncgauss::{FeatureKind, RestraintForm, TruncatedGaussian};
//!
//! // ΔE, slope, scale, weight, mean, stdev
//! let params = [2.0, 1.0, 3.0, 1.0, 5.0, 1.0];
//! let form = TruncatedGaussian::new();
//! let e = form.evaluate(5.5, FeatureKind::Distance, 1, &params, true).unwrap();
//! assert!(e.derivative.unwrap() > 0.0);
//! ```
//!
//! ## `no_std`
//!
//! The crate is `#![no_std]` by default and never touches the heap on the
//! evaluation path: working arrays are fixed at [`params::MAX_MODES`]
//! components. Transcendentals go through `libm`, so results do not depend on
//! the `std` feature. Enable `serde` for serialisation of parameters,
//! calibrations and configuration, and `python-ffi` for PyO3 bindings.
//!
//! ## License
//!
//! Business Source License 1.1.

#![cfg_attr(not(any(feature = "std", feature = "python-ffi", test)), no_std)]
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod calibrate;
pub mod config;
pub mod energy;
pub mod error;
pub mod feature;
pub mod form;
pub mod modes;
pub mod params;
pub mod range;

#[cfg(feature = "python-ffi")]
pub mod ffi;

pub use calibrate::{Calibration, TruncationCalibrator};
pub use config::{FloorPolicy, FormConfig, RT};
pub use energy::{Energy, EnergyEvaluator};
pub use error::{FormError, FormResult};
pub use feature::{FeatureDelta, FeatureKind, StandardDelta};
pub use form::{FormId, FormTable, RestraintForm, TruncatedGaussian};
pub use modes::ModeSelector;
pub use params::MixtureParameters;
pub use range::{estimate_range, FeatureRange};
