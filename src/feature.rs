//! Feature types and the signed-deviation primitive.
//!
//! The host identifies what a feature measures with an integer tag. The form
//! only needs to know whether the feature is periodic, which decides how the
//! deviation from a component mean is measured. Tags other than the three
//! built-in geometries are carried through untouched as [`FeatureKind::Other`]
//! for host-supplied [`FeatureDelta`] implementations to interpret.

use core::f32::consts::PI;

use crate::error::{FormError, FormResult};

const TWO_PI: f32 = 2.0 * PI;

/// Geometric feature measured by a restraint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FeatureKind {
    /// Interatomic distance (tag 1). Linear.
    Distance,
    /// Bond angle in radians (tag 2). Linear on `[0, π]`.
    Angle,
    /// Dihedral angle in radians (tag 3). Periodic with period 2π.
    Dihedral,
    /// Any other host feature type, by tag. Linear for [`StandardDelta`].
    Other(i32),
}

impl FeatureKind {
    /// Resolve a host feature-type tag.
    pub fn from_tag(tag: i32) -> Self {
        match tag {
            1 => Self::Distance,
            2 => Self::Angle,
            3 => Self::Dihedral,
            other => Self::Other(other),
        }
    }

    /// Host tag for this kind.
    pub fn tag(self) -> i32 {
        match self {
            Self::Distance => 1,
            Self::Angle => 2,
            Self::Dihedral => 3,
            Self::Other(tag) => tag,
        }
    }

    /// `true` if deviations wrap around a full turn.
    pub fn is_periodic(self) -> bool {
        matches!(self, Self::Dihedral)
    }
}

/// Signed deviation of a feature value from a reference location.
///
/// Implemented by hosts that have their own notion of feature geometry.
/// An error aborts whatever evaluation requested the deviation.
pub trait FeatureDelta {
    /// Return `feature − mean` under the semantics of `kind`.
    fn delta(&self, feature: f32, mean: f32, kind: FeatureKind) -> FormResult<f32>;
}

/// Built-in deviation: plain difference, wrapped into `[−π, π]` for
/// periodic features.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StandardDelta;

impl FeatureDelta for StandardDelta {
    fn delta(&self, feature: f32, mean: f32, kind: FeatureKind) -> FormResult<f32> {
        if !feature.is_finite() || !mean.is_finite() {
            return Err(FormError::NonFiniteFeature { feature, mean });
        }
        let d = feature - mean;
        if kind.is_periodic() {
            Ok(d - TWO_PI * libm::roundf(d / TWO_PI))
        } else {
            Ok(d)
        }
    }
}

impl From<i32> for FeatureKind {
    fn from(tag: i32) -> Self {
        Self::from_tag(tag)
    }
}

impl<D: FeatureDelta + ?Sized> FeatureDelta for &D {
    fn delta(&self, feature: f32, mean: f32, kind: FeatureKind) -> FormResult<f32> {
        (**self).delta(feature, mean, kind)
    }
}
