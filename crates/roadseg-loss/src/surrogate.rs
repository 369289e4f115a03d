//! Smooth replacements for the hard `mean > cutoff` patch decision.
//!
//! A [`SoftThreshold`] maps patch means to soft "road" scores in `[0, 1]`.
//! The patch-F1 loss is generic over it, so a surrogate can be swapped without
//! touching how the soft counts are formed.

use core::fmt::Debug;

use burn::{
    config::Config,
    tensor::{activation::sigmoid, backend::Backend, Tensor},
};

/// Differentiable relaxation of `values > threshold`.
pub trait SoftThreshold: Clone + Debug + Send + Sync {
    /// Soft score of every element, increasing in `values` and equal to 0.5 at
    /// `threshold` for symmetric surrogates.
    fn apply<B: Backend, const D: usize>(
        &self,
        values: Tensor<B, D>,
        threshold: f64,
    ) -> Tensor<B, D>;
}

/// `sigmoid(k * (x - threshold))`.
///
/// Larger sharpness approaches the hard step but flattens the gradient away
/// from the threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SigmoidThreshold {
    pub sharpness: f64,
}

impl SoftThreshold for SigmoidThreshold {
    fn apply<B: Backend, const D: usize>(
        &self,
        values: Tensor<B, D>,
        threshold: f64,
    ) -> Tensor<B, D> {
        sigmoid(values.sub_scalar(threshold).mul_scalar(self.sharpness))
    }
}

/// Linear ramp of the given width centred on the threshold, clamped to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampThreshold {
    pub width: f64,
}

impl SoftThreshold for RampThreshold {
    fn apply<B: Backend, const D: usize>(
        &self,
        values: Tensor<B, D>,
        threshold: f64,
    ) -> Tensor<B, D> {
        values
            .sub_scalar(threshold)
            .div_scalar(self.width)
            .add_scalar(0.5)
            .clamp(0.0, 1.0)
    }
}

/// Uses the patch means themselves as scores and ignores the threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassThrough;

impl SoftThreshold for PassThrough {
    fn apply<B: Backend, const D: usize>(
        &self,
        values: Tensor<B, D>,
        _threshold: f64,
    ) -> Tensor<B, D> {
        values
    }
}

/// Serializable choice of the built-in surrogates.
#[derive(Config, Debug, PartialEq)]
pub enum Surrogate {
    /// [`SigmoidThreshold`] with the given sharpness.
    Sigmoid(f64),
    /// [`RampThreshold`] with the given width.
    Ramp(f64),
    /// [`PassThrough`].
    PassThrough,
}

impl Surrogate {
    pub(crate) fn assertions(&self) {
        match self {
            Self::Sigmoid(sharpness) => assert!(
                *sharpness > 0.0,
                "Sigmoid sharpness must be positive, got {sharpness}"
            ),
            Self::Ramp(width) => assert!(*width > 0.0, "Ramp width must be positive, got {width}"),
            Self::PassThrough => {}
        }
    }
}

impl Default for Surrogate {
    fn default() -> Self {
        Self::Sigmoid(50.0)
    }
}

impl SoftThreshold for Surrogate {
    fn apply<B: Backend, const D: usize>(
        &self,
        values: Tensor<B, D>,
        threshold: f64,
    ) -> Tensor<B, D> {
        match self {
            Self::Sigmoid(sharpness) => SigmoidThreshold {
                sharpness: *sharpness,
            }
            .apply(values, threshold),
            Self::Ramp(width) => RampThreshold { width: *width }.apply(values, threshold),
            Self::PassThrough => PassThrough.apply(values, threshold),
        }
    }
}
