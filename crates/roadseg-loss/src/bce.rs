//! Binary cross-entropy on probabilities.
//!
//! ```text
//! l_n = -(y_n * max(log(x_n), m) + (1 - y_n) * max(log(1 - x_n), m))
//! ```
//!
//! The log terms are clamped at `m = -100` so saturated predictions yield a
//! finite loss.

use burn::{
    config::Config,
    module::{Content, DisplaySettings, Module, ModuleDisplay},
    nn::loss::Reduction,
    tensor::{backend::Backend, Tensor},
};

use crate::SegmentationLoss;

/// Configuration for creating a [binary cross-entropy loss](BceLoss).
#[derive(Config, Debug)]
pub struct BceLossConfig {
    /// Lower bound of the log terms. Default: -100
    #[config(default = -100.0)]
    pub log_min: f64,
}

impl BceLossConfig {
    /// Initialize [binary cross-entropy loss](BceLoss).
    pub fn init(&self) -> BceLoss {
        self.assertions();
        BceLoss {
            log_min: self.log_min,
        }
    }

    fn assertions(&self) {
        assert!(
            self.log_min < 0.0,
            "Log clamp for BceLoss must be negative, got {}",
            self.log_min
        );
    }
}

/// Binary cross-entropy for predictions that already went through a sigmoid.
#[derive(Module, Clone, Debug)]
#[module(custom_display)]
pub struct BceLoss {
    /// Lower bound of the log terms.
    pub log_min: f64,
}

impl Default for BceLoss {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleDisplay for BceLoss {
    fn custom_settings(&self) -> Option<DisplaySettings> {
        DisplaySettings::new()
            .with_new_line_after_attribute(false)
            .optional()
    }

    fn custom_content(&self, content: Content) -> Option<Content> {
        content.add("log_min", &self.log_min).optional()
    }
}

impl BceLoss {
    /// Create a new BCE loss with default configuration.
    pub fn new() -> Self {
        BceLossConfig::new().init()
    }

    /// Compute the criterion on the input tensor with reduction.
    ///
    /// # Shapes
    ///
    /// - predictions: `[batch_size, channels, height, width]`
    /// - targets: `[batch_size, channels, height, width]`
    /// - output: `[1]`
    pub fn forward<B: Backend>(
        &self,
        predictions: Tensor<B, 4>,
        targets: Tensor<B, 4>,
        reduction: Reduction,
    ) -> Tensor<B, 1> {
        let loss = self.forward_no_reduction(predictions, targets);
        match reduction {
            Reduction::Mean | Reduction::Auto => loss.mean(),
            Reduction::Sum => loss.sum(),
        }
    }

    /// Compute the criterion on the input tensor without reduction.
    ///
    /// # Shapes
    ///
    /// - predictions: `[batch_size, channels, height, width]`
    /// - targets: `[batch_size, channels, height, width]`
    /// - output: `[batch_size, channels, height, width]`
    pub fn forward_no_reduction<B: Backend>(
        &self,
        predictions: Tensor<B, 4>,
        targets: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        self.assertions(&predictions, &targets);

        let log_p = predictions.clone().log().clamp_min(self.log_min);
        let log_not_p = predictions.neg().add_scalar(1.0).log().clamp_min(self.log_min);
        let not_targets = targets.clone().neg().add_scalar(1.0);

        (targets * log_p + not_targets * log_not_p).neg()
    }

    fn assertions<B: Backend>(&self, predictions: &Tensor<B, 4>, targets: &Tensor<B, 4>) {
        let pred_dims = predictions.dims();
        let target_dims = targets.dims();
        assert_eq!(
            pred_dims, target_dims,
            "Shape of predictions ({pred_dims:?}) must match targets ({target_dims:?})"
        );
    }
}

impl<B: Backend> SegmentationLoss<B> for BceLoss {
    fn loss(&self, predictions: Tensor<B, 4>, targets: Tensor<B, 4>) -> Tensor<B, 1> {
        self.forward(predictions, targets, Reduction::Mean)
    }
}
