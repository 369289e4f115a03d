//! Differentiable patch F1.
//!
//! The competition metric labels a patch as road when its mean exceeds a
//! cutoff, which has no useful gradient. Here both maps are reduced to patch
//! means and passed through a [`SoftThreshold`], and F1 is formed from soft
//! counts:
//!
//! ```text
//! tp = Σ p·t    fp = Σ p·(1 - t)    fn = Σ (1 - p)·t
//! loss = 1 - 2tp / (2tp + fp + fn + eps)
//! ```

use burn::{
    config::Config,
    tensor::{backend::Backend, Tensor},
};
use roadseg_util::{patch_means, PatchConfig, PatchSizePolicy};

use crate::{
    surrogate::{SoftThreshold, Surrogate},
    SegmentationLoss,
};

/// Configuration for creating a [differentiable patch F1 loss](DiffPatchF1Loss).
#[derive(Config, Debug)]
pub struct DiffPatchF1LossConfig {
    /// Side length of a square patch. Default: 16
    #[config(default = 16)]
    pub patch_size: usize,
    /// Effective patch size as a function of the input width, as for the
    /// metric grid. Default: fixed
    #[config(default = "PatchSizePolicy::Fixed")]
    pub policy: PatchSizePolicy,
    /// Patch mean at which the surrogate switches from background to road.
    /// Default: 0.25
    #[config(default = 0.25)]
    pub threshold: f64,
    /// Added to the F1 denominator. Default: 1e-7
    #[config(default = 1e-7)]
    pub eps: f64,
    /// Relaxation of the patch threshold. Default: sigmoid with sharpness 50
    #[config(default = "Surrogate::Sigmoid(50.0)")]
    pub surrogate: Surrogate,
}

impl DiffPatchF1LossConfig {
    /// Patch grid and threshold taken from a metric patch configuration.
    pub fn from_patch_config(patch: &PatchConfig) -> Self {
        Self::new()
            .with_patch_size(patch.patch_size)
            .with_policy(patch.policy.clone())
            .with_threshold(patch.cutoff)
    }

    /// Initialize the loss with the configured surrogate.
    pub fn init(&self) -> DiffPatchF1Loss<Surrogate> {
        self.surrogate.assertions();
        self.init_with(self.surrogate.clone())
    }

    /// Initialize the loss with a custom surrogate.
    pub fn init_with<S: SoftThreshold>(&self, surrogate: S) -> DiffPatchF1Loss<S> {
        self.assertions();
        DiffPatchF1Loss {
            patch_size: self.patch_size,
            policy: self.policy.clone(),
            threshold: self.threshold,
            eps: self.eps,
            surrogate,
        }
    }

    fn assertions(&self) {
        assert!(self.patch_size > 0, "Patch size must be positive");
        if matches!(self.policy, PatchSizePolicy::ResolutionDependent(_)) {
            assert!(
                self.patch_size >= 2,
                "Resolution dependent patches need a patch size of at least 2"
            );
        }
        assert!(
            (0.0..=1.0).contains(&self.threshold),
            "Threshold must lie in [0, 1], got {}",
            self.threshold
        );
        assert!(
            self.eps > 0.0,
            "Epsilon for DiffPatchF1Loss must be positive, got {}",
            self.eps
        );
    }
}

/// Soft patch F1 loss for probability maps.
#[derive(Clone, Debug)]
pub struct DiffPatchF1Loss<S = Surrogate> {
    pub patch_size: usize,
    pub policy: PatchSizePolicy,
    pub threshold: f64,
    pub eps: f64,
    pub surrogate: S,
}

impl Default for DiffPatchF1Loss {
    fn default() -> Self {
        DiffPatchF1LossConfig::new().init()
    }
}

impl<S: SoftThreshold> DiffPatchF1Loss<S> {
    /// Patch size used for maps of the given width.
    pub fn effective_patch_size(&self, width: usize) -> usize {
        self.policy.patch_size_for(self.patch_size, width)
    }

    /// Soft road scores of every patch.
    ///
    /// # Shapes
    ///
    /// - map: `[batch_size, channels, height, width]`
    /// - output: `[batch_size, channels, height / s, width / s]` with `s` the
    ///   effective patch size
    pub fn soft_patch_scores<B: Backend>(&self, map: Tensor<B, 4>) -> Tensor<B, 4> {
        let [_, _, _, width] = map.dims();
        let patch_size = self.effective_patch_size(width);
        self.surrogate.apply(patch_means(map, patch_size), self.threshold)
    }

    /// Loss over all patches of the batch, as the metric pools them.
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
    ) -> Tensor<B, 1> {
        self.assertions(&predictions, &targets);

        let predicted = self.soft_patch_scores(predictions).reshape([1, -1]);
        let actual = self.soft_patch_scores(targets).reshape([1, -1]);

        self.soft_f1_loss(predicted, actual).reshape([1])
    }

    /// One loss per sample.
    ///
    /// # Shapes
    ///
    /// - predictions: `[batch_size, channels, height, width]`
    /// - targets: `[batch_size, channels, height, width]`
    /// - output: `[batch_size]`
    pub fn forward_no_reduction<B: Backend>(
        &self,
        predictions: Tensor<B, 4>,
        targets: Tensor<B, 4>,
    ) -> Tensor<B, 1> {
        self.assertions(&predictions, &targets);
        let [batch_size, ..] = predictions.dims();

        let predicted = self.soft_patch_scores(predictions).reshape([batch_size as i32, -1]);
        let actual = self.soft_patch_scores(targets).reshape([batch_size as i32, -1]);

        self.soft_f1_loss(predicted, actual).reshape([batch_size])
    }

    /// `1 - soft F1` of each row, `[rows, patches] -> [rows, 1]`.
    fn soft_f1_loss<B: Backend>(
        &self,
        predicted: Tensor<B, 2>,
        actual: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        let not_predicted = predicted.clone().neg().add_scalar(1.0);
        let not_actual = actual.clone().neg().add_scalar(1.0);

        let true_positives = (predicted.clone() * actual.clone()).sum_dim(1);
        let false_positives = (predicted * not_actual).sum_dim(1);
        let false_negatives = (not_predicted * actual).sum_dim(1);

        let doubled = true_positives.mul_scalar(2.0);
        let denominator = doubled.clone() + false_positives + false_negatives;
        let f1 = doubled / denominator.add_scalar(self.eps);

        f1.neg().add_scalar(1.0)
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

impl<B: Backend, S: SoftThreshold> SegmentationLoss<B> for DiffPatchF1Loss<S> {
    fn loss(&self, predictions: Tensor<B, 4>, targets: Tensor<B, 4>) -> Tensor<B, 1> {
        self.forward(predictions, targets)
    }
}
