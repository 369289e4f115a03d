//! Blend of a pixel-wise loss with the differentiable patch F1.

use burn::{
    config::Config,
    tensor::{backend::Backend, Tensor},
};

use crate::{
    bce::BceLoss,
    patch_f1::{DiffPatchF1Loss, DiffPatchF1LossConfig},
    surrogate::{SoftThreshold, Surrogate},
    SegmentationLoss,
};

/// Configuration for creating a [mixed patch F1 loss](MixedPatchF1Loss).
#[derive(Config, Debug)]
pub struct MixedPatchF1LossConfig {
    /// Share of the patch F1 term. Default: 0.4
    #[config(default = 0.4)]
    pub weight: f64,
    /// Patch F1 term.
    #[config(default = "DiffPatchF1LossConfig::new()")]
    pub patch_f1: DiffPatchF1LossConfig,
}

impl MixedPatchF1LossConfig {
    /// Initialize the mix around `base`.
    pub fn init<L>(&self, base: L) -> MixedPatchF1Loss<L> {
        self.assertions();
        MixedPatchF1Loss {
            base,
            patch_f1: self.patch_f1.init(),
            weight: self.weight,
        }
    }

    /// Initialize the mix around `base` with a custom surrogate.
    pub fn init_with<L, S: SoftThreshold>(
        &self,
        base: L,
        surrogate: S,
    ) -> MixedPatchF1Loss<L, S> {
        self.assertions();
        MixedPatchF1Loss {
            base,
            patch_f1: self.patch_f1.init_with(surrogate),
            weight: self.weight,
        }
    }

    /// The usual training objective: binary cross-entropy plus patch F1.
    pub fn init_bce(&self) -> MixedPatchF1Loss<BceLoss> {
        self.init(BceLoss::new())
    }

    fn assertions(&self) {
        assert!(
            (0.0..=1.0).contains(&self.weight),
            "Weight of the patch F1 term must lie in [0, 1], got {}",
            self.weight
        );
    }
}

/// `(1 - w) * base + w * patch_f1`.
#[derive(Clone, Debug)]
pub struct MixedPatchF1Loss<L, S = Surrogate> {
    pub base: L,
    pub patch_f1: DiffPatchF1Loss<S>,
    pub weight: f64,
}

impl<L, S: SoftThreshold> MixedPatchF1Loss<L, S> {
    /// Compute the blended loss.
    ///
    /// At weight 0 or 1 only the selected term is evaluated and returned as is.
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
    ) -> Tensor<B, 1>
    where
        L: SegmentationLoss<B>,
    {
        if self.weight <= 0.0 {
            return self.base.loss(predictions, targets);
        }
        if self.weight >= 1.0 {
            return self.patch_f1.forward(predictions, targets);
        }

        let base = self.base.loss(predictions.clone(), targets.clone());
        let patch_f1 = self.patch_f1.forward(predictions, targets);
        base.mul_scalar(1.0 - self.weight) + patch_f1.mul_scalar(self.weight)
    }
}

impl<B: Backend, L: SegmentationLoss<B>, S: SoftThreshold> SegmentationLoss<B>
    for MixedPatchF1Loss<L, S>
{
    fn loss(&self, predictions: Tensor<B, 4>, targets: Tensor<B, 4>) -> Tensor<B, 1> {
        self.forward(predictions, targets)
    }
}

#[cfg(test)]
mod tests {
    use burn::tensor::{Distribution, ElementConversion};

    use super::*;
    use crate::{surrogate::PassThrough, tests::TestBackend};

    fn inputs() -> (Tensor<TestBackend, 4>, Tensor<TestBackend, 4>) {
        let device = Default::default();
        let predictions = Tensor::<TestBackend, 4>::random(
            [2, 1, 32, 32],
            Distribution::Uniform(0.01, 0.99),
            &device,
        );
        let targets =
            Tensor::<TestBackend, 4>::random([2, 1, 32, 32], Distribution::Default, &device)
                .greater_elem(0.5)
                .float();
        (predictions, targets)
    }

    fn scalar(loss: Tensor<TestBackend, 1>) -> f32 {
        loss.into_scalar().elem::<f32>()
    }

    fn patch_f1_loss(predictions: Tensor<TestBackend, 4>, targets: Tensor<TestBackend, 4>) -> f32 {
        scalar(DiffPatchF1LossConfig::new().init().forward(predictions, targets))
    }

    #[test]
    fn zero_weight_is_exactly_the_base_loss() {
        let (predictions, targets) = inputs();
        let mixed = MixedPatchF1LossConfig::new().with_weight(0.0).init_bce();

        let expected = scalar(BceLoss::new().loss(predictions.clone(), targets.clone()));
        assert_eq!(scalar(mixed.forward(predictions, targets)), expected);
    }

    #[test]
    fn unit_weight_is_exactly_the_patch_f1_loss() {
        let (predictions, targets) = inputs();
        let mixed = MixedPatchF1LossConfig::new().with_weight(1.0).init_bce();

        let expected = patch_f1_loss(predictions.clone(), targets.clone());
        assert_eq!(scalar(mixed.forward(predictions, targets)), expected);
    }

    #[test]
    fn default_weight_blends_bce_linearly() {
        let (predictions, targets) = inputs();
        let mixed = MixedPatchF1LossConfig::new().init_bce();

        let base = scalar(BceLoss::new().loss(predictions.clone(), targets.clone()));
        let patch_f1 = patch_f1_loss(predictions.clone(), targets.clone());
        let loss = scalar(mixed.loss(predictions, targets));

        assert!((loss - (0.6 * base + 0.4 * patch_f1)).abs() < 1e-4);
    }

    #[test]
    fn patch_f1_base_blends_two_surrogates() {
        // Base: pass-through scores, mixed term: default sigmoid.
        let (predictions, targets) = inputs();
        let base = DiffPatchF1LossConfig::new().init_with(PassThrough);
        let mixed = MixedPatchF1LossConfig::new()
            .with_weight(0.25)
            .init(base.clone());

        let expected = 0.75 * scalar(base.forward(predictions.clone(), targets.clone()))
            + 0.25 * patch_f1_loss(predictions.clone(), targets.clone());
        let loss = scalar(mixed.loss(predictions, targets));

        assert!((loss - expected).abs() < 1e-5);
    }

    #[test]
    fn mixes_nest() {
        let (predictions, targets) = inputs();
        let inner = MixedPatchF1LossConfig::new().with_weight(0.0).init_bce();
        let outer = MixedPatchF1LossConfig::new().with_weight(0.0).init(inner);

        let expected = scalar(BceLoss::new().loss(predictions.clone(), targets.clone()));
        assert_eq!(scalar(outer.loss(predictions, targets)), expected);
    }

    #[test]
    #[should_panic(expected = "must lie in [0, 1]")]
    fn weight_above_one_is_rejected() {
        MixedPatchF1LossConfig::new().with_weight(1.5).init_bce();
    }
}
