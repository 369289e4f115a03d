//! Pixel and patch accuracy as Burn training metrics.

use core::marker::PhantomData;

use burn::{
    tensor::backend::Backend,
    train::metric::{
        state::{FormatOptions, NumericMetricState},
        Metric, MetricEntry, MetricMetadata, Numeric,
    },
};
use roadseg_util::PatchConfig;

use crate::{
    functional::{patch_accuracy, pixel_accuracy},
    input::PatchMetricInput,
};

/// Fraction of correctly labelled patches, averaged over batches.
pub struct PatchAccuracyMetric<B: Backend> {
    state: NumericMetricState,
    config: PatchConfig,
    _b: PhantomData<B>,
}

impl<B: Backend> Default for PatchAccuracyMetric<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> PatchAccuracyMetric<B> {
    pub fn new() -> Self {
        Self::with_config(PatchConfig::new())
    }

    pub fn with_config(config: PatchConfig) -> Self {
        Self {
            state: NumericMetricState::default(),
            config,
            _b: PhantomData,
        }
    }
}

impl<B: Backend> Metric for PatchAccuracyMetric<B> {
    type Input = PatchMetricInput<B>;

    fn name(&self) -> String {
        "Patch Accuracy".to_string()
    }

    fn update(&mut self, item: &Self::Input, _metadata: &MetricMetadata) -> MetricEntry {
        let [batch_size, ..] = item.predictions.dims();
        let accuracy = patch_accuracy(item.predictions.clone(), item.targets.clone(), &self.config)
            .unwrap_or_else(|err| panic!("Patch accuracy metric received invalid input: {err}"));

        self.state.update(
            accuracy,
            batch_size,
            FormatOptions::new(self.name()).precision(5),
        )
    }

    fn clear(&mut self) {
        self.state.reset();
    }
}

impl<B: Backend> Numeric for PatchAccuracyMetric<B> {
    fn value(&self) -> f64 {
        self.state.value()
    }
}

/// Fraction of correctly rounded pixels, averaged over batches.
pub struct PixelAccuracyMetric<B: Backend> {
    state: NumericMetricState,
    _b: PhantomData<B>,
}

impl<B: Backend> Default for PixelAccuracyMetric<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> PixelAccuracyMetric<B> {
    pub fn new() -> Self {
        Self {
            state: NumericMetricState::default(),
            _b: PhantomData,
        }
    }
}

impl<B: Backend> Metric for PixelAccuracyMetric<B> {
    type Input = PatchMetricInput<B>;

    fn name(&self) -> String {
        "Pixel Accuracy".to_string()
    }

    fn update(&mut self, item: &Self::Input, _metadata: &MetricMetadata) -> MetricEntry {
        let [batch_size, ..] = item.predictions.dims();
        let accuracy = pixel_accuracy(item.predictions.clone(), item.targets.clone())
            .unwrap_or_else(|err| panic!("Pixel accuracy metric received invalid input: {err}"));

        self.state.update(
            accuracy,
            batch_size,
            FormatOptions::new(self.name()).precision(5),
        )
    }

    fn clear(&mut self) {
        self.state.reset();
    }
}

impl<B: Backend> Numeric for PixelAccuracyMetric<B> {
    fn value(&self) -> f64 {
        self.state.value()
    }
}

#[cfg(test)]
mod tests {
    use burn::tensor::Tensor;

    use super::*;
    use crate::tests::{metadata, TestBackend};

    #[test]
    fn patch_accuracy_of_perfect_batch_is_one() {
        let ones = Tensor::<TestBackend, 4>::ones([2, 1, 16, 16], &Default::default());
        let mut metric = PatchAccuracyMetric::<TestBackend>::new();

        metric.update(&PatchMetricInput::new(ones.clone(), ones), &metadata());
        assert_eq!(metric.value(), 1.0);
    }

    #[test]
    fn pixel_accuracy_tracks_mismatch() {
        let device = Default::default();
        let ones = Tensor::<TestBackend, 4>::ones([1, 1, 4, 4], &device);
        let zeros = Tensor::<TestBackend, 4>::zeros([1, 1, 4, 4], &device);
        let mut metric = PixelAccuracyMetric::<TestBackend>::new();

        metric.update(&PatchMetricInput::new(zeros, ones), &metadata());
        assert_eq!(metric.value(), 0.0);
    }
}
