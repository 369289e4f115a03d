//! Patch F1 as a Burn training metric.
//!
//! Confusion counts are pooled over the epoch, so the reported value is the
//! F1 of all patches seen since the last `clear`, like the offline score.

use core::marker::PhantomData;

use burn::{
    tensor::backend::Backend,
    train::metric::{Metric, MetricEntry, MetricMetadata, Numeric},
};

use crate::{
    confusion::PatchConfusion,
    functional::{patch_confusion, PatchMetricConfig},
    input::PatchMetricInput,
};

/// Epoch-level patch F1.
#[derive(Debug, Clone)]
pub struct PatchF1Metric<B: Backend> {
    config: PatchMetricConfig,
    state: PatchConfusion,
    _b: PhantomData<B>,
}

impl<B: Backend> Default for PatchF1Metric<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> PatchF1Metric<B> {
    /// Patch F1 with the default 16 pixel patches and 0.25 cutoff.
    pub fn new() -> Self {
        Self::with_config(PatchMetricConfig::new())
    }

    /// Patch F1 with a custom grid and binarization threshold.
    pub fn with_config(config: PatchMetricConfig) -> Self {
        Self {
            config,
            state: PatchConfusion::default(),
            _b: PhantomData,
        }
    }
}

impl<B: Backend> Metric for PatchF1Metric<B> {
    type Input = PatchMetricInput<B>;

    fn name(&self) -> String {
        "Patch F1".to_string()
    }

    fn update(&mut self, item: &Self::Input, _metadata: &MetricMetadata) -> MetricEntry {
        let confusion = patch_confusion(
            item.predictions.clone(),
            item.targets.clone(),
            &self.config,
        )
        .unwrap_or_else(|err| panic!("Patch F1 metric received invalid input: {err}"));
        self.state += confusion;

        let value = self.state.f1();
        MetricEntry::new(self.name(), format!("{value:.5}"), format!("{value:.5}"))
    }

    fn clear(&mut self) {
        self.state = PatchConfusion::default();
    }
}

impl<B: Backend> Numeric for PatchF1Metric<B> {
    fn value(&self) -> f64 {
        self.state.f1()
    }
}
