//! Patch aggregation for road masks and probability maps.
//!
//! A map of shape `[N, C, H, W]` is tiled into non-overlapping square patches,
//! every patch is reduced to its mean intensity and the mean is compared
//! against a cutoff to decide whether the patch shows road:
//!
//! ```text
//! label[n, c, i, j] = mean(map[n, c, i*s..(i+1)*s, j*s..(j+1)*s]) > cutoff
//! ```
//!
//! Averaging is done with reshapes and `mean_dim`, so [`patch_means`] is
//! differentiable and is shared by the hard metrics and the soft losses.

use burn::{prelude::*, tensor::Bool};

use crate::error::{RoadSegError, RoadSegResult};

/// How the effective patch size follows the input resolution.
#[derive(Config, Debug, PartialEq, Eq)]
pub enum PatchSizePolicy {
    /// Always use the configured patch size.
    Fixed,
    /// Use the configured size when the width exceeds the given number of
    /// pixels and half of it otherwise (for crops and downscaled inputs).
    ResolutionDependent(usize),
}

impl PatchSizePolicy {
    /// Patch size used for an input of the given width when `patch_size` is
    /// configured.
    pub fn patch_size_for(&self, patch_size: usize, width: usize) -> usize {
        match self {
            Self::Fixed => patch_size,
            Self::ResolutionDependent(min_width) if width > *min_width => patch_size,
            Self::ResolutionDependent(_) => patch_size / 2,
        }
    }
}

/// Configuration of the patch grid.
#[derive(Config, Debug)]
pub struct PatchConfig {
    /// Side length of a square patch in pixels.
    #[config(default = 16)]
    pub patch_size: usize,
    /// A patch is labelled road when its mean is strictly greater than this.
    #[config(default = 0.25)]
    pub cutoff: f64,
    /// Policy selecting the effective patch size from the input width.
    #[config(default = "PatchSizePolicy::Fixed")]
    pub policy: PatchSizePolicy,
}

impl PatchConfig {
    /// Checks that the parameters describe a usable grid.
    pub fn validate(&self) -> RoadSegResult<()> {
        if self.patch_size == 0 {
            return Err(RoadSegError::InvalidConfiguration {
                reason: "patch size must be positive".to_owned(),
            });
        }
        if !(0.0..=1.0).contains(&self.cutoff) {
            return Err(RoadSegError::InvalidConfiguration {
                reason: format!("cutoff must lie in [0, 1], got {}", self.cutoff),
            });
        }
        if matches!(self.policy, PatchSizePolicy::ResolutionDependent(_)) && self.patch_size < 2 {
            return Err(RoadSegError::InvalidConfiguration {
                reason: "resolution dependent patches need a patch size of at least 2".to_owned(),
            });
        }
        Ok(())
    }

    /// Patch size used for an input of the given width.
    pub fn effective_patch_size(&self, width: usize) -> usize {
        self.policy.patch_size_for(self.patch_size, width)
    }

    /// Validates the configuration against a map size and returns the
    /// effective patch size.
    pub fn check_dims(&self, height: usize, width: usize) -> RoadSegResult<usize> {
        self.validate()?;
        let patch_size = self.effective_patch_size(width);
        if patch_size != self.patch_size {
            tracing::debug!(width, patch_size, "using reduced patch size");
        }
        if height % patch_size != 0 || width % patch_size != 0 {
            return Err(RoadSegError::IndivisibleDimensions {
                height,
                width,
                patch_size,
            });
        }
        Ok(patch_size)
    }
}

/// Mean intensity of every patch.
///
/// # Shapes
///
/// - map: `[batch_size, channels, height, width]`
/// - output: `[batch_size, channels, height / patch_size, width / patch_size]`
///
/// # Panics
///
/// If `patch_size` is zero or does not divide both spatial dimensions.
pub fn patch_means<B: Backend>(map: Tensor<B, 4>, patch_size: usize) -> Tensor<B, 4> {
    let [batch_size, channels, height, width] = map.dims();
    assert_tiles(height, width, patch_size);

    let rows = height / patch_size;
    let cols = width / patch_size;

    map.reshape([batch_size, channels, rows, patch_size, cols, patch_size])
        .mean_dim(5)
        .mean_dim(3)
        .reshape([batch_size, channels, rows, cols])
}

/// Boolean road grid of a map, `patch_means(map) > cutoff`.
pub fn patch_labels<B: Backend>(
    map: Tensor<B, 4>,
    config: &PatchConfig,
) -> RoadSegResult<Tensor<B, 4, Bool>> {
    let [_, _, height, width] = map.dims();
    let patch_size = config.check_dims(height, width)?;
    Ok(patch_means(map, patch_size).greater_elem(config.cutoff))
}

/// Flat per-patch labels of single-channel masks, ordered like
/// [`extract_patches`].
pub fn patch_label_vector<B: Backend>(
    masks: Tensor<B, 4>,
    config: &PatchConfig,
) -> RoadSegResult<Tensor<B, 1, Bool>> {
    let labels = patch_labels(masks, config)?;
    let num_patches = labels.shape().num_elements();
    Ok(labels.reshape([num_patches]))
}

/// Cuts images into patches.
///
/// Patches of the first image come first, each image in row-major patch order.
///
/// # Shapes
///
/// - images: `[batch_size, channels, height, width]`
/// - output: `[batch_size * rows * cols, channels, patch_size, patch_size]`
pub fn extract_patches<B: Backend>(images: Tensor<B, 4>, patch_size: usize) -> Tensor<B, 4> {
    let [batch_size, channels, height, width] = images.dims();
    assert_tiles(height, width, patch_size);

    let rows = height / patch_size;
    let cols = width / patch_size;

    images
        .reshape([batch_size, channels, rows, patch_size, cols, patch_size])
        .permute([0, 2, 4, 1, 3, 5])
        .reshape([batch_size * rows * cols, channels, patch_size, patch_size])
}

/// Per-channel mean followed by per-channel population variance of every patch.
///
/// # Shapes
///
/// - patches: `[num_patches, channels, patch_size, patch_size]`
/// - output: `[num_patches, 2 * channels]`
pub fn patch_features<B: Backend>(patches: Tensor<B, 4>) -> Tensor<B, 2> {
    let [num_patches, channels, height, width] = patches.dims();
    let (variance, mean) = patches
        .reshape([num_patches, channels, height * width])
        .var_mean_bias(2);

    Tensor::cat(vec![mean, variance], 1).reshape([num_patches, 2 * channels])
}

/// Lifts a single `[H, W]` map to `[1, 1, H, W]`.
pub fn lift_map<B: Backend>(map: Tensor<B, 2>) -> Tensor<B, 4> {
    map.unsqueeze::<4>()
}

/// Reads a `[rows, cols]` label grid back to the host.
pub fn grid_rows<B: Backend>(grid: Tensor<B, 2, Bool>) -> RoadSegResult<Vec<Vec<bool>>> {
    let [_, cols] = grid.dims();
    let values = grid
        .float()
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|err| RoadSegError::TensorConversion {
            reason: format!("{err:?}"),
        })?;

    if cols == 0 {
        return Ok(Vec::new());
    }
    Ok(values
        .chunks(cols)
        .map(|row| row.iter().map(|&value| value > 0.5).collect())
        .collect())
}

fn assert_tiles(height: usize, width: usize, patch_size: usize) {
    assert!(patch_size > 0, "Patch size must be positive");
    assert!(
        height % patch_size == 0 && width % patch_size == 0,
        "Map of {height}x{width} cannot be tiled by patches of size {patch_size}"
    );
}
