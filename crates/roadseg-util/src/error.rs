//! Error types shared by the road segmentation crates.
//!
//! Shape and tiling violations are programmer errors in the training path, but
//! the functional metric API surfaces them as values so that evaluation drivers
//! can report which file was at fault.

use std::path::PathBuf;

use thiserror::Error;

/// The error type for road segmentation operations.
#[derive(Error, Debug)]
pub enum RoadSegError {
    /// The map cannot be tiled exactly by the patch size.
    #[error("dimensions {height}x{width} are not divisible by patch size {patch_size}")]
    IndivisibleDimensions {
        /// Map height in pixels.
        height: usize,
        /// Map width in pixels.
        width: usize,
        /// Effective patch size that was requested.
        patch_size: usize,
    },

    /// Predictions and targets disagree in shape.
    #[error("shape mismatch: predictions {predictions:?}, targets {targets:?}")]
    ShapeMismatch {
        /// Shape of the prediction tensor.
        predictions: Vec<usize>,
        /// Shape of the target tensor.
        targets: Vec<usize>,
    },

    /// Configuration parameters are out of range or inconsistent.
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration {
        /// The reason why the configuration is invalid.
        reason: String,
    },

    /// Reading tensor data back to the host failed.
    #[error("failed to convert tensor to data: {reason}")]
    TensorConversion {
        /// Description of the conversion failure.
        reason: String,
    },

    /// Opening or decoding an image failed.
    #[error("failed to open image at '{path}'")]
    ImageLoad {
        /// The image file path that failed to open.
        path: PathBuf,
        /// The underlying image processing error.
        #[source]
        source: image::ImageError,
    },

    /// Walking a directory failed.
    #[error("failed to read directory: {path}")]
    DirectoryRead {
        /// The directory path that failed to read.
        path: PathBuf,
        /// The underlying walk error.
        #[source]
        source: walkdir::Error,
    },

    /// A directory contained no mask images.
    #[error("no png images found in: {path}")]
    NoImages {
        /// The directory that was searched.
        path: PathBuf,
    },

    /// A prediction has no ground truth file with the same name.
    #[error("no ground truth found for prediction: {path}")]
    MissingCounterpart {
        /// The prediction file without a partner.
        path: PathBuf,
    },

    /// The file name carries no numeric image id.
    #[error("no image id in file name: {path}")]
    InvalidImageId {
        /// The offending path.
        path: PathBuf,
    },

    /// Writing the submission CSV failed.
    #[error("failed to write submission record")]
    Csv(#[from] csv::Error),

    /// Plain I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A specialized `Result` type for road segmentation operations.
pub type RoadSegResult<T> = Result<T, RoadSegError>;
