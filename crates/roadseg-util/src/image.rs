//! Loading of prediction and ground-truth masks from PNG files.

use std::path::{Path, PathBuf};

use burn::{prelude::*, tensor::TensorData};
use walkdir::WalkDir;

use crate::error::{RoadSegError, RoadSegResult};

/// Loads a mask as a `[height, width]` tensor with values in `[0, 1]`.
///
/// Colour images are converted to luma first.
pub fn load_mask<B: Backend, P: AsRef<Path>>(
    path: P,
    device: &B::Device,
) -> RoadSegResult<Tensor<B, 2>> {
    let path = path.as_ref();
    let img = ::image::open(path).map_err(|source| RoadSegError::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;

    let luma = img.to_luma8();
    let (width, height) = luma.dimensions();
    let values: Vec<f32> = luma
        .into_raw()
        .into_iter()
        .map(|value| f32::from(value) / 255.0)
        .collect();

    Ok(Tensor::from_data(
        TensorData::new(values, [height as usize, width as usize]),
        device,
    ))
}

/// PNG files directly inside `dir`, sorted by file name.
pub fn list_masks<P: AsRef<Path>>(dir: P) -> RoadSegResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut paths = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|source| RoadSegError::DirectoryRead {
            path: dir.to_path_buf(),
            source,
        })?;
        let is_png = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
        if entry.file_type().is_file() && is_png {
            paths.push(entry.into_path());
        }
    }

    if paths.is_empty() {
        return Err(RoadSegError::NoImages {
            path: dir.to_path_buf(),
        });
    }
    paths.sort();
    Ok(paths)
}
