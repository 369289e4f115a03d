//! Patch-level submission files.
//!
//! The file starts with the header `id,prediction` followed by one row per
//! patch, `{image:03}_{x}_{y},{label}`, where `x` and `y` are the pixel offsets
//! of the patch's top-left corner.

use std::{
    fmt,
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
};

use burn::{prelude::*, tensor::Bool};

use crate::{
    error::{RoadSegError, RoadSegResult},
    patch::grid_rows,
};

/// Header row of every submission file.
pub const SUBMISSION_HEADER: [&str; 2] = ["id", "prediction"];

/// Prediction for a single patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionRecord {
    /// Numeric id of the test image.
    pub image_id: u32,
    /// Column offset of the patch in pixels.
    pub x: usize,
    /// Row offset of the patch in pixels.
    pub y: usize,
    /// Whether the patch was labelled road.
    pub road: bool,
}

impl SubmissionRecord {
    /// The `id` column, e.g. `005_0_16`.
    pub fn id(&self) -> String {
        format!("{:03}_{}_{}", self.image_id, self.x, self.y)
    }

    /// The `prediction` column.
    pub const fn prediction(&self) -> u8 {
        self.road as u8
    }
}

impl fmt::Display for SubmissionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.id(), self.prediction())
    }
}

/// Records of one image, row by row, from a `[rows][cols]` label grid.
pub fn records_from_grid(
    image_id: u32,
    grid: &[Vec<bool>],
    patch_size: usize,
) -> Vec<SubmissionRecord> {
    grid.iter()
        .enumerate()
        .flat_map(|(row, cells)| {
            cells
                .iter()
                .enumerate()
                .map(move |(col, &road)| SubmissionRecord {
                    image_id,
                    x: col * patch_size,
                    y: row * patch_size,
                    road,
                })
        })
        .collect()
}

/// Same as [`records_from_grid`] for a `[rows, cols]` boolean tensor.
pub fn records_from_tensor<B: Backend>(
    image_id: u32,
    grid: Tensor<B, 2, Bool>,
    patch_size: usize,
) -> RoadSegResult<Vec<SubmissionRecord>> {
    Ok(records_from_grid(image_id, &grid_rows(grid)?, patch_size))
}

/// Image id of a test file: the first run of digits in its file name.
///
/// `satimage_5.png` has id 5, `test_144.png` has id 144.
pub fn image_id_from_path(path: &Path) -> RoadSegResult<u32> {
    let invalid = || RoadSegError::InvalidImageId {
        path: path.to_path_buf(),
    };

    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(invalid)?;
    let digits: String = name
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();

    digits.parse().map_err(|_| invalid())
}

/// Streams submission records into a CSV sink.
pub struct SubmissionWriter<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
}

impl<W: Write> SubmissionWriter<W> {
    /// Wraps `inner` and writes the header row.
    pub fn new(inner: W) -> RoadSegResult<Self> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(inner);
        writer.write_record(SUBMISSION_HEADER)?;
        Ok(Self { writer, rows: 0 })
    }

    /// Appends one record.
    pub fn write(&mut self, record: &SubmissionRecord) -> RoadSegResult<()> {
        self.writer
            .write_record([record.id(), record.prediction().to_string()])?;
        self.rows += 1;
        Ok(())
    }

    /// Appends all records of an iterator.
    pub fn write_all<'a, I>(&mut self, records: I) -> RoadSegResult<()>
    where
        I: IntoIterator<Item = &'a SubmissionRecord>,
    {
        records.into_iter().try_for_each(|record| self.write(record))
    }

    /// Number of data rows written so far.
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Flushes and returns the underlying sink.
    pub fn finish(self) -> RoadSegResult<W> {
        self.writer
            .into_inner()
            .map_err(|err| RoadSegError::Io(err.into_error()))
    }
}

/// Writes a complete submission file, creating parent directories.
///
/// Records are written in iteration order. Returns the number of data rows.
pub fn write_submission_file<'a, P, I>(path: P, records: I) -> RoadSegResult<usize>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = &'a SubmissionRecord>,
{
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = SubmissionWriter::new(BufWriter::new(File::create(path)?))?;
    writer.write_all(records)?;
    let rows = writer.rows();
    writer.finish()?.flush()?;

    tracing::info!(path = %path.display(), rows, "submission written");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use burn::tensor::TensorData;

    use super::*;
    use crate::tests::TestBackend;

    #[test]
    fn record_formats_zero_padded_id() {
        let record = SubmissionRecord {
            image_id: 5,
            x: 0,
            y: 16,
            road: true,
        };
        assert_eq!(record.to_string(), "005_0_16,1");
    }

    #[test]
    fn grid_offsets_use_column_for_x_and_row_for_y() {
        let grid = vec![vec![false, true], vec![true, false]];
        let records = records_from_grid(7, &grid, 16);

        let rows: Vec<String> = records.iter().map(ToString::to_string).collect();
        assert_eq!(
            rows,
            vec!["007_0_0,0", "007_16_0,1", "007_0_16,1", "007_16_16,0"]
        );
    }

    #[test]
    fn tensor_grid_produces_same_records() {
        let device = Default::default();
        let grid = Tensor::<TestBackend, 2>::from_data(
            TensorData::from([[0.0, 1.0], [1.0, 0.0]]),
            &device,
        )
        .greater_elem(0.5);

        let from_tensor = records_from_tensor(7, grid, 16).unwrap();
        let from_vec = records_from_grid(7, &[vec![false, true], vec![true, false]], 16);
        assert_eq!(from_tensor, from_vec);
    }

    #[test]
    fn image_id_is_first_digit_run() {
        assert_eq!(
            image_id_from_path(Path::new("test/images/satimage_5.png")).unwrap(),
            5
        );
        assert_eq!(image_id_from_path(Path::new("test_144.png")).unwrap(), 144);
        assert_eq!(image_id_from_path(Path::new("12_b3.png")).unwrap(), 12);
        assert!(matches!(
            image_id_from_path(Path::new("mask.png")),
            Err(RoadSegError::InvalidImageId { .. })
        ));
    }

    #[test]
    fn writer_emits_header_and_rows() {
        let mut writer = SubmissionWriter::new(Vec::new()).unwrap();
        writer
            .write_all(&records_from_grid(5, &[vec![false], vec![true]], 16))
            .unwrap();
        assert_eq!(writer.rows(), 2);

        let bytes = writer.finish().unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "id,prediction\n005_0_0,0\n005_0_16,1\n"
        );
    }

    #[test]
    fn submission_file_is_created_with_parents() {
        let dir: PathBuf = std::env::temp_dir()
            .join(format!("roadseg-submission-{}", std::process::id()))
            .join("nested");
        let path = dir.join("submission.csv");

        let mut records = records_from_grid(1, &[vec![true, false]], 16);
        records.extend(records_from_grid(2, &[vec![false, false]], 16));
        let rows = write_submission_file(&path, &records).unwrap();
        assert_eq!(rows, 4);

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "id,prediction\n001_0_0,1\n001_16_0,0\n002_0_0,0\n002_16_0,0\n"
        );

        fs::remove_dir_all(dir.parent().unwrap()).unwrap();
    }
}
