//! Dataset persistence as SafeTensors
//!
//! A dataset file holds `images` (F32, `[N, C, H, W]`) and `labels`
//! (1-D integer: I64, I32, U32 or U8). The class count is read from the
//! `num_classes` metadata key when present, otherwise it is one more than
//! the largest label.

use super::tensors::{deserialize, read_f32, read_file, read_int, write_tensors, OwnedTensor};
use crate::data::Dataset;
use crate::{Error, Result};
use ndarray::Array4;
use std::collections::HashMap;
use std::path::Path;

/// Metadata key holding the class count
pub const NUM_CLASSES_KEY: &str = "num_classes";

/// Write `dataset` to `path`
pub fn save_dataset(dataset: &Dataset, path: impl AsRef<Path>) -> Result<()> {
    let images = dataset.images();
    let labels: Vec<i64> = dataset
        .labels()
        .iter()
        .map(|&l| i64::try_from(l))
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| Error::Serialization(format!("label does not fit in i64: {e}")))?;
    let tensors = vec![
        OwnedTensor::f32("images", images.shape(), images.iter()),
        OwnedTensor::i64("labels", &labels),
    ];
    let metadata = HashMap::from([(
        NUM_CLASSES_KEY.to_string(),
        dataset.num_classes().to_string(),
    )]);
    write_tensors(path.as_ref(), &tensors, Some(metadata))
}

/// Read a dataset file
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();
    let (data, metadata) = read_file(path)?;
    let st = deserialize(&data)?;

    let (shape, values) = read_f32(&st, "images")?;
    let &[n, c, h, w] = shape.as_slice() else {
        return Err(Error::shape_mismatch(
            "images rank",
            "[N, C, H, W]",
            &shape,
        ));
    };
    if n == 0 {
        return Err(Error::EmptyDataset(path.display().to_string()));
    }
    let images = Array4::from_shape_vec((n, c, h, w), values)
        .map_err(|e| Error::SafeTensors(format!("images: {e}")))?;

    let labels = read_int(&st, "labels")?
        .into_iter()
        .map(|l| {
            usize::try_from(l)
                .map_err(|_| Error::SafeTensors(format!("negative label {l} in {}", path.display())))
        })
        .collect::<Result<Vec<usize>>>()?;

    let num_classes = match metadata.get(NUM_CLASSES_KEY) {
        Some(v) => v.parse::<usize>().map_err(|e| {
            Error::SafeTensors(format!("invalid {NUM_CLASSES_KEY} metadata '{v}': {e}"))
        })?,
        None => labels.iter().max().map_or(0, |&m| m + 1),
    };
    Dataset::new(images, labels, num_classes)
}
