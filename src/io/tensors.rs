//! SafeTensors read/write helpers shared by model and dataset files

use crate::{Error, Result};
use safetensors::tensor::{Dtype, TensorView};
use safetensors::SafeTensors;
use std::collections::HashMap;
use std::path::Path;

/// An owned tensor ready to be written
pub(crate) struct OwnedTensor {
    pub name: String,
    pub dtype: Dtype,
    pub shape: Vec<usize>,
    pub bytes: Vec<u8>,
}

impl OwnedTensor {
    /// F32 tensor from values in standard (row-major) order
    pub fn f32<'a>(
        name: impl Into<String>,
        shape: &[usize],
        values: impl IntoIterator<Item = &'a f32>,
    ) -> Self {
        let values: Vec<f32> = values.into_iter().copied().collect();
        Self {
            name: name.into(),
            dtype: Dtype::F32,
            shape: shape.to_vec(),
            bytes: bytemuck::cast_slice(&values).to_vec(),
        }
    }

    pub fn i64(name: impl Into<String>, values: &[i64]) -> Self {
        Self {
            name: name.into(),
            dtype: Dtype::I64,
            shape: vec![values.len()],
            bytes: bytemuck::cast_slice(values).to_vec(),
        }
    }
}

/// Serialize tensors (sorted by name) with optional string metadata
pub(crate) fn write_tensors(
    path: &Path,
    tensors: &[OwnedTensor],
    metadata: Option<HashMap<String, String>>,
) -> Result<()> {
    let views = tensors
        .iter()
        .map(|t| {
            TensorView::new(t.dtype, t.shape.clone(), &t.bytes)
                .map(|view| (t.name.as_str(), view))
                .map_err(|e| Error::SafeTensors(format!("tensor {}: {e}", t.name)))
        })
        .collect::<Result<Vec<_>>>()?;

    let bytes = safetensors::serialize(views, metadata)
        .map_err(|e| Error::SafeTensors(format!("serialization failed: {e}")))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Raw file contents plus its string metadata
pub(crate) fn read_file(path: &Path) -> Result<(Vec<u8>, HashMap<String, String>)> {
    let data = std::fs::read(path).map_err(|e| {
        Error::SafeTensors(format!("Failed to read {}: {e}", path.display()))
    })?;
    let (_, st_metadata) = SafeTensors::read_metadata(&data).map_err(|e| {
        Error::SafeTensors(format!("Failed to parse {}: {e}", path.display()))
    })?;
    let metadata = st_metadata.metadata().clone().unwrap_or_default();
    Ok((data, metadata))
}

pub(crate) fn deserialize(data: &[u8]) -> Result<SafeTensors<'_>> {
    SafeTensors::deserialize(data).map_err(|e| Error::SafeTensors(format!("parsing failed: {e}")))
}

/// Shape and values of an F32 tensor
pub(crate) fn read_f32(st: &SafeTensors<'_>, name: &str) -> Result<(Vec<usize>, Vec<f32>)> {
    let view = st
        .tensor(name)
        .map_err(|e| Error::SafeTensors(format!("missing tensor {name}: {e}")))?;
    if view.dtype() != Dtype::F32 {
        return Err(Error::SafeTensors(format!(
            "tensor {name} has dtype {:?}, expected F32",
            view.dtype()
        )));
    }
    Ok((
        view.shape().to_vec(),
        bytemuck::pod_collect_to_vec::<u8, f32>(view.data()),
    ))
}

/// Values of a 1-D integer tensor, widened to `i64`
pub(crate) fn read_int(st: &SafeTensors<'_>, name: &str) -> Result<Vec<i64>> {
    let view = st
        .tensor(name)
        .map_err(|e| Error::SafeTensors(format!("missing tensor {name}: {e}")))?;
    if view.shape().len() != 1 {
        return Err(Error::shape_mismatch(
            format!("tensor {name} rank"),
            1,
            view.shape().len(),
        ));
    }
    let data = view.data();
    let values = match view.dtype() {
        Dtype::I64 => bytemuck::pod_collect_to_vec::<u8, i64>(data),
        Dtype::I32 => bytemuck::pod_collect_to_vec::<u8, i32>(data)
            .into_iter()
            .map(i64::from)
            .collect(),
        Dtype::U32 => bytemuck::pod_collect_to_vec::<u8, u32>(data)
            .into_iter()
            .map(i64::from)
            .collect(),
        Dtype::U8 => data.iter().map(|&b| i64::from(b)).collect(),
        other => {
            return Err(Error::SafeTensors(format!(
                "tensor {name} has dtype {other:?}, expected an integer type"
            )))
        }
    };
    Ok(values)
}
