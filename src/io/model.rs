//! Model persistence as SafeTensors
//!
//! Tensors are named after the layer's position in the feature stack
//! (`features.{i}.weight`, `features.{i}.running_mean`, ...) plus
//! `classifier.weight` and `classifier.bias`. The layer layout is stored
//! as JSON under the `architecture` metadata key, so a pruned model
//! loads back with its reduced widths.

use super::tensors::{deserialize, read_f32, read_file, write_tensors, OwnedTensor};
use crate::nn::{Architecture, BatchNorm2d, Conv2d, Layer, LayerSpec, Linear, MaxPool2d, Model};
use crate::{Error, Result};
use ndarray::{Array1, Array2, Array4};
use safetensors::SafeTensors;
use std::collections::HashMap;
use std::path::Path;

/// Metadata key holding the JSON [`Architecture`]
pub const ARCHITECTURE_KEY: &str = "architecture";

/// Write `model` to `path`
pub fn save_model(model: &Model, path: impl AsRef<Path>) -> Result<()> {
    let mut tensors = Vec::new();
    for (i, layer) in model.features.iter().enumerate() {
        match layer {
            Layer::Conv2d(conv) => {
                tensors.push(OwnedTensor::f32(
                    format!("features.{i}.weight"),
                    conv.weight.shape(),
                    conv.weight.iter(),
                ));
                if let Some(bias) = &conv.bias {
                    tensors.push(OwnedTensor::f32(
                        format!("features.{i}.bias"),
                        bias.shape(),
                        bias.iter(),
                    ));
                }
            }
            Layer::BatchNorm2d(bn) => {
                for (name, values) in [
                    ("weight", &bn.weight),
                    ("bias", &bn.bias),
                    ("running_mean", &bn.running_mean),
                    ("running_var", &bn.running_var),
                ] {
                    tensors.push(OwnedTensor::f32(
                        format!("features.{i}.{name}"),
                        values.shape(),
                        values.iter(),
                    ));
                }
            }
            Layer::Relu | Layer::MaxPool2d(_) => {}
        }
    }
    tensors.push(OwnedTensor::f32(
        "classifier.weight",
        model.classifier.weight.shape(),
        model.classifier.weight.iter(),
    ));
    tensors.push(OwnedTensor::f32(
        "classifier.bias",
        model.classifier.bias.shape(),
        model.classifier.bias.iter(),
    ));

    let architecture = serde_json::to_string(&model.architecture())
        .map_err(|e| Error::Serialization(format!("architecture: {e}")))?;
    let metadata = HashMap::from([(ARCHITECTURE_KEY.to_string(), architecture)]);
    write_tensors(path.as_ref(), &tensors, Some(metadata))
}

/// Read a model written by [`save_model`]
pub fn load_model(path: impl AsRef<Path>) -> Result<Model> {
    let path = path.as_ref();
    let (data, metadata) = read_file(path)?;
    let architecture: Architecture = metadata
        .get(ARCHITECTURE_KEY)
        .ok_or_else(|| {
            Error::SafeTensors(format!(
                "{} has no '{ARCHITECTURE_KEY}' metadata",
                path.display()
            ))
        })
        .and_then(|json| {
            serde_json::from_str(json)
                .map_err(|e| Error::Serialization(format!("architecture: {e}")))
        })?;
    let st = deserialize(&data)?;

    let features = architecture
        .features
        .iter()
        .enumerate()
        .map(|(i, spec)| build_layer(&st, i, spec))
        .collect::<Result<Vec<_>>>()?;

    let head = architecture.classifier;
    let weight = read_array2(&st, "classifier.weight", (head.out_features, head.in_features))?;
    let bias = read_array1(&st, "classifier.bias", head.out_features)?;
    Model::new(features, Linear::from_parts(weight, bias)?)
}

fn build_layer(st: &SafeTensors<'_>, i: usize, spec: &LayerSpec) -> Result<Layer> {
    let name = |suffix: &str| format!("features.{i}.{suffix}");
    Ok(match *spec {
        LayerSpec::Conv2d {
            in_channels,
            out_channels,
            kernel_size: (kh, kw),
            stride,
            padding,
            bias,
        } => {
            let weight = read_array4(st, &name("weight"), (out_channels, in_channels, kh, kw))?;
            let bias = if bias {
                Some(read_array1(st, &name("bias"), out_channels)?)
            } else {
                None
            };
            Layer::Conv2d(Conv2d::from_parts(weight, bias, stride, padding)?)
        }
        LayerSpec::BatchNorm2d { num_features, eps } => Layer::BatchNorm2d(BatchNorm2d::from_parts(
            read_array1(st, &name("weight"), num_features)?,
            read_array1(st, &name("bias"), num_features)?,
            read_array1(st, &name("running_mean"), num_features)?,
            read_array1(st, &name("running_var"), num_features)?,
            eps,
        )?),
        LayerSpec::Relu => Layer::Relu,
        LayerSpec::MaxPool2d {
            kernel_size,
            stride,
        } => Layer::MaxPool2d(MaxPool2d::new(kernel_size, stride)),
    })
}

fn check_shape(name: &str, expected: &[usize], actual: &[usize]) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::shape_mismatch(format!("tensor {name}"), expected, actual))
    }
}

fn read_array1(st: &SafeTensors<'_>, name: &str, len: usize) -> Result<Array1<f32>> {
    let (shape, values) = read_f32(st, name)?;
    check_shape(name, &[len], &shape)?;
    Ok(Array1::from_vec(values))
}

fn read_array2(st: &SafeTensors<'_>, name: &str, dim: (usize, usize)) -> Result<Array2<f32>> {
    let (shape, values) = read_f32(st, name)?;
    check_shape(name, &[dim.0, dim.1], &shape)?;
    Array2::from_shape_vec(dim, values).map_err(|e| Error::SafeTensors(format!("{name}: {e}")))
}

fn read_array4(
    st: &SafeTensors<'_>,
    name: &str,
    dim: (usize, usize, usize, usize),
) -> Result<Array4<f32>> {
    let (shape, values) = read_f32(st, name)?;
    check_shape(name, &[dim.0, dim.1, dim.2, dim.3], &shape)?;
    Array4::from_shape_vec(dim, values).map_err(|e| Error::SafeTensors(format!("{name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::VggConfig;
    use crate::prune::{ChannelPruner, PruneRatio};
    use ndarray::Array4;
    use tempfile::TempDir;

    fn model() -> Model {
        let mut model = Model::vgg(&VggConfig::parse("6,M,8,4", 2, 3).unwrap(), 5).unwrap();
        // Non-trivial BN statistics so the round trip checks them
        if let Layer::BatchNorm2d(bn) = &mut model.features[1] {
            bn.running_mean.fill(0.25);
            bn.running_var.fill(2.0);
        }
        model
    }

    #[test]
    fn test_save_load_preserves_model() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.safetensors");
        let original = model();
        save_model(&original, &path).unwrap();
        let loaded = load_model(&path).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_pruned_widths_survive_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pruned.safetensors");
        let pruned = ChannelPruner::new()
            .prune(&model(), &PruneRatio::Uniform(0.5))
            .unwrap()
            .model;
        save_model(&pruned, &path).unwrap();

        let loaded = load_model(&path).unwrap();
        assert_eq!(loaded.architecture(), pruned.architecture());
        assert_eq!(loaded.parameter_count(), pruned.parameter_count());
        let x = Array4::ones((1, 2, 4, 4));
        assert_eq!(loaded.forward(&x).unwrap(), pruned.forward(&x).unwrap());
    }

    #[test]
    fn test_tensor_names() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.safetensors");
        save_model(&model(), &path).unwrap();
        let data = std::fs::read(&path).unwrap();
        let st = SafeTensors::deserialize(&data).unwrap();
        let mut names: Vec<String> = st.names().into_iter().map(String::from).collect();
        names.sort();
        assert!(names.contains(&"features.0.weight".to_string()));
        assert!(names.contains(&"features.1.running_var".to_string()));
        assert!(names.contains(&"classifier.bias".to_string()));
        assert!(!names.contains(&"features.0.bias".to_string()), "VGG convs have no bias");
    }

    #[test]
    fn test_load_without_architecture_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("raw.safetensors");
        let t = OwnedTensor::f32("classifier.bias", &[1], &[0.0]);
        write_tensors(&path, &[t], None).unwrap();
        let err = load_model(&path).unwrap_err();
        assert!(err.to_string().contains("architecture"));
    }

    #[test]
    fn test_load_detects_shape_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.safetensors");
        let mut original = model();
        save_model(&original, &path).unwrap();

        // Rewrite with a widened classifier while keeping the old metadata
        original.classifier.weight = Array2::zeros((3, 5));
        let (data, metadata) = read_file(&path).unwrap();
        let st = deserialize(&data).unwrap();
        let mut tensors: Vec<OwnedTensor> = st
            .names()
            .into_iter()
            .filter(|n| *n != "classifier.weight")
            .map(|n| {
                let (shape, values) = read_f32(&st, n).unwrap();
                OwnedTensor::f32(n, &shape, values.iter())
            })
            .collect();
        tensors.push(OwnedTensor::f32(
            "classifier.weight",
            &[3, 5],
            original.classifier.weight.iter(),
        ));
        let bad = dir.path().join("bad.safetensors");
        write_tensors(&bad, &tensors, Some(metadata)).unwrap();

        assert!(matches!(
            load_model(&bad),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_model("/nonexistent/model.safetensors").is_err());
    }
}
