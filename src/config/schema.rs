//! YAML schema for declarative pruning runs

use crate::pipeline::PipelineConfig;
use crate::prune::{NormType, PruneRatio};
use crate::train::FinetuneConfig;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Deserialize a bool from either a YAML boolean (`true`) or a quoted string (`"true"`).
fn deserialize_bool_lenient<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        Str(String),
    }

    match BoolOrString::deserialize(deserializer)? {
        BoolOrString::Bool(b) => Ok(b),
        BoolOrString::Str(s) => match s.to_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected 'true' or 'false', got '{other}'"
            ))),
        },
    }
}

fn default_true() -> bool {
    true
}

fn default_batch_size() -> usize {
    64
}

fn default_bits_per_element() -> u32 {
    32
}

/// Complete pruning specification
///
/// ```yaml
/// model: models/vgg.safetensors
/// data:
///   train: data/train.safetensors
///   test: data/test.safetensors
///   batch_size: 64
/// prune:
///   ratio: [0.3, 0.5, 0.5]
///   norm: l2
/// finetune:
///   enabled: true
///   epochs: 5
/// output: models/vgg-pruned.safetensors
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PruneSpec {
    /// Pretrained model (SafeTensors)
    pub model: PathBuf,

    pub data: DataSpec,

    pub prune: PruneSection,

    #[serde(default)]
    pub finetune: FinetuneSpec,

    /// Where to write the pruned model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// Storage width used for model size reporting
    #[serde(default = "default_bits_per_element")]
    pub bits_per_element: u32,
}

/// Dataset locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSpec {
    /// Training set, needed only for fine-tuning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train: Option<PathBuf>,

    /// Evaluation set
    pub test: PathBuf,

    /// Evaluation batch size
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

/// Pruning parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PruneSection {
    /// Scalar for every pair, or one value per pair
    pub ratio: PruneRatio,

    #[serde(default)]
    pub norm: NormType,

    #[serde(
        default = "default_true",
        deserialize_with = "deserialize_bool_lenient"
    )]
    pub sort_channels: bool,
}

/// Fine-tuning section; disabled unless `enabled: true`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinetuneSpec {
    #[serde(default, deserialize_with = "deserialize_bool_lenient")]
    pub enabled: bool,

    #[serde(flatten)]
    pub params: FinetuneConfig,
}

impl Default for FinetuneSpec {
    fn default() -> Self {
        Self {
            enabled: false,
            params: FinetuneConfig::default(),
        }
    }
}

impl PruneSpec {
    /// Pipeline settings described by this spec
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            ratio: self.prune.ratio.clone(),
            norm: self.prune.norm,
            sort_channels: self.prune.sort_channels,
            eval_batch_size: self.data.batch_size,
            bits_per_element: self.bits_per_element,
            finetune: self
                .finetune
                .enabled
                .then(|| self.finetune.params.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_spec_defaults() {
        let yaml = r"
model: m.safetensors
data:
  test: test.safetensors
prune:
  ratio: 0.5
";
        let spec: PruneSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.prune.ratio, PruneRatio::Uniform(0.5));
        assert_eq!(spec.prune.norm, NormType::L2);
        assert!(spec.prune.sort_channels);
        assert!(!spec.finetune.enabled);
        assert_eq!(spec.data.batch_size, 64);
        assert_eq!(spec.bits_per_element, 32);
        assert!(spec.output.is_none());
        assert!(spec.pipeline_config().finetune.is_none());
    }

    #[test]
    fn test_full_spec() {
        let yaml = r#"
model: m.safetensors
data:
  train: train.safetensors
  test: test.safetensors
  batch_size: 16
prune:
  ratio: [0.1, 0.2, 0.3]
  norm: l1
  sort_channels: "false"
finetune:
  enabled: "true"
  epochs: 3
  lr: 0.02
  seed: 7
output: out.safetensors
bits_per_element: 8
"#;
        let spec: PruneSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.prune.ratio, PruneRatio::PerLayer(vec![0.1, 0.2, 0.3]));
        assert_eq!(spec.prune.norm, NormType::L1);
        assert!(!spec.prune.sort_channels);
        assert!(spec.finetune.enabled);
        assert_eq!(spec.finetune.params.epochs, 3);
        assert_eq!(spec.finetune.params.seed, 7);
        assert_eq!(spec.finetune.params.momentum, 0.9);

        let pipeline = spec.pipeline_config();
        assert_eq!(pipeline.eval_batch_size, 16);
        assert_eq!(pipeline.bits_per_element, 8);
        assert_eq!(pipeline.finetune.map(|f| f.lr), Some(0.02));
    }

    #[test]
    fn test_lenient_bool_rejects_garbage() {
        let yaml = r#"
model: m.safetensors
data:
  test: t.safetensors
prune:
  ratio: 0.5
  sort_channels: "maybe"
"#;
        assert!(serde_yaml::from_str::<PruneSpec>(yaml).is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let yaml = r"
model: m.safetensors
data:
  test: t.safetensors
prune:
  ratio: [0.25, 0.5]
";
        let spec: PruneSpec = serde_yaml::from_str(yaml).unwrap();
        let text = serde_yaml::to_string(&spec).unwrap();
        let back: PruneSpec = serde_yaml::from_str(&text).unwrap();
        assert_eq!(spec, back);
    }
}
