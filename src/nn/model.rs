//! Sequential convolutional classifier

use super::layer::{Architecture, ClassifierSpec, Layer};
use super::linear::Linear;
use super::pool::{global_avg_pool, global_avg_pool_backward, relu_backward};
use crate::{Error, Result};
use ndarray::{Array2, Array4, ArrayD, ArrayViewMutD};

/// Image classifier: feature layers, global average pooling, linear head.
///
/// Invariant: every layer's input channel count equals the channel count
/// produced by the layer before it, and the last feature layer produces
/// `classifier.in_features()` channels. [`Model::validate`] checks it.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub features: Vec<Layer>,
    pub classifier: Linear,
}

/// Activations saved by [`Model::forward_train`] for the backward pass
pub struct ForwardCache {
    layers: Vec<LayerCache>,
    feature_dim: (usize, usize, usize, usize),
    pooled: Array2<f32>,
}

enum LayerCache {
    Input(Array4<f32>),
    Pool {
        input_dim: (usize, usize, usize, usize),
        indices: Array4<usize>,
    },
}

/// Parameter gradients, ordered like [`Model::parameters_mut`]
#[derive(Debug, Clone)]
pub struct Gradients {
    grads: Vec<ArrayD<f32>>,
}

impl Gradients {
    pub fn len(&self) -> usize {
        self.grads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grads.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArrayD<f32>> {
        self.grads.iter()
    }

    /// L2 norm over all gradient entries
    pub fn global_norm(&self) -> f32 {
        self.grads
            .iter()
            .flat_map(|g| g.iter())
            .map(|v| v * v)
            .sum::<f32>()
            .sqrt()
    }
}

impl From<Vec<ArrayD<f32>>> for Gradients {
    fn from(grads: Vec<ArrayD<f32>>) -> Self {
        Self { grads }
    }
}

impl Model {
    /// Assemble a model, checking the channel chain
    pub fn new(features: Vec<Layer>, classifier: Linear) -> Result<Self> {
        let model = Self {
            features,
            classifier,
        };
        model.validate()?;
        Ok(model)
    }

    /// Check that connected layers agree on channel counts
    pub fn validate(&self) -> Result<()> {
        let mut channels: Option<usize> = None;
        for (i, layer) in self.features.iter().enumerate() {
            match layer {
                Layer::Conv2d(conv) => {
                    if let Some(c) = channels.filter(|&c| c != conv.in_channels()) {
                        return Err(Error::shape_mismatch(
                            format!("features.{i} (Conv2d) input channels"),
                            c,
                            conv.in_channels(),
                        ));
                    }
                    channels = Some(conv.out_channels());
                }
                Layer::BatchNorm2d(bn) => {
                    if let Some(c) = channels.filter(|&c| c != bn.num_features()) {
                        return Err(Error::shape_mismatch(
                            format!("features.{i} (BatchNorm2d) channels"),
                            c,
                            bn.num_features(),
                        ));
                    }
                    channels = Some(bn.num_features());
                }
                Layer::Relu | Layer::MaxPool2d(_) => {}
            }
        }
        if let Some(c) = channels.filter(|&c| c != self.classifier.in_features()) {
            return Err(Error::shape_mismatch(
                "classifier in_features",
                c,
                self.classifier.in_features(),
            ));
        }
        Ok(())
    }

    /// Channel count expected at the model input, if any layer constrains it
    pub fn input_channels(&self) -> usize {
        self.features
            .iter()
            .find_map(|layer| match layer {
                Layer::Conv2d(conv) => Some(conv.in_channels()),
                Layer::BatchNorm2d(bn) => Some(bn.num_features()),
                _ => None,
            })
            .unwrap_or_else(|| self.classifier.in_features())
    }

    pub fn num_classes(&self) -> usize {
        self.classifier.out_features()
    }

    /// Feature indices of every `Conv2d`, in forward order
    pub fn conv_indices(&self) -> Vec<usize> {
        self.features
            .iter()
            .enumerate()
            .filter_map(|(i, layer)| layer.as_conv().map(|_| i))
            .collect()
    }

    /// `(producer, consumer)` feature indices for each adjacent conv pair
    pub fn prunable_pairs(&self) -> Vec<(usize, usize)> {
        self.conv_indices()
            .windows(2)
            .map(|w| (w[0], w[1]))
            .collect()
    }

    /// Learnable parameters; BatchNorm running statistics are not counted
    pub fn parameter_count(&self) -> usize {
        self.features
            .iter()
            .map(Layer::parameter_count)
            .sum::<usize>()
            + self.classifier.parameter_count()
    }

    pub fn architecture(&self) -> Architecture {
        Architecture {
            features: self.features.iter().map(Layer::spec).collect(),
            classifier: ClassifierSpec {
                in_features: self.classifier.in_features(),
                out_features: self.classifier.out_features(),
            },
        }
    }

    /// Logits `(N, num_classes)` for images `(N, C, H, W)`
    pub fn forward(&self, input: &Array4<f32>) -> Result<Array2<f32>> {
        let mut x = input.clone();
        for layer in &self.features {
            x = layer.forward(&x)?;
        }
        self.classifier.forward(&global_avg_pool(&x))
    }

    /// Forward pass that keeps what [`Model::backward`] needs
    pub fn forward_train(&self, input: &Array4<f32>) -> Result<(Array2<f32>, ForwardCache)> {
        let mut caches = Vec::with_capacity(self.features.len());
        let mut x = input.clone();
        for layer in &self.features {
            let next = match layer {
                Layer::MaxPool2d(pool) => {
                    let (y, indices) = pool.forward_with_indices(&x)?;
                    caches.push(LayerCache::Pool {
                        input_dim: x.dim(),
                        indices,
                    });
                    y
                }
                other => {
                    let y = other.forward(&x)?;
                    caches.push(LayerCache::Input(x));
                    y
                }
            };
            x = next;
        }
        let pooled = global_avg_pool(&x);
        let logits = self.classifier.forward(&pooled)?;
        Ok((
            logits,
            ForwardCache {
                layers: caches,
                feature_dim: x.dim(),
                pooled,
            },
        ))
    }

    /// Backpropagate `grad_logits` through the cached forward pass
    pub fn backward(&self, cache: &ForwardCache, grad_logits: &Array2<f32>) -> Result<Gradients> {
        if cache.layers.len() != self.features.len() {
            return Err(Error::shape_mismatch(
                "forward cache layers",
                self.features.len(),
                cache.layers.len(),
            ));
        }

        let head = self.classifier.backward(&cache.pooled, grad_logits)?;
        let mut grad = global_avg_pool_backward(&head.input, cache.feature_dim);
        let mut per_layer: Vec<Vec<ArrayD<f32>>> = vec![Vec::new(); self.features.len()];

        for (i, (layer, saved)) in self.features.iter().zip(&cache.layers).enumerate().rev() {
            grad = match (layer, saved) {
                (Layer::Conv2d(conv), LayerCache::Input(x)) => {
                    let g = conv.backward(x, &grad)?;
                    per_layer[i].push(g.weight.into_dyn());
                    if let Some(bias) = g.bias {
                        per_layer[i].push(bias.into_dyn());
                    }
                    g.input
                }
                (Layer::BatchNorm2d(bn), LayerCache::Input(x)) => {
                    let g = bn.backward(x, &grad)?;
                    per_layer[i].push(g.weight.into_dyn());
                    per_layer[i].push(g.bias.into_dyn());
                    g.input
                }
                (Layer::Relu, LayerCache::Input(x)) => relu_backward(x, &grad),
                (Layer::MaxPool2d(pool), LayerCache::Pool { input_dim, indices }) => {
                    pool.backward(*input_dim, &grad, indices)?
                }
                (layer, _) => {
                    return Err(Error::shape_mismatch(
                        format!("forward cache for features.{i}"),
                        layer.kind(),
                        "mismatched cache entry",
                    ))
                }
            };
        }

        let mut grads: Vec<ArrayD<f32>> = per_layer.into_iter().flatten().collect();
        grads.push(head.weight.into_dyn());
        grads.push(head.bias.into_dyn());
        Ok(Gradients { grads })
    }

    /// Mutable views of every learnable tensor, in a fixed order
    pub fn parameters_mut(&mut self) -> Vec<ArrayViewMutD<'_, f32>> {
        let mut params: Vec<ArrayViewMutD<'_, f32>> = self
            .features
            .iter_mut()
            .flat_map(Layer::parameters_mut)
            .collect();
        params.push(self.classifier.weight.view_mut().into_dyn());
        params.push(self.classifier.bias.view_mut().into_dyn());
        params
    }
}
