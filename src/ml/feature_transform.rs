// ============================================================
// Layer 5 — Feature Transformer
// ============================================================
// Turns the masked input of one decision step into an
// `n_d + n_a` wide embedding:
//
//   independent (per step):  Linear → GBN → ReLU   × n_independent
//   shared (all steps):      Linear → ReLU          × n_shared
//
// The shared layers are ONE set of weights owned by the encoder
// and passed in by reference at every step, so gradients from
// every step land on the same tensors.

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::relu,
};

use crate::ml::ghost_norm::{GhostBatchNorm, GhostBatchNormConfig};

// ─── SharedLayers ─────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct SharedLayers<B: Backend> {
    pub layers: Vec<Linear<B>>,
}

impl<B: Backend> SharedLayers<B> {
    /// `count` square layers of width `width`.
    pub fn new(width: usize, count: usize, device: &B::Device) -> Self {
        let layers = (0..count)
            .map(|_| LinearConfig::new(width, width).init(device))
            .collect();
        Self { layers }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        self.layers.iter().fold(x, |x, layer| relu(layer.forward(x)))
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

// ─── FeatureTransformer ───────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct FeatureTransformerConfig {
    pub input_dim:  usize,
    pub output_dim: usize,
    #[config(default = 2)]
    pub n_independent: usize,
    #[config(default = 128)]
    pub virtual_batch_size: usize,
    #[config(default = 0.01)]
    pub momentum: f64,
}

impl FeatureTransformerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> FeatureTransformer<B> {
        let independent = (0..self.n_independent)
            .map(|i| {
                let d_in = if i == 0 { self.input_dim } else { self.output_dim };
                LinearConfig::new(d_in, self.output_dim).init(device)
            })
            .collect();
        let norms = (0..self.n_independent)
            .map(|_| {
                GhostBatchNormConfig::new(self.output_dim)
                    .with_virtual_batch_size(self.virtual_batch_size)
                    .with_momentum(self.momentum)
                    .init(device)
            })
            .collect();
        FeatureTransformer { independent, norms }
    }
}

#[derive(Module, Debug)]
pub struct FeatureTransformer<B: Backend> {
    pub independent: Vec<Linear<B>>,
    pub norms:       Vec<GhostBatchNorm<B>>,
}

impl<B: Backend> FeatureTransformer<B> {
    /// masked: [batch, input_dim] → embedding: [batch, n_d + n_a]
    pub fn forward(&self, masked: Tensor<B, 2>, shared: &SharedLayers<B>, training: bool) -> Tensor<B, 2> {
        let x = self
            .independent
            .iter()
            .zip(&self.norms)
            .fold(masked, |x, (linear, norm)| {
                relu(norm.forward(linear.forward(x), training))
            });
        shared.forward(x)
    }
}
