// ============================================================
// Layer 5 — Attentive Transformer (Attention Gate)
// ============================================================
// Decides, per sample and per decision step, which input
// features the step may look at:
//
//   mask = softmax( GBN( W · features ) ⊙ prior )
//
// The prior carries how much of each feature is still
// "available"; multiplying by it damps features that earlier
// steps already used. Softmax keeps the mask non-negative and
// summing to 1 per row.

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::softmax,
};

use crate::ml::ghost_norm::{GhostBatchNorm, GhostBatchNormConfig};

#[derive(Config, Debug)]
pub struct AttentiveTransformerConfig {
    pub input_dim:  usize,
    pub output_dim: usize,
    #[config(default = 128)]
    pub virtual_batch_size: usize,
    #[config(default = 0.01)]
    pub momentum: f64,
}

impl AttentiveTransformerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> AttentiveTransformer<B> {
        AttentiveTransformer {
            fc: LinearConfig::new(self.input_dim, self.output_dim)
                .with_bias(false)
                .init(device),
            bn: GhostBatchNormConfig::new(self.output_dim)
                .with_virtual_batch_size(self.virtual_batch_size)
                .with_momentum(self.momentum)
                .init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct AttentiveTransformer<B: Backend> {
    pub fc: Linear<B>,
    pub bn: GhostBatchNorm<B>,
}

impl<B: Backend> AttentiveTransformer<B> {
    /// prior, features: [batch, input_dim] → mask: [batch, output_dim]
    pub fn forward(&self, prior: Tensor<B, 2>, features: Tensor<B, 2>, training: bool) -> Tensor<B, 2> {
        let x = self.bn.forward(self.fc.forward(features), training);
        softmax(x * prior, 1)
    }
}

/// Decay the availability prior after a step: prior · (gamma − mask).
///
/// Clamped at zero: with masks in [0, 1] and gamma > 1 the factor is
/// always positive, but a projection that lets mask exceed gamma
/// would otherwise flip the prior's sign.
pub fn update_prior<B: Backend>(prior: Tensor<B, 2>, mask: Tensor<B, 2>, gamma: f64) -> Tensor<B, 2> {
    (prior * mask.neg().add_scalar(gamma)).clamp_min(0.0)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    fn to_vec<const D: usize>(t: Tensor<B, D>) -> Vec<f32> {
        t.into_data().convert::<f32>().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_mask_is_a_distribution_per_row() {
        let device = Default::default();
        let gate = AttentiveTransformerConfig::new(5, 5).init::<B>(&device);
        let features = Tensor::<B, 2>::random([4, 5], burn::tensor::Distribution::Normal(0.0, 1.0), &device);
        let prior = Tensor::<B, 2>::ones([4, 5], &device);

        let mask = gate.forward(prior, features, false);
        assert_eq!(mask.dims(), [4, 5]);
        let values = to_vec(mask);
        assert!(values.iter().all(|&v| v >= 0.0));
        for row in values.chunks(5) {
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-4, "row sums to {sum}");
        }
    }

    #[test]
    fn test_prior_update_rule() {
        let device = Default::default();
        let prior = Tensor::<B, 2>::from_floats([[1.0, 1.0, 0.5]], &device);
        let mask  = Tensor::<B, 2>::from_floats([[0.0, 1.0, 0.5]], &device);
        let next = to_vec(update_prior(prior, mask, 1.5));
        assert!((next[0] - 1.5).abs() < 1e-6);
        assert!((next[1] - 0.5).abs() < 1e-6);
        assert!((next[2] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_prior_never_goes_negative_when_mask_exceeds_gamma() {
        let device = Default::default();
        let prior = Tensor::<B, 2>::from_floats([[1.0, 0.8]], &device);
        // Not reachable with softmax, but a sparse projection could produce it.
        let mask  = Tensor::<B, 2>::from_floats([[2.0, 1.6]], &device);
        let next = to_vec(update_prior(prior, mask, 1.5));
        assert!(next.iter().all(|&p| p == 0.0), "{next:?}");
    }

    #[test]
    fn test_zero_prior_flattens_feature_logit() {
        let device = Default::default();
        let gate = AttentiveTransformerConfig::new(3, 3).init::<B>(&device);
        let features = Tensor::<B, 2>::from_floats([[3.0, -2.0, 1.0]], &device);
        // With every prior entry at zero all logits vanish → uniform mask.
        let prior = Tensor::<B, 2>::zeros([1, 3], &device);
        let mask = to_vec(gate.forward(prior, features, false));
        for m in mask {
            assert!((m - 1.0 / 3.0).abs() < 1e-5);
        }
    }
}
