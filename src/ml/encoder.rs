// ============================================================
// Layer 5 — Multi-Step Encoder
// ============================================================
// A fixed number of decision steps run in sequence. Each step:
//
//   1. mask      = AttentiveTransformer(prior, features)
//   2. masked    = mask ⊙ features
//   3. embedding = FeatureTransformer(masked)       [n_d + n_a]
//        decision  = ReLU(embedding[..n_d])
//        attention = embedding[n_d..]
//   4. decision_sum += decision
//   5. prior        = prior ⊙ (gamma − mask)
//   6. sparsity     += mean_rows( Σ mask · ln(mask + ε) )
//
// The steps are folded left-to-right over an explicit state
// (prior, decision sum, sparsity, masks), so a single step can
// be driven and inspected on its own.
//
// Terminal output: summed decision vector, total sparsity term,
// and every step's mask in order (used for explanations).

use burn::{prelude::*, tensor::activation::relu};

use crate::ml::attention::{update_prior, AttentiveTransformer, AttentiveTransformerConfig};
use crate::ml::feature_transform::{FeatureTransformer, FeatureTransformerConfig, SharedLayers};
use crate::ml::ghost_norm::{GhostBatchNorm, GhostBatchNormConfig};

const ENTROPY_EPS: f64 = 1e-10;

#[derive(Config, Debug)]
pub struct TabNetEncoderConfig {
    pub input_dim: usize,
    #[config(default = 3)]
    pub n_steps: usize,
    #[config(default = 8)]
    pub n_d: usize,
    #[config(default = 8)]
    pub n_a: usize,
    #[config(default = 2)]
    pub n_shared: usize,
    #[config(default = 2)]
    pub n_independent: usize,
    #[config(default = 128)]
    pub virtual_batch_size: usize,
    #[config(default = 0.01)]
    pub momentum: f64,
    #[config(default = 1.5)]
    pub gamma: f64,
}

impl TabNetEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TabNetEncoder<B> {
        let width = self.n_d + self.n_a;
        let steps = (0..self.n_steps)
            .map(|_| DecisionStep {
                attention: AttentiveTransformerConfig::new(self.input_dim, self.input_dim)
                    .with_virtual_batch_size(self.virtual_batch_size)
                    .with_momentum(self.momentum)
                    .init(device),
                transform: FeatureTransformerConfig::new(self.input_dim, width)
                    .with_n_independent(self.n_independent)
                    .with_virtual_batch_size(self.virtual_batch_size)
                    .with_momentum(self.momentum)
                    .init(device),
                n_d: self.n_d,
            })
            .collect();

        TabNetEncoder {
            initial_bn: GhostBatchNormConfig::new(self.input_dim)
                .with_virtual_batch_size(self.virtual_batch_size)
                .with_momentum(self.momentum)
                .init(device),
            shared: SharedLayers::new(width, self.n_shared, device),
            steps,
            n_d: self.n_d,
            gamma: self.gamma,
        }
    }
}

// ─── DecisionStep ─────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct DecisionStep<B: Backend> {
    pub attention: AttentiveTransformer<B>,
    pub transform: FeatureTransformer<B>,
    pub n_d:       usize,
}

/// Everything one step produces.
#[derive(Debug, Clone)]
pub struct StepOutput<B: Backend> {
    pub mask:      Tensor<B, 2>,
    pub decision:  Tensor<B, 2>,
    pub attention: Tensor<B, 2>,
    pub prior:     Tensor<B, 2>,
    pub sparsity:  Tensor<B, 1>,
}

impl<B: Backend> DecisionStep<B> {
    pub fn forward(
        &self,
        features: Tensor<B, 2>,
        prior:    Tensor<B, 2>,
        shared:   &SharedLayers<B>,
        gamma:    f64,
        training: bool,
    ) -> StepOutput<B> {
        let mask = self.attention.forward(prior.clone(), features.clone(), training);
        let masked = mask.clone() * features;
        let embedding = self.transform.forward(masked, shared, training);

        let [batch, width] = embedding.dims();
        let decision  = relu(embedding.clone().slice([0..batch, 0..self.n_d]));
        let attention = embedding.slice([0..batch, self.n_d..width]);

        StepOutput {
            prior: update_prior(prior, mask.clone(), gamma),
            sparsity: negative_entropy(mask.clone()),
            mask,
            decision,
            attention,
        }
    }
}

/// mean over rows of Σ_j m_j · ln(m_j + ε)  → shape [1]
pub fn negative_entropy<B: Backend>(mask: Tensor<B, 2>) -> Tensor<B, 1> {
    (mask.clone() * mask.add_scalar(ENTROPY_EPS).log())
        .sum_dim(1)
        .mean()
}

// ─── TabNetEncoder ────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct TabNetEncoder<B: Backend> {
    pub initial_bn: GhostBatchNorm<B>,
    pub shared:     SharedLayers<B>,
    pub steps:      Vec<DecisionStep<B>>,
    pub n_d:        usize,
    pub gamma:      f64,
}

pub struct EncoderOutput<B: Backend> {
    pub decision: Tensor<B, 2>,
    pub sparsity: Tensor<B, 1>,
    pub masks:    Vec<Tensor<B, 2>>,
}

/// Accumulator threaded through the step fold.
struct FoldState<B: Backend> {
    prior:        Tensor<B, 2>,
    decision_sum: Tensor<B, 2>,
    sparsity:     Tensor<B, 1>,
    masks:        Vec<Tensor<B, 2>>,
}

impl<B: Backend> TabNetEncoder<B> {
    /// x: [batch, input_dim]
    pub fn forward(&self, x: Tensor<B, 2>, training: bool) -> EncoderOutput<B> {
        let [batch, input_dim] = x.dims();
        let device = x.device();
        let features = self.initial_bn.forward(x, training);

        let init = FoldState {
            prior:        Tensor::ones([batch, input_dim], &device),
            decision_sum: Tensor::zeros([batch, self.n_d], &device),
            sparsity:     Tensor::zeros([1], &device),
            masks:        Vec::with_capacity(self.steps.len()),
        };

        let done = self.steps.iter().fold(init, |mut state, step| {
            let out = step.forward(features.clone(), state.prior, &self.shared, self.gamma, training);
            state.masks.push(out.mask);
            FoldState {
                prior:        out.prior,
                decision_sum: state.decision_sum + out.decision,
                sparsity:     state.sparsity + out.sparsity,
                masks:        state.masks,
            }
        });

        EncoderOutput {
            decision: done.decision_sum,
            sparsity: done.sparsity,
            masks:    done.masks,
        }
    }
}
