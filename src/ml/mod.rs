// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains ALL Burn model code. The data layer only
// touches Burn's Dataset/Batcher traits; everything with weights
// lives here.
//
// What's in this layer (leaf-first):
//
//   ghost_norm.rs        — ghost batch normalisation: per-chunk
//                          statistics in training, running
//                          statistics at inference
//   attention.rs         — attentive transformer: prior-scaled
//                          softmax mask over input features
//   feature_transform.rs — step-specific layers + one shared block
//                          reused by every step
//   encoder.rs           — the multi-step fold producing the
//                          decision sum, sparsity term and masks
//   model.rs             — TabNetConfig + classifier head + loss
//   trainer.rs           — epoch loop, early stopping, checkpoints,
//                          held-out evaluation
//   predictor.rs         — artifact + checkpoint loading, single/
//                          batch prediction, explanations
//
// Backends:
//   InferBackend = NdArray (CPU), or Wgpu with `--features wgpu`
//   TrainBackend = Autodiff<InferBackend>
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Arik & Pfister (2021) TabNet

use burn::prelude::*;

pub mod ghost_norm;
pub mod attention;
pub mod feature_transform;
pub mod encoder;

/// TabNet classifier architecture and loss
pub mod model;

/// Training loop with validation, early stopping and checkpointing
pub mod trainer;

/// Loads artifacts, then predicts and explains
pub mod predictor;

#[cfg(not(feature = "wgpu"))]
pub type InferBackend = burn::backend::NdArray;

#[cfg(feature = "wgpu")]
pub type InferBackend = burn::backend::Wgpu;

pub type TrainBackend = burn::backend::Autodiff<InferBackend>;

pub fn default_device() -> <InferBackend as Backend>::Device {
    Default::default()
}
