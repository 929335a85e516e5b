// ============================================================
// Layer 5 — Ghost Batch Normalisation
// ============================================================
// Training:  split the batch into virtual batches of
//            `virtual_batch_size` rows (the last may be shorter),
//            normalise each with its OWN mean/variance, and let
//            every chunk update the one shared running-statistics
//            accumulator of the wrapped BatchNorm.
// Inference: normalise the whole batch with the running
//            statistics only, without chunking or updates.
//
// The running statistics are state owned by the wrapped
// BatchNorm. Inference goes through the pure `apply`, which
// reads a snapshot of them and never writes.
//
// Burn's BatchNorm uses batch statistics (and updates its running
// state) only on an autodiff backend, so training mode is meant to
// be driven from the Autodiff<...> training backend.
//
// Reference: Hoffer et al. (2017) Train longer, generalize better
//            Burn Book §3 (Building Blocks)

use burn::{
    nn::{BatchNorm, BatchNormConfig},
    prelude::*,
};

#[derive(Config, Debug)]
pub struct GhostBatchNormConfig {
    pub num_features: usize,
    #[config(default = 128)]
    pub virtual_batch_size: usize,
    #[config(default = 0.01)]
    pub momentum: f64,
}

impl GhostBatchNormConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> GhostBatchNorm<B> {
        let bn = BatchNormConfig::new(self.num_features)
            .with_momentum(self.momentum)
            .init(device);
        GhostBatchNorm {
            bn,
            virtual_batch_size: self.virtual_batch_size.max(1),
        }
    }
}

#[derive(Module, Debug)]
pub struct GhostBatchNorm<B: Backend> {
    pub bn:                 BatchNorm<B, 0>,
    pub virtual_batch_size: usize,
}

/// Snapshot of everything inference-mode normalisation needs.
#[derive(Debug, Clone)]
pub struct NormStats<B: Backend> {
    pub mean:    Tensor<B, 1>,
    pub var:     Tensor<B, 1>,
    pub gamma:   Tensor<B, 1>,
    pub beta:    Tensor<B, 1>,
    pub epsilon: f64,
}

impl<B: Backend> GhostBatchNorm<B> {
    /// x: [batch, features] → same shape
    pub fn forward(&self, x: Tensor<B, 2>, training: bool) -> Tensor<B, 2> {
        if training {
            self.forward_ghost(x)
        } else {
            apply(&self.stats(), x)
        }
    }

    fn forward_ghost(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch, features] = x.dims();
        let vbs = self.virtual_batch_size;
        if batch <= vbs {
            return self.bn.forward(x);
        }

        let chunks: Vec<Tensor<B, 2>> = (0..batch)
            .step_by(vbs)
            .map(|start| {
                let end = (start + vbs).min(batch);
                self.bn.forward(x.clone().slice([start..end, 0..features]))
            })
            .collect();

        Tensor::cat(chunks, 0)
    }

    pub fn stats(&self) -> NormStats<B> {
        NormStats {
            mean:    self.bn.running_mean.value(),
            var:     self.bn.running_var.value(),
            gamma:   self.bn.gamma.val(),
            beta:    self.bn.beta.val(),
            epsilon: self.bn.epsilon,
        }
    }
}

/// Inference-mode normalisation: (x - mean) / sqrt(var + eps) * gamma + beta.
pub fn apply<B: Backend>(stats: &NormStats<B>, x: Tensor<B, 2>) -> Tensor<B, 2> {
    let mean  = stats.mean.clone().unsqueeze::<2>();
    let std   = stats.var.clone().add_scalar(stats.epsilon).sqrt().unsqueeze::<2>();
    let gamma = stats.gamma.clone().unsqueeze::<2>();
    let beta  = stats.beta.clone().unsqueeze::<2>();
    (x - mean) / std * gamma + beta
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type B  = NdArray;
    type AB = Autodiff<NdArray>;

    fn batch<Bk: Backend>(rows: &[[f32; 2]], device: &Bk::Device) -> Tensor<Bk, 2> {
        let flat: Vec<f32> = rows.iter().flatten().copied().collect();
        Tensor::<Bk, 1>::from_floats(flat.as_slice(), device).reshape([rows.len(), 2])
    }

    fn to_vec<Bk: Backend, const D: usize>(t: Tensor<Bk, D>) -> Vec<f32> {
        t.into_data().convert::<f32>().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_inference_preserves_shape_and_uses_running_stats() {
        let device = Default::default();
        let gbn = GhostBatchNormConfig::new(2).init::<B>(&device);
        let x = batch::<B>(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]], &device);
        let y = gbn.forward(x.clone(), false);
        assert_eq!(y.dims(), [3, 2]);

        // Fresh running stats are mean 0, var 1 → output ≈ input.
        for (a, b) in to_vec(y).iter().zip(to_vec(x)) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_training_normalises_each_chunk_separately() {
        let device = Default::default();
        let gbn = GhostBatchNormConfig::new(2)
            .with_virtual_batch_size(2)
            .init::<AB>(&device);
        // Two chunks with very different offsets.
        let x = batch::<AB>(
            &[[0.0, 1.0], [2.0, 3.0], [100.0, 200.0], [104.0, 208.0]],
            &device,
        );
        let y = to_vec(gbn.forward(x, true));
        assert_eq!(y.len(), 8);
        // Each chunk's column mean must be ~0 on its own.
        for chunk in y.chunks(4) {
            assert!((chunk[0] + chunk[2]).abs() < 1e-3);
            assert!((chunk[1] + chunk[3]).abs() < 1e-3);
        }
    }

    #[test]
    fn test_trailing_partial_chunk() {
        let device = Default::default();
        let gbn = GhostBatchNormConfig::new(2)
            .with_virtual_batch_size(2)
            .init::<AB>(&device);
        let x = batch::<AB>(&[[1.0, 1.0], [2.0, 2.0], [3.0, 3.0]], &device);
        assert_eq!(gbn.forward(x, true).dims(), [3, 2]);
    }

    #[test]
    fn test_training_updates_running_stats_inference_does_not() {
        let device = Default::default();
        let gbn = GhostBatchNormConfig::new(2)
            .with_momentum(0.5)
            .init::<AB>(&device);
        let x = batch::<AB>(&[[10.0, 20.0], [12.0, 22.0]], &device);

        let before = to_vec(gbn.stats().mean);
        let _ = gbn.forward(x.clone(), false);
        assert_eq!(to_vec(gbn.stats().mean), before);

        let _ = gbn.forward(x, true);
        let after = to_vec(gbn.stats().mean);
        assert!(after[0] > 1.0 && after[1] > 1.0, "running mean should move: {after:?}");
    }

    #[test]
    fn test_every_chunk_updates_the_shared_running_mean() {
        let device = Default::default();
        let gbn = GhostBatchNormConfig::new(2)
            .with_virtual_batch_size(2)
            .with_momentum(0.5)
            .init::<AB>(&device);
        // Chunk means: [1, 2] then [102, 204].
        let x = batch::<AB>(
            &[[0.0, 1.0], [2.0, 3.0], [100.0, 200.0], [104.0, 208.0]],
            &device,
        );
        let _ = gbn.forward(x, true);

        // running ← running·(1 − m) + chunk_mean·m, once per chunk, from 0
        let after_first  = [0.5 * 1.0, 0.5 * 2.0];
        let after_second = [0.5 * after_first[0] + 0.5 * 102.0, 0.5 * after_first[1] + 0.5 * 204.0];
        let mean = to_vec(gbn.stats().mean);
        assert!((mean[0] - after_second[0]).abs() < 1e-3, "{mean:?}");
        assert!((mean[1] - after_second[1]).abs() < 1e-3, "{mean:?}");
    }

    #[test]
    fn test_trailing_chunk_also_updates_running_mean() {
        let device = Default::default();
        let gbn = GhostBatchNormConfig::new(2)
            .with_virtual_batch_size(2)
            .with_momentum(1.0)
            .init::<AB>(&device);
        // With momentum 1 the running mean is the last chunk's mean: the lone fifth row.
        let x = batch::<AB>(
            &[[0.0, 0.0], [2.0, 2.0], [4.0, 4.0], [6.0, 6.0], [9.0, 7.0]],
            &device,
        );
        let _ = gbn.forward(x, true);
        let mean = to_vec(gbn.stats().mean);
        assert!((mean[0] - 9.0).abs() < 1e-4 && (mean[1] - 7.0).abs() < 1e-4, "{mean:?}");
    }

    #[test]
    fn test_apply_matches_formula() {
        let device = Default::default();
        let stats = NormStats::<B> {
            mean:    Tensor::from_floats([1.0, 2.0], &device),
            var:     Tensor::from_floats([4.0, 1.0], &device),
            gamma:   Tensor::from_floats([2.0, 1.0], &device),
            beta:    Tensor::from_floats([0.5, 0.0], &device),
            epsilon: 0.0,
        };
        let x = batch::<B>(&[[3.0, 5.0]], &device);
        let y = to_vec(apply(&stats, x));
        assert!((y[0] - 2.5).abs() < 1e-5);
        assert!((y[1] - 3.0).abs() < 1e-5);
    }
}
