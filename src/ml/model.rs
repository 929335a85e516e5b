// ============================================================
// Layer 5 — TabNet Classifier
// ============================================================
// Encoder + classifier head:
//
//   x ──▶ TabNetEncoder ──▶ Σ decision [batch, n_d] ──▶ Linear ──▶ logits [batch, 2]
//                    └────▶ sparsity term, per-step masks
//
// The head has no activation: the trainer feeds the logits to
// cross-entropy and the predictor applies softmax itself.
//
// Loss = CE(logits, labels) + λ · sparsity
//
// Reference: Arik & Pfister (2021) TabNet: Attentive Interpretable
//            Tabular Learning
//            Burn Book §3 (Building Blocks)

use burn::{
    nn::{loss::CrossEntropyLossConfig, Linear, LinearConfig},
    prelude::*,
};

use crate::ml::encoder::{TabNetEncoder, TabNetEncoderConfig};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct TabNetConfig {
    pub input_dim: usize,
    #[config(default = 2)]
    pub num_classes: usize,
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

impl TabNetConfig {
    /// Reject shapes the encoder cannot be built from.
    pub fn validate(&self) -> Result<(), String> {
        if self.input_dim == 0 {
            return Err("input_dim must be at least 1".into());
        }
        if self.num_classes < 2 {
            return Err(format!("num_classes must be at least 2, got {}", self.num_classes));
        }
        if self.n_steps == 0 {
            return Err("n_steps must be at least 1".into());
        }
        if self.n_d == 0 {
            return Err("n_d must be at least 1".into());
        }
        // The first independent layer is what maps input_dim to n_d + n_a.
        if self.n_independent == 0 {
            return Err("n_independent must be at least 1".into());
        }
        if self.virtual_batch_size == 0 {
            return Err("virtual_batch_size must be at least 1".into());
        }
        if !(0.0..=1.0).contains(&self.momentum) {
            return Err(format!("momentum must lie in [0, 1], got {}", self.momentum));
        }
        if !(self.gamma.is_finite() && self.gamma >= 1.0) {
            return Err(format!("gamma must be >= 1, got {}", self.gamma));
        }
        Ok(())
    }

    pub fn encoder(&self) -> TabNetEncoderConfig {
        TabNetEncoderConfig::new(self.input_dim)
            .with_n_steps(self.n_steps)
            .with_n_d(self.n_d)
            .with_n_a(self.n_a)
            .with_n_shared(self.n_shared)
            .with_n_independent(self.n_independent)
            .with_virtual_batch_size(self.virtual_batch_size)
            .with_momentum(self.momentum)
            .with_gamma(self.gamma)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> TabNetClassifier<B> {
        TabNetClassifier {
            encoder:   self.encoder().init(device),
            head:      LinearConfig::new(self.n_d, self.num_classes).init(device),
            input_dim: self.input_dim,
        }
    }
}

#[derive(Module, Debug)]
pub struct TabNetClassifier<B: Backend> {
    pub encoder:   TabNetEncoder<B>,
    pub head:      Linear<B>,
    pub input_dim: usize,
}

pub struct ClassifierOutput<B: Backend> {
    pub logits:   Tensor<B, 2>,
    pub sparsity: Tensor<B, 1>,
    pub masks:    Vec<Tensor<B, 2>>,
}

impl<B: Backend> TabNetClassifier<B> {
    /// features: [batch, input_dim] → logits: [batch, num_classes]
    pub fn forward(&self, features: Tensor<B, 2>, training: bool) -> ClassifierOutput<B> {
        let encoded = self.encoder.forward(features, training);
        ClassifierOutput {
            logits:   self.head.forward(encoded.decision),
            sparsity: encoded.sparsity,
            masks:    encoded.masks,
        }
    }

    /// Composite loss used for both the training and validation streams.
    pub fn forward_loss(
        &self,
        features:      Tensor<B, 2>,
        labels:        Tensor<B, 1, Int>,
        lambda_sparse: f64,
        training:      bool,
    ) -> (Tensor<B, 1>, ClassifierOutput<B>) {
        let output = self.forward(features, training);
        let ce = CrossEntropyLossConfig::new().init(&output.logits.device());
        let loss = ce.forward(output.logits.clone(), labels)
            + output.sparsity.clone().mul_scalar(lambda_sparse);
        (loss, output)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::tensor::Distribution;

    type B = NdArray;

    #[test]
    fn test_default_config_matches_documented_architecture() {
        let cfg = TabNetConfig::new(7);
        assert_eq!(cfg.num_classes, 2);
        assert_eq!((cfg.n_steps, cfg.n_d, cfg.n_a), (3, 8, 8));
        assert_eq!((cfg.n_shared, cfg.n_independent), (2, 2));
        assert_eq!(cfg.virtual_batch_size, 128);
        assert!((cfg.gamma - 1.5).abs() < 1e-12);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        assert!(TabNetConfig::new(0).validate().is_err());
        assert!(TabNetConfig::new(7).with_n_independent(0).validate().is_err());
        assert!(TabNetConfig::new(7).with_n_steps(0).validate().is_err());
        assert!(TabNetConfig::new(7).with_gamma(0.5).validate().is_err());
        assert!(TabNetConfig::new(7).with_num_classes(1).validate().is_err());
    }

    #[test]
    fn test_config_survives_json() {
        let cfg = TabNetConfig::new(7).with_n_steps(5).with_gamma(1.3);
        let json = serde_json::to_string(&cfg).unwrap();
        let back: TabNetConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.input_dim, 7);
        assert_eq!(back.n_steps, 5);
        assert!((back.gamma - 1.3).abs() < 1e-12);
    }

    #[test]
    fn test_forward_shapes() {
        let device = Default::default();
        let model = TabNetConfig::new(7).init::<B>(&device);
        let x = Tensor::<B, 2>::random([4, 7], Distribution::Normal(0.0, 1.0), &device);
        let out = model.forward(x, false);
        assert_eq!(out.logits.dims(), [4, 2]);
        assert_eq!(out.masks.len(), 3);
        assert_eq!(model.input_dim, 7);
    }

    #[test]
    fn test_loss_adds_weighted_sparsity() {
        let device = Default::default();
        let model = TabNetConfig::new(5).init::<B>(&device);
        let x = Tensor::<B, 2>::random([6, 5], Distribution::Normal(0.0, 1.0), &device);
        let y = Tensor::<B, 1, Int>::from_ints([0, 1, 0, 1, 1, 0], &device);

        let (plain, _)   = model.forward_loss(x.clone(), y.clone(), 0.0, false);
        let (with, out)  = model.forward_loss(x, y, 0.5, false);
        let plain: f64    = plain.into_scalar().elem();
        let with: f64     = with.into_scalar().elem();
        let sparsity: f64 = out.sparsity.into_scalar().elem();
        assert!((with - (plain + 0.5 * sparsity)).abs() < 1e-4);
    }

    #[test]
    fn test_backward_reaches_head_and_shared_layers() {
        type AB = Autodiff<NdArray>;
        let device = Default::default();
        let model = TabNetConfig::new(4).init::<AB>(&device);
        let x = Tensor::<AB, 2>::random([8, 4], Distribution::Normal(0.0, 1.0), &device);
        let y = Tensor::<AB, 1, Int>::from_ints([0, 1, 0, 1, 0, 1, 0, 1], &device);
        let (loss, _) = model.forward_loss(x, y, 1e-3, true);
        let grads = loss.backward();
        assert!(model.head.weight.grad(&grads).is_some());
        assert!(model.encoder.shared.layers[0].weight.grad(&grads).is_some());
    }
}
