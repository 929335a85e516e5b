// ============================================================
// Layer 4 — Student Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<StudentSample>
// into tensors:
//
//   Input:  N samples, each with F scaled features
//   Output: features [N, F] float, labels [N] int
//
// Every sample already has the fitted width F (the pipeline
// guarantees it), so batching is a flatten + reshape.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::StudentSample;

// ─── StudentBatch ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct StudentBatch<B: Backend> {
    /// shape: [batch_size, num_features]
    pub features: Tensor<B, 2>,

    /// shape: [batch_size]
    pub labels: Tensor<B, 1, Int>,
}

// ─── StudentBatcher ───────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct StudentBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> StudentBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<StudentSample, StudentBatch<B>> for StudentBatcher<B> {
    fn batch(&self, items: Vec<StudentSample>) -> StudentBatch<B> {
        let batch_size = items.len();
        let width = items.first().map(|s| s.features.len()).unwrap_or(0);

        let flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.features.iter().copied())
            .collect();

        let labels: Vec<i32> = items.iter().map(|s| s.label as i32).collect();

        let features = Tensor::<B, 1>::from_floats(flat.as_slice(), &self.device)
            .reshape([batch_size, width]);
        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        StudentBatch { features, labels }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    #[test]
    fn test_batch_shapes_and_values() {
        let batcher = StudentBatcher::<B>::new(Default::default());
        let batch = batcher.batch(vec![
            StudentSample { features: vec![1.0, 2.0, 3.0], label: 1 },
            StudentSample { features: vec![4.0, 5.0, 6.0], label: 0 },
        ]);
        assert_eq!(batch.features.dims(), [2, 3]);
        assert_eq!(batch.labels.dims(), [2]);

        let values = batch.features.into_data().convert::<f32>().to_vec::<f32>().unwrap();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let labels = batch.labels.into_data().convert::<i64>().to_vec::<i64>().unwrap();
        assert_eq!(labels, vec![1, 0]);
    }
}
