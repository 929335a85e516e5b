use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One preprocessed student: scaled feature vector plus class index
/// (0 = Low, 1 = High).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentSample {
    pub features: Vec<f32>,
    pub label:    usize,
}

pub struct StudentDataset {
    samples: Vec<StudentSample>,
}

impl StudentDataset {
    pub fn new(samples: Vec<StudentSample>) -> Self { Self { samples } }

    /// Zip vectors with their labels. Extra entries on either side are dropped.
    pub fn from_parts(vectors: Vec<Vec<f32>>, labels: Vec<usize>) -> Self {
        let samples = vectors
            .into_iter()
            .zip(labels)
            .map(|(features, label)| StudentSample { features, label })
            .collect();
        Self { samples }
    }

    pub fn sample_count(&self) -> usize { self.samples.len() }

    /// Fraction of the most common label; the accuracy a constant predictor reaches.
    pub fn majority_fraction(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let high = self.samples.iter().filter(|s| s.label == 1).count();
        let low = self.samples.len() - high;
        high.max(low) as f64 / self.samples.len() as f64
    }
}

impl Dataset<StudentSample> for StudentDataset {
    fn get(&self, index: usize) -> Option<StudentSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_and_baseline() {
        let ds = StudentDataset::from_parts(
            vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0]],
            vec![1, 1, 1, 0],
        );
        assert_eq!(ds.len(), 4);
        assert_eq!(ds.get(2).map(|s| s.features), Some(vec![2.0]));
        assert!(ds.get(4).is_none());
        assert!((ds.majority_fraction() - 0.75).abs() < 1e-12);
    }
}
