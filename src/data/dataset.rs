// ============================================================
// Layer 4 - Paired Image Dataset
// ============================================================
// Holds every preprocessed hazy/clean pair in memory and serves
// them to Burn's DataLoader by index.
//
// All inputs must share one shape and all targets another, since
// a batch stacks them into a single [N, C, H, W] tensor. The
// check runs once, when the dataset is built.
//
// Reference: Burn Book §4 (Dataset)

use anyhow::{ensure, Result};
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::data::preprocessor::Preprocessor;
use crate::domain::{image_pair::ImagePair, patch::Patch};

/// One preprocessed hazy/clean pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairSample {
    pub id:     String,
    pub input:  Patch,
    pub target: Patch,
}

/// In-memory dataset of preprocessed pairs.
///
/// Every sample shares one input shape and one target shape,
/// so any subset can be stacked into a batch tensor.
pub struct PairDataset {
    samples: Vec<PairSample>,
}

impl PairDataset {
    pub fn new(samples: Vec<PairSample>) -> Self { Self { samples } }

    /// Load and preprocess every pair, then check shape consistency.
    pub fn from_pairs(pairs: &[ImagePair], preprocessor: &Preprocessor) -> Result<Self> {
        let samples = pairs
            .iter()
            .map(|pair| preprocessor.load_pair(pair))
            .collect::<Result<Vec<_>>>()?;
        Self::checked(samples)
    }

    /// Wrap samples after verifying they all have the same shapes.
    pub fn checked(samples: Vec<PairSample>) -> Result<Self> {
        if let Some(first) = samples.first() {
            let (input_shape, target_shape) = (first.input.shape(), first.target.shape());
            for s in &samples {
                ensure!(
                    s.input.shape() == input_shape && s.target.shape() == target_shape,
                    "sample '{}' has shapes {:?}/{:?}, expected {:?}/{:?}; \
                     all images must share one size",
                    s.id,
                    s.input.shape(),
                    s.target.shape(),
                    input_shape,
                    target_shape
                );
            }
        }
        Ok(Self { samples })
    }

    pub fn sample_count(&self) -> usize { self.samples.len() }

    /// `[C, H, W]` of the inputs, `None` when empty.
    pub fn input_shape(&self) -> Option<[usize; 3]> {
        self.samples.first().map(|s| s.input.shape())
    }

    /// `[C, H, W]` of the targets, `None` when empty.
    pub fn target_shape(&self) -> Option<[usize; 3]> {
        self.samples.first().map(|s| s.target.shape())
    }

    pub fn into_samples(self) -> Vec<PairSample> { self.samples }
}

impl Dataset<PairSample> for PairDataset {
    fn get(&self, index: usize) -> Option<PairSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
pub(crate) fn synthetic_sample(id: &str, channels: usize, size: usize, value: f32) -> PairSample {
    let n = channels * size * size;
    PairSample {
        id:     id.to_string(),
        input:  Patch::new(channels, size, size, vec![value; n]).unwrap(),
        target: Patch::new(channels, size, size, vec![value * 0.5; n]).unwrap(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_shapes_are_rejected() {
        let samples = vec![synthetic_sample("a", 3, 8, 0.1), synthetic_sample("b", 3, 6, 0.1)];
        assert!(PairDataset::checked(samples).is_err());
    }

    #[test]
    fn test_dataset_access() {
        let samples = vec![synthetic_sample("a", 3, 8, 0.1), synthetic_sample("b", 3, 8, 0.2)];
        let ds = PairDataset::checked(samples).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.input_shape(), Some([3, 8, 8]));
        assert_eq!(ds.get(1).unwrap().id, "b");
        assert!(ds.get(2).is_none());
    }
}
