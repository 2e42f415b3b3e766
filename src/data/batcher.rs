// ============================================================
// Layer 4 - Pair Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<PairSample>
// into two 4-D tensors.
//
// How batching works here:
//   Input:  N samples, each a CHW buffer of C*H*W floats
//   Output: PairBatch with tensors of shape [N, C, H, W]
//
//   The CHW buffers are concatenated sample after sample, which
//   is exactly the row-major layout of an [N, C, H, W] tensor.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::PairSample;
use crate::domain::patch::Patch;

/// A batch of image pairs ready for the forward pass.
#[derive(Debug, Clone)]
pub struct PairBatch<B: Backend> {
    /// Hazy images, shape [batch_size, C_in, H, W]
    pub inputs: Tensor<B, 4>,

    /// Clean images, shape [batch_size, C_out, H, W]
    pub targets: Tensor<B, 4>,
}

#[derive(Clone, Debug, Default)]
pub struct PairBatcher;

impl PairBatcher {
    pub fn new() -> Self {
        Self
    }
}

/// Stack patches of identical shape into one [N, C, H, W] tensor.
pub fn stack_patches<'a, B: Backend>(
    patches: impl ExactSizeIterator<Item = &'a Patch>,
    device:  &B::Device,
) -> Tensor<B, 4> {
    let batch_size = patches.len();
    let mut shape = [0usize; 3];
    let mut flat: Vec<f32> = Vec::new();

    for patch in patches {
        shape = patch.shape();
        flat.extend_from_slice(&patch.data);
    }

    let [c, h, w] = shape;
    Tensor::<B, 4>::from_data(TensorData::new(flat, [batch_size, c, h, w]), device)
}

impl<B: Backend> Batcher<B, PairSample, PairBatch<B>> for PairBatcher {
    fn batch(&self, items: Vec<PairSample>, device: &B::Device) -> PairBatch<B> {
        let inputs  = stack_patches::<B>(items.iter().map(|s| &s.input), device);
        let targets = stack_patches::<B>(items.iter().map(|s| &s.target), device);

        PairBatch { inputs, targets }
    }
}
