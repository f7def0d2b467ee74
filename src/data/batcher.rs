// ============================================================
// Layer 4 — Pair Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<PairItem> into
// device tensors.
//
//   Input:  N PairItems, each image a flat CHW Vec<f32>
//   Output: first  [N, C, S, S]
//           second [N, C, S, S]
//           labels [N]
//
// The discriminator sees a real pair as one 2C-channel image,
// built with PairBatch::stacked().
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::data::dataset::PairItem;

/// A minibatch of real pairs on the device.
#[derive(Debug, Clone)]
pub struct PairBatch<B: Backend> {
    /// Anchor images, [N, C, S, S] in [-1, 1]
    pub first:  Tensor<B, 4>,
    /// Same-label partners, same shape as `first`
    pub second: Tensor<B, 4>,
    /// Shared label of each pair, [N]
    pub labels: Tensor<B, 1, Int>,
}

impl<B: Backend> PairBatch<B> {
    /// N; the last batch of an epoch may be short
    pub fn batch_size(&self) -> usize {
        self.first.dims()[0]
    }

    /// Channel-concatenated pair: [N, 2C, S, S].
    ///
    /// Channels 0..C are `first`, C..2C are `second`, the same
    /// layout the generator produces for a fake pair.
    pub fn stacked(&self) -> Tensor<B, 4> {
        Tensor::cat(vec![self.first.clone(), self.second.clone()], 1)
    }
}

/// Knows the image geometry so it can reshape the flat vectors.
#[derive(Clone, Debug)]
pub struct PairBatcher {
    /// C, channels per image
    pub channels: usize,
    /// S, side of the square image
    pub size:     usize,
}

impl PairBatcher {
    pub fn new(channels: usize, size: usize) -> Self {
        Self { channels, size }
    }
}

impl<B: Backend> Batcher<B, PairItem, PairBatch<B>> for PairBatcher {
    /// Stack N items into a PairBatch on `device`.
    ///
    /// Steps:
    ///   1. Concatenate every item's flat CHW vector, per side
    ///   2. Reshape each side to [N, C, S, S]
    ///   3. Collect labels into an Int tensor
    fn batch(&self, items: Vec<PairItem>, device: &B::Device) -> PairBatch<B> {
        let n     = items.len();
        let shape = [n, self.channels, self.size, self.size];

        let first_flat: Vec<f32> = items
            .iter()
            .flat_map(|item| item.first.iter().copied())
            .collect();
        let second_flat: Vec<f32> = items
            .iter()
            .flat_map(|item| item.second.iter().copied())
            .collect();
        let labels: Vec<i32> = items.iter().map(|item| item.label as i32).collect();

        let first  = Tensor::<B, 4>::from_data(TensorData::new(first_flat, shape), device);
        let second = Tensor::<B, 4>::from_data(TensorData::new(second_flat, shape), device);
        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), device);

        PairBatch { first, second, labels }
    }
}
