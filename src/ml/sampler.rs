// ============================================================
// Layer 5 — Sampler
// ============================================================
// Turns noise into a PNG grid of generated pairs.
//
//   z [N, size_z, 1, 1]
//       │  Generator
//       ▼
//   pairs [N, 2C, S, S]
//       │  split_pairs
//       ▼
//   images [2N, C, S, S]   (a0, b0, a1, b1, ...)
//       │  image_grid::save_grid
//       ▼
//   <path>.png
//
// With an even row width the two halves of each pair land next
// to each other in the grid.

use anyhow::{anyhow, Result};
use burn::{prelude::*, tensor::Distribution};
use std::path::Path;

use crate::infra::image_grid::save_grid;
use crate::ml::model::Generator;

/// Standard normal noise shaped for the generator
pub fn noise<B: Backend>(count: usize, size_z: usize, device: &B::Device) -> Tensor<B, 4> {
    Tensor::random([count, size_z, 1, 1], Distribution::Normal(0.0, 1.0), device)
}

/// [N, 2C, S, S] → [2N, C, S, S]
pub fn split_pairs<B: Backend>(pairs: Tensor<B, 4>, channels: usize) -> Tensor<B, 4> {
    let [n, _, h, w] = pairs.dims();
    pairs.reshape([2 * n, channels, h, w])
}

/// Run the generator on `z` and write the resulting pairs as one grid.
/// Pass an eval-mode generator (`model.valid()`) so batch norm uses
/// running statistics.
pub fn save_samples<B: Backend>(
    generator: &Generator<B>,
    z:         Tensor<B, 4>,
    channels:  usize,
    nrow:      usize,
    path:      &Path,
) -> Result<()> {
    let images = split_pairs(generator.forward(z), channels);
    let dims   = images.dims();
    let values = images
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("Cannot read generated samples: {e:?}"))?;
    save_grid(&values, dims, nrow, path)
}
