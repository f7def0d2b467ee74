// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Network modules, the loss and the training loop.
//
// What's in this layer:
//
//   model.rs   — DCGAN building blocks
//                • Encoder / decoder / discriminator stacks
//                • Pair generator: decoder + tanh, 2·nc channels
//                • Pair discriminator: one logit per pair
//
//   loss.rs    — Binary cross-entropy on logits against a
//                smoothed constant target
//
//   trainer.rs — The adversarial training loop
//                One G step and one D step per minibatch,
//                score logging, periodic samples and checkpoints
//
//   sampler.rs — Noise → generated pairs → PNG grid
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Radford et al. (2016) DCGAN

/// Encoder, decoder and discriminator architectures
pub mod model;

/// Label-smoothed binary cross-entropy
pub mod loss;

/// Adversarial training loop with checkpointing
pub mod trainer;

/// Sample grid generation
pub mod sampler;
