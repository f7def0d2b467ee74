// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Handles the file outputs of a run:
//
//   checkpoint.rs — Saving and loading network weights
//                   Uses Burn's full-precision MessagePack
//                   recorder for netG_/netD_ files. Also saves/loads TrainConfig as JSON
//                   so sampling can rebuild the generator.
//
//   metrics.rs    — Discriminator score log
//                   Appends per-iteration dPos/dNeg rows to a
//                   flat text file after each epoch.
//
//   image_grid.rs — PNG grid of generated images
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Per-iteration score log
pub mod metrics;

/// Image grid writer
pub mod image_grid;
