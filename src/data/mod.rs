// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer handles everything from a dataset directory tree
// all the way to device tensor batches.
//
// The pipeline flows in this order:
//
//   dataset directory
//       │
//       ▼
//   PairSource        → indexes files and labels, draws pairs
//       │
//       ▼
//   ImageTransform    → decode, crop/resize, normalise to [-1, 1]
//       │
//       ▼
//   PairDataset       → implements Burn's Dataset trait
//       │
//       ▼
//   PairBatcher       → stacks samples into tensor batches
//       │
//       ▼
//   DataLoader        → shuffles and feeds batches to training
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// celebA, 3D chairs and 102 flowers directory layouts
pub mod sources;

/// torchvision-style resize, center crop and normalisation
pub mod transform;

/// Implements Burn's Dataset trait for image pairs
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
