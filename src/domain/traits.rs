// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The training pipeline only needs two things from a dataset:
// how many items it has, and a way to draw a same-label pair
// for a given index. Each directory layout implements this
// trait in Layer 4, and the Burn dataset wraps any of them.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use rand::RngCore;

use crate::domain::pair::PairRecord;

// ─── PairSource ───────────────────────────────────────────────────────────────
/// Any component that can hand out same-label image pairs.
///
/// Implementations:
///   - CelebaIdentities  → identity label file
///   - ChairRenders      → one folder per chair instance
///   - FlowerCategories  → MATLAB label vector
///
/// `Send + Sync` because Burn's DataLoader calls into the
/// dataset from its worker threads.
pub trait PairSource: Send + Sync {
    /// Short human-readable name used in log lines
    fn name(&self) -> &str;

    /// Number of items (one epoch visits each index once)
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Draw a pair for `index`. The second image is random,
    /// so repeated calls with the same index may differ.
    fn pick_pair(&self, index: usize, rng: &mut dyn RngCore) -> Result<PairRecord>;
}
