// ============================================================
// Layer 3 — PairRecord Domain Type
// ============================================================
// A training example for the pair GAN is two images that share
// a label: the same person (CelebA identity), the same chair
// (3D chairs instance) or the same flower category.
//
// The record only carries paths; decoding happens in Layer 4
// so sources can be tested without touching image codecs.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Two image files with the same semantic label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairRecord {
    /// The image selected by the dataset index
    pub first: PathBuf,

    /// A second image drawn at random from the same label group.
    /// May be the same file as `first`.
    pub second: PathBuf,

    /// The shared label (identity id, instance index or category)
    pub label: i64,
}

impl PairRecord {
    pub fn new(first: impl Into<PathBuf>, second: impl Into<PathBuf>, label: i64) -> Self {
        Self {
            first:  first.into(),
            second: second.into(),
            label,
        }
    }

    /// True when both halves of the pair point at the same file
    pub fn is_self_pair(&self) -> bool {
        self.first == self.second
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_pair_detection() {
        let same  = PairRecord::new("a.jpg", "a.jpg", 3);
        let other = PairRecord::new("a.jpg", "b.jpg", 3);
        assert!(same.is_self_pair());
        assert!(!other.is_self_pair());
    }
}
