// ============================================================
// Layer 4 — Pair Dataset
// ============================================================
// Wraps any PairSource in Burn's Dataset trait. Each get() draws
// a same-label pair for the index and decodes both images, so the
// expensive work runs on the DataLoader's worker threads.
//
// A pair whose images cannot be decoded is skipped: the failure
// is logged and another random index is tried. Returning None
// would end the DataLoader's epoch early, so that only happens
// after MAX_ATTEMPTS consecutive failures.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

use anyhow::Result;
use burn::data::dataset::Dataset;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::data::transform::ImageTransform;
use crate::domain::traits::PairSource;

const MAX_ATTEMPTS: usize = 8;

/// Two decoded images (CHW, values in [-1, 1]) and their label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairItem {
    pub first:  Vec<f32>,
    pub second: Vec<f32>,
    pub label:  i64,
}

pub struct PairDataset {
    source:    Box<dyn PairSource>,
    transform: ImageTransform,
}

impl PairDataset {
    pub fn new(source: Box<dyn PairSource>, transform: ImageTransform) -> Self {
        Self { source, transform }
    }

    pub fn transform(&self) -> &ImageTransform {
        &self.transform
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Batches per epoch for a given batch size (last batch may be partial)
    pub fn batches_per_epoch(&self, batch_size: usize) -> usize {
        self.source.len().div_ceil(batch_size.max(1))
    }

    fn load_pair(&self, index: usize, rng: &mut dyn RngCore) -> Result<PairItem> {
        let record = self.source.pick_pair(index, rng)?;
        Ok(PairItem {
            first:  self.transform.load(&record.first)?,
            second: self.transform.load(&record.second)?,
            label:  record.label,
        })
    }
}

impl Dataset<PairItem> for PairDataset {
    fn get(&self, index: usize) -> Option<PairItem> {
        if index >= self.len() {
            return None;
        }
        let mut rng = rand::thread_rng();
        let mut idx = index;

        for attempt in 1..=MAX_ATTEMPTS {
            match self.load_pair(idx, &mut rng) {
                Ok(item) => return Some(item),
                Err(e) => {
                    tracing::warn!("Skipping pair {} (attempt {}): {:#}", idx, attempt, e);
                    idx = rng.gen_range(0..self.len());
                }
            }
        }

        tracing::error!("Giving up on item {} after {} attempts", index, MAX_ATTEMPTS);
        None
    }

    fn len(&self) -> usize {
        self.source.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sources::ChairRenders;
    use crate::domain::dataset_kind::CropPolicy;
    use image::{Rgb, RgbImage};
    use std::path::PathBuf;

    fn write_png(path: &PathBuf, color: [u8; 3]) {
        RgbImage::from_pixel(12, 10, Rgb(color)).save(path).unwrap();
    }

    #[test]
    fn test_get_decodes_both_images() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        write_png(&a, [255, 255, 255]);
        write_png(&b, [255, 255, 255]);

        let source = ChairRenders::from_instances(vec![vec![a, b]]);
        let transform = ImageTransform::new(CropPolicy::ResizeThenCrop, 4, 3).unwrap();
        let dataset = PairDataset::new(Box::new(source), transform);

        let item = dataset.get(0).unwrap();
        assert_eq!(item.first.len(), 3 * 4 * 4);
        assert_eq!(item.second.len(), 3 * 4 * 4);
        assert_eq!(item.label, 0);
        assert!(item.first.iter().all(|v| *v > 0.99));
    }

    #[test]
    fn test_get_out_of_range_is_none() {
        let source = ChairRenders::from_instances(vec![vec![PathBuf::from("x.png")]]);
        let transform = ImageTransform::new(CropPolicy::ResizeThenCrop, 4, 3).unwrap();
        let dataset = PairDataset::new(Box::new(source), transform);
        assert!(dataset.get(1).is_none());
    }

    #[test]
    fn test_undecodable_pairs_give_up() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.png");
        std::fs::write(&broken, b"not a png").unwrap();

        let source = ChairRenders::from_instances(vec![vec![broken]]);
        let transform = ImageTransform::new(CropPolicy::ResizeThenCrop, 4, 3).unwrap();
        let dataset = PairDataset::new(Box::new(source), transform);
        assert!(dataset.get(0).is_none());
    }

    #[test]
    fn test_batches_per_epoch_rounds_up() {
        let instances = (0..5).map(|i| vec![PathBuf::from(format!("{i}.png"))]).collect();
        let transform = ImageTransform::new(CropPolicy::ResizeThenCrop, 4, 3).unwrap();
        let dataset = PairDataset::new(Box::new(ChairRenders::from_instances(instances)), transform);
        assert_eq!(dataset.batches_per_epoch(2), 3);
        assert_eq!(dataset.batches_per_epoch(5), 1);
    }
}
