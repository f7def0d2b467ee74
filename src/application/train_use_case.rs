// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate the configuration  (Layer 2)
//   Step 2: Index the dataset layout    (Layer 4 - data)
//   Step 3: Build the image transform   (Layer 4 - data)
//   Step 4: Wrap both in a Dataset      (Layer 4 - data)
//   Step 5: Save config                 (Layer 6 - infra)
//   Step 6: Run training loop           (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{dataset::PairDataset, sources::open_source, transform::ImageTransform};
use crate::domain::dataset_kind::DatasetKind;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{final_size, PairGanConfig};
use crate::ml::trainer::{run_training, TrainingSummary};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Saved next to the checkpoints so `sample` can rebuild the generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub dataset:   DatasetKind,
    pub data_path: PathBuf,

    // ── Geometry ──
    pub nc:       usize,
    pub size_x:   usize,
    pub size_z:   usize,
    pub nf:       usize,
    pub n_layers: usize,

    // ── Hardware ──
    pub workers: usize,
    pub gpu:     Option<usize>,
    pub cpu:     bool,

    // ── Optimisation ──
    pub batch_size:  usize,
    pub n_iteration: usize,
    pub lr_g:        f64,
    pub lr_d:        f64,
    pub beta1:       f32,
    pub beta2:       f32,
    pub adam_epsilon: f32,
    pub real_label:  f32,
    pub fake_label:  f32,

    // ── Outputs ──
    pub checkpoint_dir:  PathBuf,
    pub load:            usize,
    pub checkpoint_freq: usize,
    pub save_weights:    bool,
    pub seed:            Option<u64>,
    pub log_file:        PathBuf,
    pub sample_dir:      PathBuf,
    pub grid_nrow:       usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            dataset:         DatasetKind::Chairs3d,
            data_path:       PathBuf::from("./data"),
            nc:              3,
            size_x:          64,
            size_z:          128,
            nf:              64,
            n_layers:        4,
            workers:         4,
            gpu:             None,
            cpu:             false,
            batch_size:      128,
            n_iteration:     75001,
            lr_g:            2e-4,
            lr_d:            5e-5,
            beta1:           0.5,
            beta2:           0.999,
            adam_epsilon:    1e-8,
            real_label:      0.9,
            fake_label:      0.1,
            checkpoint_dir:  PathBuf::from("."),
            load:            0,
            checkpoint_freq: 500,
            save_weights:    true,
            seed:            None,
            log_file:        PathBuf::from("logs.dat"),
            sample_dir:      PathBuf::from("."),
            grid_nrow:       8,
        }
    }
}

impl TrainConfig {
    /// Reject settings that would only fail deep inside the loop.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("nc", self.nc),
            ("size_z", self.size_z),
            ("nf", self.nf),
            ("n_layers", self.n_layers),
            ("batch_size", self.batch_size),
            ("checkpoint_freq", self.checkpoint_freq),
            ("grid_nrow", self.grid_nrow),
        ] {
            if value == 0 {
                bail!("{name} must be greater than 0");
            }
        }
        if !matches!(self.nc, 1 | 3 | 4) {
            bail!("nc = {} is not supported (expected 1, 3 or 4)", self.nc);
        }
        final_size(self.size_x, self.n_layers)?;
        for (name, label) in [("real_label", self.real_label), ("fake_label", self.fake_label)] {
            if !(0.0..=1.0).contains(&label) {
                bail!("{name} = {label} must lie in [0, 1]");
            }
        }
        if self.lr_g <= 0.0 || self.lr_d <= 0.0 {
            bail!("learning rates must be positive");
        }
        if self.adam_epsilon <= 0.0 {
            bail!("adam_epsilon must be positive");
        }
        Ok(())
    }

    pub fn gan_config(&self) -> PairGanConfig {
        PairGanConfig::new(self.nc, self.size_x, self.size_z, self.nf, self.n_layers)
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────

pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainingSummary> {
        let cfg = &self.config;

        // ── Step 1: Validate ─────────────────────────────────────────────────
        cfg.validate()?;

        // ── Step 2: Index image pairs ────────────────────────────────────────
        tracing::info!("Indexing {} dataset under '{}'", cfg.dataset, cfg.data_path.display());
        let source = open_source(cfg.dataset, &cfg.data_path)?;
        if source.is_empty() {
            bail!("No training pairs found for {} under '{}'", cfg.dataset, cfg.data_path.display());
        }

        // ── Step 3: Image transform ──────────────────────────────────────────
        // size_x fits in u32 once validate() has accepted it
        let size      = u32::try_from(cfg.size_x)?;
        let transform = ImageTransform::new(cfg.dataset.crop_policy(), size, cfg.nc)?;

        // ── Step 4: Burn dataset ─────────────────────────────────────────────
        let dataset = PairDataset::new(source, transform);
        tracing::info!(
            "{} items, {} batches per epoch",
            burn::data::dataset::Dataset::len(&dataset),
            dataset.batches_per_epoch(cfg.batch_size)
        );

        // ── Step 5: Save config for sampling ─────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt_manager.save_config(cfg)?;

        // ── Step 6: Run training loop (Layer 5) ──────────────────────────────
        run_training(cfg, dataset, &ckpt_manager)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = TrainConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.n_iteration, 75001);
        assert_eq!(cfg.checkpoint_freq, 500);
        assert_eq!(cfg.dataset, DatasetKind::Chairs3d);
    }

    #[test]
    fn test_rejects_bad_geometry() {
        let cfg = TrainConfig { size_x: 48, n_layers: 5, ..TrainConfig::default() };
        assert!(cfg.validate().is_err());
        let cfg = TrainConfig { n_layers: 0, ..TrainConfig::default() };
        assert!(cfg.validate().is_err());
        let cfg = TrainConfig { nc: 2, ..TrainConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_and_out_of_range_values() {
        assert!(TrainConfig { batch_size: 0, ..TrainConfig::default() }.validate().is_err());
        assert!(TrainConfig { checkpoint_freq: 0, ..TrainConfig::default() }.validate().is_err());
        assert!(TrainConfig { real_label: 1.5, ..TrainConfig::default() }.validate().is_err());
        assert!(TrainConfig { fake_label: -0.1, ..TrainConfig::default() }.validate().is_err());
        assert!(TrainConfig { adam_epsilon: 0.0, ..TrainConfig::default() }.validate().is_err());
    }

    #[test]
    fn test_gan_config_mirrors_fields() {
        let cfg = TrainConfig { nc: 1, size_x: 32, size_z: 16, nf: 8, n_layers: 3, ..TrainConfig::default() };
        let gan = cfg.gan_config();
        assert_eq!((gan.channels, gan.size_x, gan.size_z, gan.nf, gan.n_layers), (1, 32, 16, 8, 3));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: TrainConfig = serde_json::from_str(r#"{ "dataset": "celeba", "nf": 16 }"#).unwrap();
        assert_eq!(cfg.dataset, DatasetKind::CelebA);
        assert_eq!(cfg.nf, 16);
        assert_eq!(cfg.size_z, 128);
    }

    #[test]
    fn test_execute_fails_on_missing_data() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            data_path:      dir.path().join("nowhere"),
            checkpoint_dir: dir.path().join("ckpt"),
            ..TrainConfig::default()
        };
        assert!(TrainUseCase::new(cfg).execute().is_err());
    }
}
