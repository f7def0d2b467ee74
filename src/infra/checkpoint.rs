// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores network weights using Burn's gzipped
// MessagePack recorder at full (f32) precision, so a resumed run
// continues from exactly the weights and batch-norm statistics
// that were saved.
//
// File naming convention:
//   <checkpoint_dir>/
//     netG_500.<ext>       ← generator weights after epoch 500
//     netD_500.<ext>       ← discriminator weights after epoch 500
//     ...
//     latest_epoch.json    ← number of the newest saved epoch
//     train_config.json    ← hyperparameters, needed to rebuild G
//
// The recorder appends its own extension, so paths are built
// without one and existence checks match on the file stem.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};
use std::{fs, path::{Path, PathBuf}};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::{Generator, PairDiscriminator};

const GENERATOR_PREFIX:     &str = "netG";
const DISCRIMINATOR_PREFIX: &str = "netD";
const CONFIG_FILE:          &str = "train_config.json";
const LATEST_FILE:          &str = "latest_epoch.json";

/// `.mpk.gz`, f32 parameters
type WeightRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

/// All checkpoint files of one run live under a single directory.
pub struct CheckpointManager {
    /// Directory holding netG_/netD_ files and the JSON metadata
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create the manager, creating the directory if needed.
    ///
    /// Fails when the directory cannot be created (e.g. a file of
    /// the same name exists or permissions are missing).
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/netG_<epoch>` (without recorder extension)
    pub fn generator_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("{GENERATOR_PREFIX}_{epoch}"))
    }

    /// `<dir>/netD_<epoch>` (without recorder extension)
    pub fn discriminator_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("{DISCRIMINATOR_PREFIX}_{epoch}"))
    }

    /// True when both networks were saved for `epoch`.
    ///
    /// Checks for any file named `netG_<epoch>.*` and
    /// `netD_<epoch>.*`, whatever extension the recorder added.
    pub fn has_epoch(&self, epoch: usize) -> bool {
        self.recorded(&self.generator_path(epoch)) && self.recorded(&self.discriminator_path(epoch))
    }

    fn recorded(&self, stem_path: &Path) -> bool {
        let Some(stem) = stem_path.file_name().and_then(|s| s.to_str()) else {
            return false;
        };
        let prefix = format!("{stem}.");
        fs::read_dir(&self.dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .any(|e| e.file_name().to_string_lossy().starts_with(&prefix))
            })
            .unwrap_or(false)
    }

    // ── Weights ─────────────────────────────────────────────────────────────

    /// Save the generator weights for `epoch`.
    ///
    /// Steps:
    ///   1. Convert the module into its record (parameters + BN stats)
    ///   2. Write it to `<dir>/netG_<epoch>.mpk.gz` at f32 precision
    pub fn save_generator<B: Backend>(&self, model: &Generator<B>, epoch: usize) -> Result<()> {
        let path = self.generator_path(epoch);
        WeightRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save generator to '{}'", path.display()))?;
        tracing::debug!("Saved generator: epoch {}", epoch);
        Ok(())
    }

    /// Save the discriminator weights for `epoch` to
    /// `<dir>/netD_<epoch>.mpk.gz`, same format as the generator.
    pub fn save_discriminator<B: Backend>(
        &self,
        model: &PairDiscriminator<B>,
        epoch: usize,
    ) -> Result<()> {
        let path = self.discriminator_path(epoch);
        WeightRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save discriminator to '{}'", path.display()))?;
        tracing::debug!("Saved discriminator: epoch {}", epoch);
        Ok(())
    }

    /// Restore generator weights for `epoch` into an already-built model.
    ///
    /// Steps:
    ///   1. Read `<dir>/netG_<epoch>.mpk.gz` onto `device`
    ///   2. Load the record into `model`
    ///
    /// The architecture must match the one that was saved; build it
    /// from the saved TrainConfig (see `load_config`).
    pub fn load_generator<B: Backend>(
        &self,
        model:  Generator<B>,
        epoch:  usize,
        device: &B::Device,
    ) -> Result<Generator<B>> {
        let path = self.generator_path(epoch);
        tracing::info!("Loading generator from '{}'", path.display());
        let record = WeightRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load generator checkpoint '{}'", path.display())
            })?;
        Ok(model.load_record(record))
    }

    /// Restore discriminator weights for `epoch`, like `load_generator`.
    pub fn load_discriminator<B: Backend>(
        &self,
        model:  PairDiscriminator<B>,
        epoch:  usize,
        device: &B::Device,
    ) -> Result<PairDiscriminator<B>> {
        let path = self.discriminator_path(epoch);
        tracing::info!("Loading discriminator from '{}'", path.display());
        let record = WeightRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load discriminator checkpoint '{}'", path.display())
            })?;
        Ok(model.load_record(record))
    }

    // ── Metadata ────────────────────────────────────────────────────────────

    /// Record `epoch` as the newest saved checkpoint in
    /// `latest_epoch.json`, overwriting the previous value.
    pub fn save_latest_epoch(&self, epoch: usize) -> Result<()> {
        let path = self.dir.join(LATEST_FILE);
        fs::write(&path, serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write '{}'", path.display()))
    }

    /// Newest epoch with saved weights. Errors if nothing was saved yet.
    pub fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join(LATEST_FILE);
        let s = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot find '{}'. Have you run 'train' with weight saving enabled?",
                path.display()
            )
        })?;
        Ok(serde_json::from_str::<usize>(&s)?)
    }

    /// Write the run's TrainConfig as pretty JSON to `train_config.json`.
    /// `sample` reads it back to rebuild the generator geometry.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    /// Read `train_config.json`. Missing fields take their defaults.
    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Make sure you have run 'train' first.",
                path.display()
            )
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid training config in '{}'", path.display()))
    }
}
