// ============================================================
// Layer 2 — Sample Use Case
// ============================================================
// Loads a trained generator and writes a grid of generated
// pairs:
//
//   1. Read train_config.json from the checkpoint directory
//   2. Rebuild the generator with the same geometry
//   3. Load netG_<epoch> (given, or the newest saved one)
//   4. Generate `count` pairs in eval mode and save the grid

use anyhow::{bail, Result};
use burn::prelude::*;
use std::path::{Path, PathBuf};

use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    model::Generator,
    sampler::{noise, save_samples},
    trainer::select_device,
};

type MyInnerBackend = burn::backend::Wgpu;

#[derive(Debug, Clone)]
pub struct SampleRequest {
    pub checkpoint_dir: PathBuf,
    /// None means the epoch recorded in latest_epoch.json
    pub epoch:  Option<usize>,
    pub count:  usize,
    pub output: PathBuf,
    pub seed:   Option<u64>,
    pub gpu:    Option<usize>,
    pub cpu:    bool,
}

pub struct SampleUseCase {
    request: SampleRequest,
}

impl SampleUseCase {
    pub fn new(request: SampleRequest) -> Self {
        Self { request }
    }

    /// Returns the epoch whose weights were used
    pub fn execute(&self) -> Result<usize> {
        let device = select_device(self.request.gpu, self.request.cpu);
        tracing::info!("Using WGPU device: {:?}", device);
        generate::<MyInnerBackend>(&self.request, &device)
    }
}

pub fn generate<B: Backend>(request: &SampleRequest, device: &B::Device) -> Result<usize> {
    if request.count == 0 {
        bail!("count must be greater than 0");
    }

    let ckpt = CheckpointManager::new(&request.checkpoint_dir)?;
    let cfg  = ckpt.load_config()?;
    let epoch = match request.epoch {
        Some(epoch) => epoch,
        None        => ckpt.latest_epoch()?,
    };

    let generator: Generator<B> = cfg.gan_config().init_generator(device)?;
    let generator = ckpt.load_generator(generator, epoch, device)?;

    if let Some(seed) = request.seed {
        B::seed(device, seed);
    }
    let z = noise::<B>(request.count, cfg.size_z, device);
    save_samples(&generator, z, cfg.nc, cfg.grid_nrow, Path::new(&request.output))?;
    Ok(epoch)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;

    type TestBackend = burn::backend::NdArray;

    fn request(dir: &Path, epoch: Option<usize>) -> SampleRequest {
        SampleRequest {
            checkpoint_dir: dir.to_path_buf(),
            epoch,
            count:  3,
            output: dir.join("out").join("samples.png"),
            seed:   Some(11),
            gpu:    None,
            cpu:    true,
        }
    }

    fn trained_checkpoint(dir: &Path) -> TrainConfig {
        let cfg  = TrainConfig { nc: 1, size_x: 8, size_z: 4, nf: 2, n_layers: 2, grid_nrow: 4, ..TrainConfig::default() };
        let ckpt = CheckpointManager::new(dir).unwrap();
        ckpt.save_config(&cfg).unwrap();

        let device = Default::default();
        let generator: Generator<TestBackend> = cfg.gan_config().init_generator(&device).unwrap();
        ckpt.save_generator(&generator, 10).unwrap();
        ckpt.save_latest_epoch(10).unwrap();
        cfg
    }

    #[test]
    fn test_generates_grid_from_latest_epoch() {
        let dir = tempfile::tempdir().unwrap();
        trained_checkpoint(dir.path());

        let req   = request(dir.path(), None);
        let epoch = generate::<TestBackend>(&req, &Default::default()).unwrap();
        assert_eq!(epoch, 10);

        // 3 pairs → 6 gray images, 4 per row → 2 rows
        let img = image::open(&req.output).unwrap();
        assert_eq!((img.width(), img.height()), (4 * 10 + 2, 2 * 10 + 2));
    }

    #[test]
    fn test_missing_epoch_fails() {
        let dir = tempfile::tempdir().unwrap();
        trained_checkpoint(dir.path());
        assert!(generate::<TestBackend>(&request(dir.path(), Some(3)), &Default::default()).is_err());
    }

    #[test]
    fn test_requires_training_config() {
        let dir = tempfile::tempdir().unwrap();
        assert!(generate::<TestBackend>(&request(dir.path(), Some(1)), &Default::default()).is_err());
    }
}
