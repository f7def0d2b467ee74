// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `sample`
// and all their configurable flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::{sample_use_case::SampleRequest, train_use_case::TrainConfig};
use crate::domain::dataset_kind::DatasetKind;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the pair generator and discriminator
    Train(TrainArgs),

    /// Generate image pairs from a saved generator checkpoint
    Sample(SampleArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Dataset layout: celeba | 102flowers | 3dchairs
    #[arg(long, default_value = "3dchairs")]
    pub dataset: DatasetKind,

    /// Root directory holding the dataset folders
    #[arg(long, default_value = "./data")]
    pub data_path: PathBuf,

    /// Channels per image
    #[arg(long, default_value_t = 3)]
    pub nc: usize,

    /// Image side length; must be a multiple of 2^n_layers
    #[arg(long, default_value_t = 64)]
    pub size_x: usize,

    /// Noise vector size
    #[arg(long, default_value_t = 128)]
    pub size_z: usize,

    /// Filters in the first conv layer, doubled at each layer
    #[arg(long, default_value_t = 64)]
    pub nf: usize,

    /// Strided conv layers in both networks
    #[arg(long, default_value_t = 4)]
    pub n_layers: usize,

    /// Data loading worker threads (0 loads on the training thread)
    #[arg(long, default_value_t = 4)]
    pub workers: usize,

    /// Discrete GPU index
    #[arg(long)]
    pub gpu: Option<usize>,

    /// Run on the CPU device
    #[arg(long)]
    pub cpu: bool,

    #[arg(long, default_value_t = 128)]
    pub batch_size: usize,

    /// Training stops at the end of the epoch that passes this iteration
    #[arg(long, default_value_t = 75001)]
    pub n_iteration: usize,

    /// Generator learning rate
    #[arg(long, default_value_t = 2e-4)]
    pub lr_g: f64,

    /// Discriminator learning rate
    #[arg(long, default_value_t = 5e-5)]
    pub lr_d: f64,

    #[arg(long, default_value_t = 0.5)]
    pub beta1: f32,

    #[arg(long, default_value_t = 0.999)]
    pub beta2: f32,

    /// Adam denominator term, added to √v
    #[arg(long, default_value_t = 1e-8)]
    pub adam_epsilon: f32,

    /// Smoothed BCE target for real pairs
    #[arg(long, default_value_t = 0.9)]
    pub real_label: f32,

    /// Smoothed BCE target for generated pairs
    #[arg(long, default_value_t = 0.1)]
    pub fake_label: f32,

    #[arg(long, default_value = ".")]
    pub checkpoint_dir: PathBuf,

    /// Resume from the checkpoint of this epoch (0 starts fresh)
    #[arg(long, default_value_t = 0)]
    pub load: usize,

    /// Epochs between sample grids and checkpoints
    #[arg(long, default_value_t = 500)]
    pub checkpoint_freq: usize,

    /// Only write sample grids, never network weights
    #[arg(long)]
    pub no_weights: bool,

    /// RNG seed; random in 1..=10000 when omitted
    #[arg(long)]
    pub seed: Option<u64>,

    /// Per-iteration discriminator score log
    #[arg(long, default_value = "logs.dat")]
    pub log_file: PathBuf,

    /// Where <epoch>.png sample grids are written
    #[arg(long, default_value = ".")]
    pub sample_dir: PathBuf,

    /// Images per row in sample grids
    #[arg(long, default_value_t = 8)]
    pub grid_nrow: usize,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            dataset:         a.dataset,
            data_path:       a.data_path,
            nc:              a.nc,
            size_x:          a.size_x,
            size_z:          a.size_z,
            nf:              a.nf,
            n_layers:        a.n_layers,
            workers:         a.workers,
            gpu:             a.gpu,
            cpu:             a.cpu,
            batch_size:      a.batch_size,
            n_iteration:     a.n_iteration,
            lr_g:            a.lr_g,
            lr_d:            a.lr_d,
            beta1:           a.beta1,
            beta2:           a.beta2,
            adam_epsilon:    a.adam_epsilon,
            real_label:      a.real_label,
            fake_label:      a.fake_label,
            checkpoint_dir:  a.checkpoint_dir,
            load:            a.load,
            checkpoint_freq: a.checkpoint_freq,
            save_weights:    !a.no_weights,
            seed:            a.seed,
            log_file:        a.log_file,
            sample_dir:      a.sample_dir,
            grid_nrow:       a.grid_nrow,
        }
    }
}

/// All arguments for the `sample` command
#[derive(Args, Debug)]
pub struct SampleArgs {
    /// Directory where training saved checkpoints and train_config.json
    #[arg(long, default_value = ".")]
    pub checkpoint_dir: PathBuf,

    /// Epoch to load; defaults to the newest saved one
    #[arg(long)]
    pub epoch: Option<usize>,

    /// Number of pairs to generate
    #[arg(long, default_value_t = 64)]
    pub count: usize,

    #[arg(long, default_value = "samples.png")]
    pub output: PathBuf,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long)]
    pub gpu: Option<usize>,

    #[arg(long)]
    pub cpu: bool,
}

impl From<SampleArgs> for SampleRequest {
    fn from(a: SampleArgs) -> Self {
        SampleRequest {
            checkpoint_dir: a.checkpoint_dir,
            epoch:          a.epoch,
            count:          a.count,
            output:         a.output,
            seed:           a.seed,
            gpu:            a.gpu,
            cpu:            a.cpu,
        }
    }
}
