// ============================================================
// Layer 5 — Adversarial Training Loop
// ============================================================
// Alternates one generator step and one discriminator step per
// minibatch, with label-smoothed BCE targets:
//
//   z ~ N(0, 1),  fake = G(z)
//   G objective:  BCE(D(fake), real_label)
//   D objective:  BCE(D(fake.detach()), fake_label)
//               + BCE(D(cat(x1, x2)), real_label)
//
// Both gradient sets are taken against the weights from before
// the step, then both Adam optimisers update their network.
//
// Key Burn 0.20 insight:
//   - Training uses Autodiff<Wgpu> for gradients
//   - GradientsParams::from_grads(grads, &model) keeps only the
//     gradients of that model's parameters, so the G objective
//     never updates D
//   - model.valid() returns the model on the inner backend with
//     batch norm switched to its running statistics
//
// Epoch bookkeeping:
//   iteration starts at load × batches_per_epoch and training
//   runs whole epochs while iteration <= n_iteration. Every
//   checkpoint_freq epochs a sample grid is written and, when
//   enabled, both networks are saved.
//
// Reference: Burn Book §5, Goodfellow et al. (2014) GAN,
//            Salimans et al. (2016) one-sided label smoothing

use anyhow::{bail, Result};
use burn::{
    backend::wgpu::WgpuDevice,
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::{activation, backend::AutodiffBackend},
};
use rand::Rng;
use std::path::Path;

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{PairBatch, PairBatcher},
    dataset::{PairDataset, PairItem},
};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochScores, ScoreLog},
};
use crate::ml::{
    loss::bce_with_logits,
    model::{Generator, PairDiscriminator},
    sampler::{noise, save_samples},
};

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// What a finished run reports back to the caller
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    /// Seed the run actually used (configured or drawn)
    pub seed:       u64,
    /// Last finished epoch, counting from epoch 0 of a fresh run
    pub epochs:     usize,
    /// Global iteration counter after the last batch
    pub iterations: usize,
    /// Mean (dPos, dNeg) of the last epoch
    pub last_scores: Option<(f64, f64)>,
}

/// Train on the GPU backend chosen by `--gpu` / `--cpu`.
///
/// Thin wrapper that picks the WGPU device and hands off to
/// `train_loop` with the autodiff backend.
pub fn run_training(
    cfg:          &TrainConfig,
    dataset:      PairDataset,
    ckpt_manager: &CheckpointManager,
) -> Result<TrainingSummary> {
    let device = select_device(cfg.gpu, cfg.cpu);
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop::<MyBackend>(cfg, dataset, ckpt_manager, device)
}

/// `--cpu` wins over `--gpu`; neither means the default adapter.
pub fn select_device(gpu: Option<usize>, cpu: bool) -> WgpuDevice {
    match (cpu, gpu) {
        (true, _)           => WgpuDevice::Cpu,
        (false, Some(idx))  => WgpuDevice::DiscreteGpu(idx),
        (false, None)       => WgpuDevice::default(),
    }
}

/// Random seed in 1..=10000 unless one was configured
pub fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| rand::thread_rng().gen_range(1..=10_000))
}

/// Adam settings shared by both networks.
///
/// Per parameter, with bias-corrected moments:
///   m = β1*m + (1-β1)*g        (mean)
///   v = β2*v + (1-β2)*g²       (variance)
///   θ = θ - lr * m / (√v + ε)  (update)
///
/// ε comes from `adam_epsilon` (1e-8 by default), not Burn's 1e-5.
pub fn adam_config(cfg: &TrainConfig) -> AdamConfig {
    AdamConfig::new()
        .with_beta_1(cfg.beta1)
        .with_beta_2(cfg.beta2)
        .with_epsilon(cfg.adam_epsilon)
}

// ─── One Minibatch ────────────────────────────────────────────────────────────

/// Gradients for both networks plus the scores to log
pub struct GanStep {
    pub grads_g: GradientsParams,
    pub grads_d: GradientsParams,
    /// mean sigmoid(D(real pair))
    pub d_pos: f64,
    /// mean sigmoid(D(fake pair))
    pub d_neg: f64,
}

/// One minibatch of both objectives, without applying updates.
///
/// Steps:
///   1. Draw z ~ N(0, 1) and generate a fake pair
///   2. G loss: BCE(D(fake), real_label), gradients for G only
///   3. D loss: BCE(D(fake.detach()), fake_label)
///              + BCE(D(real pair), real_label), gradients for D only
///   4. Report mean sigmoid scores on real and fake pairs
///
/// Both losses see the same fake; D's gradient never reaches G.
pub fn gan_step<B: AutodiffBackend>(
    generator:     &Generator<B>,
    discriminator: &PairDiscriminator<B>,
    batch:         &PairBatch<B>,
    cfg:           &TrainConfig,
) -> GanStep {
    let device = batch.first.device();
    let n      = batch.batch_size();

    // ── Generation objective ─────────────────────────────────────────────────
    let z    = noise::<B>(n, cfg.size_z, &device);
    let fake = generator.forward(z);
    let g_loss  = bce_with_logits(discriminator.forward(fake.clone()), cfg.real_label);
    let grads_g = GradientsParams::from_grads(g_loss.backward(), generator);

    // ── Discrimination objective ─────────────────────────────────────────────
    let d_pos  = discriminator.forward(batch.stacked());
    let d_neg  = discriminator.forward(fake.detach());
    let d_loss = bce_with_logits(d_neg.clone(), cfg.fake_label)
        + bce_with_logits(d_pos.clone(), cfg.real_label);
    let grads_d = GradientsParams::from_grads(d_loss.backward(), discriminator);

    GanStep {
        grads_g,
        grads_d,
        d_pos: mean_sigmoid(d_pos),
        d_neg: mean_sigmoid(d_neg),
    }
}

fn mean_sigmoid<B: AutodiffBackend>(logits: Tensor<B, 1>) -> f64 {
    activation::sigmoid(logits.inner())
        .mean()
        .into_scalar()
        .elem::<f64>()
}

// ─── Training Loop ────────────────────────────────────────────────────────────

/// The whole run on backend `B`.
///
/// Steps:
///   1. Seed the backend RNG and build both networks
///   2. Resume from `cfg.load` when it is non-zero
///   3. Per epoch: shuffle, run `gan_step` per batch, step G then D,
///      then append the epoch's per-batch scores to the score log
///   4. Every `checkpoint_freq` epochs: write a sample grid from the
///      fixed noise and (unless disabled) both networks' weights
///   5. Stop after the epoch in which the iteration count passes
///      `n_iteration`
pub fn train_loop<B: AutodiffBackend>(
    cfg:          &TrainConfig,
    dataset:      PairDataset,
    ckpt_manager: &CheckpointManager,
    device:       B::Device,
) -> Result<TrainingSummary> {

    // ── Seed ──────────────────────────────────────────────────────────────────
    let seed = resolve_seed(cfg.seed);
    println!("Random Seed: {seed}");
    tracing::info!("Random seed: {}", seed);
    B::seed(&device, seed);

    // ── Build models ──────────────────────────────────────────────────────────
    let gan_cfg = cfg.gan_config();
    let mut generator: Generator<B>         = gan_cfg.init_generator(&device)?;
    let mut discriminator: PairDiscriminator<B> = gan_cfg.init_discriminator(&device)?;

    if cfg.load > 0 {
        if !ckpt_manager.has_epoch(cfg.load) {
            bail!(
                "No checkpoint for epoch {} in '{}'",
                cfg.load,
                ckpt_manager.dir().display()
            );
        }
        generator     = ckpt_manager.load_generator(generator, cfg.load, &device)?;
        discriminator = ckpt_manager.load_discriminator(discriminator, cfg.load, &device)?;
        tracing::info!("Resumed from epoch {}", cfg.load);
    }
    tracing::info!(
        "Models ready: {} layers, nf={}, size_x={}, size_z={}",
        cfg.n_layers, cfg.nf, cfg.size_x, cfg.size_z
    );

    // ── Adam optimisers ───────────────────────────────────────────────────────
    let adam = adam_config(cfg);
    let mut optim_g = adam.init::<B, Generator<B>>();
    let mut optim_d = adam.init::<B, PairDiscriminator<B>>();

    // Fixed noise so sample grids are comparable across epochs
    let z_test = noise::<B::InnerBackend>(cfg.batch_size, cfg.size_z, &device);

    // ── Data loader ───────────────────────────────────────────────────────────
    let batches_per_epoch = dataset.batches_per_epoch(cfg.batch_size);
    if batches_per_epoch == 0 {
        bail!("Dataset '{}' contains no items", dataset.source_name());
    }
    let size    = dataset.transform().size as usize;
    let batcher = PairBatcher::new(cfg.nc, size);
    let mut builder = DataLoaderBuilder::<B, PairItem, PairBatch<B>>::new(batcher)
        .batch_size(cfg.batch_size)
        .shuffle(seed)
        .set_device(device.clone());
    if cfg.workers > 0 {
        builder = builder.num_workers(cfg.workers);
    }
    let loader = builder.build(dataset);

    let score_log = ScoreLog::new(&cfg.log_file)?;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    let mut iteration   = cfg.load * batches_per_epoch;
    let mut epoch       = cfg.load;
    let mut last_scores = None;
    tracing::info!(
        "Start training at iteration {} ({} batches per epoch, stop after {})",
        iteration, batches_per_epoch, cfg.n_iteration
    );

    while iteration <= cfg.n_iteration {
        let mut scores = EpochScores::new(epoch + 1);

        for batch in loader.iter() {
            let step = gan_step(&generator, &discriminator, &batch, cfg);
            generator     = optim_g.step(cfg.lr_g, generator, step.grads_g);
            discriminator = optim_d.step(cfg.lr_d, discriminator, step.grads_d);

            scores.push(step.d_pos, step.d_neg);
            iteration += 1;
        }

        if scores.is_empty() {
            bail!("Epoch {} produced no batches", epoch + 1);
        }
        epoch += 1;

        let (d_pos, d_neg) = (scores.mean_pos(), scores.mean_neg());
        println!("Epoch {:>5} | iteration {:>7} | dPos={:.4} | dNeg={:.4}", epoch, iteration, d_pos, d_neg);
        tracing::info!("Epoch {} done: dPos={:.4} dNeg={:.4}", epoch, d_pos, d_neg);
        score_log.append(&scores)?;
        last_scores = Some((d_pos, d_neg));

        if epoch % cfg.checkpoint_freq == 0 {
            let sample_path = Path::new(&cfg.sample_dir).join(format!("{epoch}.png"));
            save_samples(&generator.valid(), z_test.clone(), cfg.nc, cfg.grid_nrow, &sample_path)?;

            if cfg.save_weights {
                ckpt_manager.save_generator(&generator, epoch)?;
                ckpt_manager.save_discriminator(&discriminator, epoch)?;
                ckpt_manager.save_latest_epoch(epoch)?;
                tracing::info!("Checkpoint saved for epoch {}", epoch);
            }
        }
    }

    tracing::info!("Training complete after {} epochs ({} iterations)", epoch, iteration);
    Ok(TrainingSummary {
        seed,
        epochs: epoch,
        iterations: iteration,
        last_scores,
    })
}
