// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`  — trains the pair GAN on an image dataset
//   2. `sample` — loads a generator checkpoint and writes a grid
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, SampleArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "pair-gan",
    version = "0.1.0",
    about = "Train a DCGAN that generates same-label image pairs, then sample from it."
)]
pub struct Cli {
    /// The subcommand to run (train or sample)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)  => run_train(args),
            Commands::Sample(args) => run_sample(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on {} in: {}", args.dataset, args.data_path.display());

    let summary = TrainUseCase::new(args.into()).execute()?;

    match summary.last_scores {
        Some((d_pos, d_neg)) => println!(
            "Training complete: {} epochs, {} iterations (seed {}), final dPos={:.4} dNeg={:.4}",
            summary.epochs, summary.iterations, summary.seed, d_pos, d_neg
        ),
        None => println!(
            "Nothing to do: iteration {} is already past the limit (seed {}).",
            summary.iterations, summary.seed
        ),
    }
    Ok(())
}

fn run_sample(args: SampleArgs) -> Result<()> {
    use crate::application::sample_use_case::SampleUseCase;

    let output = args.output.clone();
    let epoch  = SampleUseCase::new(args.into()).execute()?;
    println!("Wrote samples from epoch {} to {}", epoch, output.display());
    Ok(())
}
