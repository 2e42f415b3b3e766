// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Parses command line arguments with clap and routes each
// subcommand to its use case in Layer 2:
//
//   1. `train`   - trains the U-Net on image pairs
//   2. `predict` - dehazes one image with a checkpoint
//   3. `preview` - writes a preview of one dataset pair
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PredictArgs, PreviewArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "unet-dehaze",
    version,
    about = "Train a U-Net on paired hazy/clean images, then dehaze new images."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Predict(args) => run_predict(args),
            Commands::Preview(args) => run_preview(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on pairs in: {}", args.data.data_dir);

    let use_case = TrainUseCase::new(args.into());
    let summary = use_case.execute()?;

    match (summary.best(), summary.last()) {
        (Some(best), Some(last)) => println!(
            "Training complete after {} epochs. Best epoch {} (test_loss={:.5}, psnr={:.2}dB).",
            last.epoch, best.epoch, best.test_loss, best.test_psnr
        ),
        (None, Some(last)) => println!(
            "Training complete after {} epochs (train_loss={:.5}, no test split).",
            last.epoch, last.train_loss
        ),
        _ => {}
    }
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let use_case = PredictUseCase::new(&args.checkpoint_dir, args.backend.map(Into::into))?;
    let patch = use_case.execute(&args.input, &args.output)?;
    println!("Wrote {}x{} dehazed image to {}", patch.width, patch.height, args.output);
    Ok(())
}

fn run_preview(args: PreviewArgs) -> Result<()> {
    use crate::application::preview_use_case::PreviewUseCase;

    let id = PreviewUseCase::new(args.data.into()).execute(args.index, &args.output)?;
    println!("Preview of pair '{}' written to {}", id, args.output);
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::{BackendKind, TrainConfig};

    #[test]
    fn test_train_flags_reach_the_config() {
        let cli = Cli::try_parse_from([
            "unet-dehaze", "train", "--no-padding", "--num-filters", "4,8", "--backend", "ndarray",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else {
            panic!("expected the train command");
        };

        let cfg: TrainConfig = args.into();
        assert!(!cfg.padding);
        assert!(cfg.bilinear);
        assert_eq!(cfg.num_filters, vec![4, 8]);
        assert_eq!(cfg.backend, BackendKind::NdArray);
    }
}
