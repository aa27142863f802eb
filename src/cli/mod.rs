// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`    — fine-tunes the classifier on JSONL data
//   2. `classify` — loads a trained model and labels one comment

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, TrainArgs, ClassifyArgs};

/// The main CLI struct — clap reads the fields and generates
/// argument parsing code automatically via the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "comment-moderation",
    version = "0.1.0",
    about = "Fine-tune a transformer comment classifier, then classify comments."
)]
pub struct Cli {
    /// The subcommand to run (train or classify)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    /// This keeps the CLI layer thin — it only routes, never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => Self::run_train(args),
            Commands::Classify(args) => Self::run_classify(args),
        }
    }

    /// Handles the `train` subcommand.
    /// Converts CLI args into a TrainConfig and hands off to Layer 2.
    fn run_train(args: TrainArgs) -> Result<()> {
        use crate::application::train_use_case::TrainUseCase;

        tracing::info!("Starting training on data file: {}", args.data_path);

        // Convert CLI args → application config (separates presentation from domain)
        let use_case = TrainUseCase::new(args.into());
        use_case.execute()?;

        println!("Training complete. Model artifacts saved.");
        Ok(())
    }

    /// Handles the `classify` subcommand.
    /// Loads the model artifacts and prints the predicted label.
    fn run_classify(args: ClassifyArgs) -> Result<()> {
        use crate::application::classify_use_case::ClassifyUseCase;
        use crate::domain::traits::CommentClassifier;

        let use_case = ClassifyUseCase::new(
            args.model_dir.clone(),
            args.model_name.clone(),
            args.device.into(),
        )?;

        let prediction = use_case.classify(&args.text)?;
        println!(
            "\nLabel: {} ({})  confidence: {:.4}",
            prediction.label_name, prediction.label_id, prediction.confidence,
        );
        Ok(())
    }
}
